//! Common types used throughout the matchmaking service

use crate::error::{MatchmakingError, Result};
use crate::utils::elapsed_seconds;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Chat-platform account id of a player
pub type PlayerId = u64;

/// Unique identifier for an accepted match
pub type MatchId = Uuid;

/// Lowest accepted course number
pub const MIN_COURSE: u8 = 1;

/// Highest accepted course number
pub const MAX_COURSE: u8 = 6;

/// One of the two queues a player can wait in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueKind {
    /// Players looking for a target
    Killers,
    /// Players available to be targeted
    Victims,
}

impl QueueKind {
    pub const ALL: [QueueKind; 2] = [QueueKind::Killers, QueueKind::Victims];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueueKind::Killers => "killers",
            QueueKind::Victims => "victims",
        }
    }
}

impl fmt::Display for QueueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueKind {
    type Err = MatchmakingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "killer" | "killers" => Ok(QueueKind::Killers),
            "victim" | "victims" => Ok(QueueKind::Victims),
            other => Err(MatchmakingError::UnknownQueue {
                name: other.to_string(),
            }),
        }
    }
}

/// Academic category of a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlayerType {
    Bachelor,
    Master,
    Specialist,
    Other,
    #[default]
    Unspecified,
}

impl PlayerType {
    /// Parse a type label as sent by the chat layer.
    ///
    /// Missing or blank labels are `Unspecified`; unknown labels are rejected.
    pub fn parse(label: Option<&str>) -> Result<Self> {
        let label = match label.map(str::trim) {
            None | Some("") => return Ok(PlayerType::Unspecified),
            Some(label) => label.to_lowercase(),
        };

        match label.as_str() {
            "bachelor" | "бакалавр" => Ok(PlayerType::Bachelor),
            "master" | "магистр" => Ok(PlayerType::Master),
            "specialist" | "специалитет" => Ok(PlayerType::Specialist),
            "other" | "иное" => Ok(PlayerType::Other),
            "unspecified" | "не определено" => Ok(PlayerType::Unspecified),
            _ => Err(MatchmakingError::invalid(format!(
                "unrecognized player type '{}'",
                label
            ))),
        }
    }
}

impl fmt::Display for PlayerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PlayerType::Bachelor => "bachelor",
            PlayerType::Master => "master",
            PlayerType::Specialist => "specialist",
            PlayerType::Other => "other",
            PlayerType::Unspecified => "unspecified",
        };
        f.write_str(label)
    }
}

/// Matchable attributes of a queued player.
///
/// A snapshot taken at enqueue time. Later changes to the real player are not
/// reflected here; the caller re-enqueues to refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerData {
    rating: f64,
    #[serde(rename = "type")]
    player_type: PlayerType,
    course_number: Option<u8>,
    group_name: Option<String>,
}

impl PlayerData {
    /// Build a validated snapshot
    pub fn new(
        rating: f64,
        player_type: PlayerType,
        course_number: Option<u8>,
        group_name: Option<String>,
    ) -> Result<Self> {
        if !rating.is_finite() || rating < 0.0 {
            return Err(MatchmakingError::invalid(format!(
                "rating must be a non-negative number, got {}",
                rating
            )));
        }

        if let Some(course) = course_number {
            if !(MIN_COURSE..=MAX_COURSE).contains(&course) {
                return Err(MatchmakingError::invalid(format!(
                    "course number {} out of range [{}, {}]",
                    course, MIN_COURSE, MAX_COURSE
                )));
            }
        }

        let group_name = group_name
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty());

        Ok(Self {
            rating,
            player_type,
            course_number,
            group_name,
        })
    }

    pub fn rating(&self) -> f64 {
        self.rating
    }

    pub fn player_type(&self) -> PlayerType {
        self.player_type
    }

    pub fn course_number(&self) -> Option<u8> {
        self.course_number
    }

    pub fn group_name(&self) -> Option<&str> {
        self.group_name.as_deref()
    }
}

/// Loosely-typed player payload as received at the service boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerPayload {
    #[serde(alias = "tg_id")]
    pub id: PlayerId,
    pub rating: f64,
    #[serde(rename = "type", default)]
    pub player_type: Option<String>,
    #[serde(default)]
    pub course_number: Option<i64>,
    #[serde(default)]
    pub group_name: Option<String>,
}

impl PlayerPayload {
    /// Validate the payload into an identity and a snapshot
    pub fn into_player(self) -> Result<(PlayerId, PlayerData)> {
        if self.id == 0 {
            return Err(MatchmakingError::invalid("player id must be positive"));
        }

        let player_type = PlayerType::parse(self.player_type.as_deref())?;

        let course_number = match self.course_number {
            None => None,
            Some(course) => Some(u8::try_from(course).map_err(|_| {
                MatchmakingError::invalid(format!(
                    "course number {} out of range [{}, {}]",
                    course, MIN_COURSE, MAX_COURSE
                ))
            })?),
        };

        let data = PlayerData::new(self.rating, player_type, course_number, self.group_name)?;
        Ok((self.id, data))
    }
}

/// A player's membership record in one queue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueEntry {
    id: PlayerId,
    data: PlayerData,
    joined_at: DateTime<Utc>,
    rating: f64,
}

impl QueueEntry {
    pub fn new(id: PlayerId, data: PlayerData, joined_at: DateTime<Utc>) -> Self {
        let rating = data.rating();
        Self {
            id,
            data,
            joined_at,
            rating,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn data(&self) -> &PlayerData {
        &self.data
    }

    pub fn joined_at(&self) -> DateTime<Utc> {
        self.joined_at
    }

    pub fn rating(&self) -> f64 {
        self.rating
    }

    /// Seconds spent waiting as of `now`, never negative
    pub fn wait_seconds(&self, now: DateTime<Utc>) -> f64 {
        elapsed_seconds(self.joined_at, now)
    }
}

/// A committed killer/victim pairing.
///
/// Lives only until it has been handed to the notifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub match_id: MatchId,
    pub killer_id: PlayerId,
    pub victim_id: PlayerId,
    pub killer_data: PlayerData,
    pub victim_data: PlayerData,
    pub matched_at: DateTime<Utc>,
    pub match_quality: f64,
}

/// Body of the outbound "match found" call.
///
/// The bot reads the pair from the `killer` and `victim` keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchNotification {
    pub match_id: MatchId,
    #[serde(rename = "killer")]
    pub killer_id: PlayerId,
    #[serde(rename = "victim")]
    pub victim_id: PlayerId,
    pub match_quality: f64,
    pub matched_at: DateTime<Utc>,
}

impl From<&MatchResult> for MatchNotification {
    fn from(result: &MatchResult) -> Self {
        Self {
            match_id: result.match_id,
            killer_id: result.killer_id,
            victim_id: result.victim_id,
            match_quality: result.match_quality,
            matched_at: result.matched_at,
        }
    }
}

/// Point-in-time queue sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueueLengths {
    pub killers: usize,
    pub victims: usize,
}

/// Whether a player currently waits in each queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueueStatus {
    pub queued_as_killer: bool,
    pub queued_as_victim: bool,
}

/// Per-queue outcome of enqueueing one player into both queues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DualEnqueue {
    pub added_as_killer: bool,
    pub added_as_victim: bool,
}

/// Contents of both queues at one moment
#[derive(Debug, Clone, Serialize)]
pub struct QueueSnapshot {
    pub killers: Vec<QueueEntry>,
    pub victims: Vec<QueueEntry>,
}

/// Membership the external game system expects, used for reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedQueues {
    #[serde(default)]
    pub killers_queue: Vec<PlayerId>,
    #[serde(default)]
    pub victims_queue: Vec<PlayerId>,
}
