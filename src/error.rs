//! Error types for the matchmaking service
//!
//! Library code returns [`MatchmakingError`] so callers can tell a rejected
//! payload from an unreachable queue backend. The binaries wrap everything in
//! anyhow at the edge.

use crate::types::{PlayerId, QueueKind};

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, MatchmakingError>;

/// Custom error types for specific matchmaking scenarios
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MatchmakingError {
    #[error("Queue store unavailable: {message}")]
    StoreUnavailable { message: String },

    #[error("Invalid player data: {reason}")]
    InvalidPlayerData { reason: String },

    #[error("Match notification failed for {killer_id} -> {victim_id}: {message}")]
    NotificationFailed {
        killer_id: PlayerId,
        victim_id: PlayerId,
        message: String,
    },

    #[error("Unknown queue: {name}")]
    UnknownQueue { name: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Reconciliation failed: {message}")]
    ReconciliationFailed { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}

impl MatchmakingError {
    pub fn store_unavailable(queue: QueueKind, message: impl std::fmt::Display) -> Self {
        MatchmakingError::StoreUnavailable {
            message: format!("{} queue: {}", queue, message),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        MatchmakingError::InvalidPlayerData {
            reason: reason.into(),
        }
    }
}
