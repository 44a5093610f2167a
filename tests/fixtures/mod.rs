//! Test fixtures and mock implementations for integration testing
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use killer_matchmaking::config::{AppConfig, ScoringConfig};
use killer_matchmaking::error::{MatchmakingError, Result};
use killer_matchmaking::metrics::MetricsCollector;
use killer_matchmaking::notify::MatchNotifier;
use killer_matchmaking::queue::{InMemoryQueueStore, QueueStore};
use killer_matchmaking::scoring::{CompatibilityScorer, PairScorer};
use killer_matchmaking::service::MatchmakingService;
use killer_matchmaking::types::{
    ExpectedQueues, MatchResult, PlayerData, PlayerId, PlayerPayload, PlayerType, QueueEntry,
    QueueKind, QueueStatus,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Notifier that records every delivered match
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    delivered: Mutex<Vec<MatchResult>>,
    failing_killers: Mutex<HashSet<PlayerId>>,
    expected: Mutex<Option<ExpectedQueues>>,
    delay: Option<Duration>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every notification takes `delay` to complete
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Fail notifications for matches with this killer
    pub fn fail_for_killer(&self, id: PlayerId) {
        if let Ok(mut failing) = self.failing_killers.lock() {
            failing.insert(id);
        }
    }

    /// Membership reported by the restore call; unset means the call fails
    pub fn set_expected(&self, expected: ExpectedQueues) {
        if let Ok(mut slot) = self.expected.lock() {
            *slot = Some(expected);
        }
    }

    pub fn delivered(&self) -> Vec<MatchResult> {
        self.delivered
            .lock()
            .map(|results| results.clone())
            .unwrap_or_default()
    }

    pub fn delivered_pairs(&self) -> Vec<(PlayerId, PlayerId)> {
        self.delivered()
            .iter()
            .map(|r| (r.killer_id, r.victim_id))
            .collect()
    }
}

#[async_trait]
impl MatchNotifier for RecordingNotifier {
    async fn notify_match(&self, result: &MatchResult) -> Result<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let failing = self
            .failing_killers
            .lock()
            .map(|failing| failing.contains(&result.killer_id))
            .unwrap_or(false);
        if failing {
            return Err(MatchmakingError::NotificationFailed {
                killer_id: result.killer_id,
                victim_id: result.victim_id,
                message: "bot rejected the match".to_string(),
            });
        }

        if let Ok(mut delivered) = self.delivered.lock() {
            delivered.push(result.clone());
        }
        Ok(())
    }

    async fn fetch_expected_queues(&self) -> Result<ExpectedQueues> {
        self.expected
            .lock()
            .ok()
            .and_then(|slot| slot.clone())
            .ok_or_else(|| MatchmakingError::ReconciliationFailed {
                message: "restore not configured".to_string(),
            })
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

type CommitHook = Box<dyn Fn(&InMemoryQueueStore) + Send + Sync>;

/// In-memory store that can fail listings and mutate itself right before a
/// pair is removed
#[derive(Default)]
pub struct InterferingStore {
    inner: InMemoryQueueStore,
    failing_lists: AtomicUsize,
    before_remove_pair: Mutex<Option<CommitHook>>,
}

impl InterferingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `count` listings fail with `StoreUnavailable`
    pub fn fail_next_lists(&self, count: usize) {
        self.failing_lists.store(count, Ordering::SeqCst);
    }

    /// Run `hook` once, just before the next pair removal
    pub fn before_next_remove_pair<F>(&self, hook: F)
    where
        F: Fn(&InMemoryQueueStore) + Send + Sync + 'static,
    {
        if let Ok(mut slot) = self.before_remove_pair.lock() {
            *slot = Some(Box::new(hook));
        }
    }
}

impl QueueStore for InterferingStore {
    fn add(&self, queue: QueueKind, entry: QueueEntry) -> Result<bool> {
        self.inner.add(queue, entry)
    }

    fn remove(&self, queue: QueueKind, id: PlayerId) -> Result<bool> {
        self.inner.remove(queue, id)
    }

    fn remove_pair(&self, killer_id: PlayerId, victim_id: PlayerId) -> Result<bool> {
        let hook = self
            .before_remove_pair
            .lock()
            .ok()
            .and_then(|mut slot| slot.take());
        if let Some(hook) = hook {
            hook(&self.inner);
        }
        self.inner.remove_pair(killer_id, victim_id)
    }

    fn list(&self, queue: QueueKind) -> Result<Vec<QueueEntry>> {
        let failing = self
            .failing_lists
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(MatchmakingError::store_unavailable(queue, "injected outage"));
        }
        self.inner.list(queue)
    }

    fn contains(&self, id: PlayerId) -> Result<QueueStatus> {
        self.inner.contains(id)
    }

    fn size(&self, queue: QueueKind) -> Result<usize> {
        self.inner.size(queue)
    }

    fn clear(&self, queue: QueueKind) -> Result<usize> {
        self.inner.clear(queue)
    }

    fn ping(&self) -> Result<()> {
        self.inner.ping()
    }
}

/// Scorer that panics on its first call, then behaves normally
pub struct PanicOnceScorer {
    inner: CompatibilityScorer,
    panicked: AtomicBool,
}

impl PanicOnceScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            inner: CompatibilityScorer::new(config),
            panicked: AtomicBool::new(false),
        }
    }
}

impl PairScorer for PanicOnceScorer {
    fn rate_pair(
        &self,
        killer: &QueueEntry,
        victim: &QueueEntry,
        now: DateTime<Utc>,
    ) -> Result<f64> {
        if !self.panicked.swap(true, Ordering::SeqCst) {
            panic!("scorer blew up");
        }
        self.inner.rate_pair(killer, victim, now)
    }
}

/// Builder for enqueue payloads
#[derive(Debug, Clone)]
pub struct PlayerBuilder {
    payload: PlayerPayload,
}

impl PlayerBuilder {
    pub fn new(id: PlayerId) -> Self {
        Self {
            payload: PlayerPayload {
                id,
                rating: 1000.0,
                player_type: None,
                course_number: None,
                group_name: None,
            },
        }
    }

    pub fn rating(mut self, rating: f64) -> Self {
        self.payload.rating = rating;
        self
    }

    pub fn player_type(mut self, label: &str) -> Self {
        self.payload.player_type = Some(label.to_string());
        self
    }

    pub fn course(mut self, course: i64) -> Self {
        self.payload.course_number = Some(course);
        self
    }

    pub fn group(mut self, group: &str) -> Self {
        self.payload.group_name = Some(group.to_string());
        self
    }

    pub fn build(self) -> PlayerPayload {
        self.payload
    }
}

/// Queue entry with only a rating set
pub fn entry(id: PlayerId, rating: f64, joined_at: DateTime<Utc>) -> QueueEntry {
    let data = PlayerData::new(rating, PlayerType::Unspecified, None, None)
        .expect("fixture rating must be valid");
    QueueEntry::new(id, data, joined_at)
}

/// Configuration scoring by rating alone
pub fn rating_only_config(quality_threshold: f64) -> AppConfig {
    let mut config = AppConfig::default();
    config.scoring = ScoringConfig::rating_only(1000.0);
    config.matchmaking.quality_threshold = quality_threshold;
    config.service.shutdown_timeout_seconds = 5;
    config
}

/// Service over a fresh in-memory store
pub fn build_service(
    config: AppConfig,
    notifier: Arc<RecordingNotifier>,
) -> (MatchmakingService, Arc<InMemoryQueueStore>) {
    let scorer = Arc::new(CompatibilityScorer::new(config.scoring.clone()));
    build_service_with_scorer(config, notifier, scorer)
}

pub fn build_service_with_scorer(
    config: AppConfig,
    notifier: Arc<RecordingNotifier>,
    scorer: Arc<dyn PairScorer>,
) -> (MatchmakingService, Arc<InMemoryQueueStore>) {
    let store = Arc::new(InMemoryQueueStore::default());
    let metrics = Arc::new(MetricsCollector::new().expect("metrics collector"));
    let service = MatchmakingService::from_parts(config, store.clone(), scorer, notifier, metrics);
    (service, store)
}

/// Service over a caller-supplied store
pub fn build_service_with_store(
    config: AppConfig,
    notifier: Arc<RecordingNotifier>,
    store: Arc<dyn QueueStore>,
) -> MatchmakingService {
    let scorer = Arc::new(CompatibilityScorer::new(config.scoring.clone()));
    let metrics = Arc::new(MetricsCollector::new().expect("metrics collector"));
    MatchmakingService::from_parts(config, store, scorer, notifier, metrics)
}

/// Poll `condition` until it holds or `timeout` passes
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
