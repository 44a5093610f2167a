//! One matchmaking cycle: FETCH, FIND_PAIRS, COMMIT, NOTIFY
//!
//! The phases are exposed separately so callers can observe the state between
//! planning and committing. [`MatchingEngine::run_cycle`] chains them.

use crate::engine::matcher::{CandidatePair, GreedyMatcher};
use crate::error::Result;
use crate::metrics::MetricsCollector;
use crate::notify::NotificationDispatcher;
use crate::queue::QueueStore;
use crate::types::{MatchNotification, MatchResult, QueueKind};
use crate::utils::generate_match_id;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Pairs accepted by the planning phase
#[derive(Debug, Clone, Default)]
pub struct CyclePlan {
    pub killers_seen: usize,
    pub victims_seen: usize,
    pub pairs: Vec<CandidatePair>,
    pub scoring_failures: usize,
}

/// Pairs that survived the commit phase
#[derive(Debug, Default)]
pub struct CommitOutcome {
    pub committed: Vec<MatchResult>,
    pub dropped: usize,
}

/// Summary of a finished cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub killers_seen: usize,
    pub victims_seen: usize,
    /// Committed matches in killer iteration order
    pub matches: Vec<MatchNotification>,
    pub dropped_pairs: usize,
    pub notification_failures: usize,
    pub scoring_failures: usize,
}

impl CycleReport {
    /// Whether the cycle found nothing to pair
    pub fn is_idle(&self) -> bool {
        self.killers_seen == 0 || self.victims_seen == 0
    }
}

pub struct MatchingEngine {
    store: Arc<dyn QueueStore>,
    matcher: GreedyMatcher,
    dispatcher: NotificationDispatcher,
    metrics: Arc<MetricsCollector>,
}

impl MatchingEngine {
    pub fn new(
        store: Arc<dyn QueueStore>,
        matcher: GreedyMatcher,
        dispatcher: NotificationDispatcher,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            store,
            matcher,
            dispatcher,
            metrics,
        }
    }

    /// FETCH and FIND_PAIRS
    pub fn plan(&self, now: DateTime<Utc>) -> Result<CyclePlan> {
        let killers = self.store.list(QueueKind::Killers)?;
        let victims = self.store.list(QueueKind::Victims)?;

        let mut plan = CyclePlan {
            killers_seen: killers.len(),
            victims_seen: victims.len(),
            ..CyclePlan::default()
        };
        if killers.is_empty() || victims.is_empty() {
            return Ok(plan);
        }

        let pairing = self.matcher.find_pairs(&killers, &victims, now);
        for _ in 0..pairing.scoring_failures {
            self.metrics.record_scoring_failure();
        }
        plan.pairs = pairing.pairs;
        plan.scoring_failures = pairing.scoring_failures;
        Ok(plan)
    }

    /// COMMIT: remove both sides of every planned pair.
    ///
    /// Each pair is removed through one atomic store call, so a pair is either
    /// committed whole or dropped without touching either queue.
    pub fn commit(&self, plan: CyclePlan, now: DateTime<Utc>) -> CommitOutcome {
        let mut outcome = CommitOutcome::default();

        for pair in plan.pairs {
            match self.commit_pair(&pair) {
                Ok(true) => {
                    self.metrics.record_match(
                        pair.quality,
                        pair.killer.wait_seconds(now),
                        pair.victim.wait_seconds(now),
                    );
                    outcome.committed.push(MatchResult {
                        match_id: generate_match_id(),
                        killer_id: pair.killer.id(),
                        victim_id: pair.victim.id(),
                        killer_data: pair.killer.data().clone(),
                        victim_data: pair.victim.data().clone(),
                        matched_at: now,
                        match_quality: pair.quality,
                    });
                }
                Ok(false) => {
                    warn!(
                        "Dropped pair {} -> {}: a side left the queue before commit",
                        pair.killer.id(),
                        pair.victim.id()
                    );
                    self.metrics.record_pair_dropped();
                    outcome.dropped += 1;
                }
                Err(e) => {
                    error!(
                        "Dropped pair {} -> {}: {}",
                        pair.killer.id(),
                        pair.victim.id(),
                        e
                    );
                    self.metrics.record_pair_dropped();
                    outcome.dropped += 1;
                }
            }
        }

        outcome
    }

    fn commit_pair(&self, pair: &CandidatePair) -> Result<bool> {
        self.store.remove_pair(pair.killer.id(), pair.victim.id())
    }

    /// NOTIFY: hand every committed match to the dispatcher, in order.
    ///
    /// Returns how many notifications failed. Results are dropped once
    /// dispatched.
    pub async fn notify(&self, committed: Vec<MatchResult>) -> usize {
        let mut failures = 0;
        for result in committed {
            if self.dispatcher.notify_match(&result).await.is_err() {
                failures += 1;
            }
        }
        failures
    }

    /// Run one full cycle as of the current time
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run one full cycle as of `now`
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> Result<CycleReport> {
        let timer = self.metrics.start_timer();

        let plan = self.plan(now)?;
        let mut report = CycleReport {
            killers_seen: plan.killers_seen,
            victims_seen: plan.victims_seen,
            scoring_failures: plan.scoring_failures,
            ..CycleReport::default()
        };

        if report.is_idle() {
            debug!(
                "Cycle idle: {} killers, {} victims",
                report.killers_seen, report.victims_seen
            );
            self.metrics.record_cycle("idle", timer.stop());
            return Ok(report);
        }

        let outcome = self.commit(plan, now);
        report.dropped_pairs = outcome.dropped;
        report.matches = outcome
            .committed
            .iter()
            .map(MatchNotification::from)
            .collect();

        for result in &outcome.committed {
            info!(
                "Match {}: killer {} -> victim {} (quality {:.3})",
                result.match_id, result.killer_id, result.victim_id, result.match_quality
            );
        }

        report.notification_failures = self.notify(outcome.committed).await;

        if let Ok(lengths) = self.store.lengths() {
            self.metrics.update_queue_lengths(lengths);
        }
        self.metrics.record_cycle("completed", timer.stop());

        debug!(
            "Cycle done: {} killers, {} victims, {} matched, {} dropped",
            report.killers_seen,
            report.victims_seen,
            report.matches.len(),
            report.dropped_pairs
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringConfig;
    use crate::error::MatchmakingError;
    use crate::notify::notifier::MockMatchNotifier;
    use crate::queue::InMemoryQueueStore;
    use crate::scoring::CompatibilityScorer;
    use crate::types::{PlayerData, PlayerId, PlayerType, QueueEntry};
    use chrono::Duration;

    fn entry(id: PlayerId, rating: f64, joined_at: DateTime<Utc>) -> QueueEntry {
        let data = PlayerData::new(rating, PlayerType::Unspecified, None, None).unwrap();
        QueueEntry::new(id, data, joined_at)
    }

    fn engine(
        store: Arc<InMemoryQueueStore>,
        notifier: MockMatchNotifier,
        threshold: f64,
    ) -> MatchingEngine {
        let metrics = Arc::new(MetricsCollector::new().unwrap());
        let scorer = Arc::new(CompatibilityScorer::new(ScoringConfig::rating_only(1000.0)));
        let dispatcher =
            NotificationDispatcher::new(Arc::new(notifier), store.clone(), metrics.clone());
        MatchingEngine::new(
            store,
            GreedyMatcher::new(scorer, threshold),
            dispatcher,
            metrics,
        )
    }

    #[tokio::test]
    async fn test_close_ratings_are_matched_and_removed() {
        let store = Arc::new(InMemoryQueueStore::default());
        let now = Utc::now();
        store.add(QueueKind::Killers, entry(1, 600.0, now)).unwrap();
        store.add(QueueKind::Victims, entry(2, 620.0, now)).unwrap();

        let mut notifier = MockMatchNotifier::new();
        notifier
            .expect_notify_match()
            .withf(|r| r.killer_id == 1 && r.victim_id == 2 && (r.match_quality - 0.98).abs() < 1e-9)
            .times(1)
            .returning(|_| Ok(()));

        let report = engine(store.clone(), notifier, 0.5)
            .run_cycle_at(now)
            .await
            .unwrap();

        assert_eq!(report.matches.len(), 1);
        assert_eq!(store.lengths().unwrap().killers, 0);
        assert_eq!(store.lengths().unwrap().victims, 0);
    }

    #[tokio::test]
    async fn test_hard_cutoff_leaves_both_queued() {
        let store = Arc::new(InMemoryQueueStore::default());
        let now = Utc::now();
        store.add(QueueKind::Killers, entry(1, 0.0, now)).unwrap();
        store.add(QueueKind::Victims, entry(2, 2000.0, now)).unwrap();

        let mut notifier = MockMatchNotifier::new();
        notifier.expect_notify_match().never();

        let report = engine(store.clone(), notifier, 0.0)
            .run_cycle_at(now)
            .await
            .unwrap();

        assert!(report.matches.is_empty());
        assert!(store.contains(1).unwrap().queued_as_killer);
        assert!(store.contains(2).unwrap().queued_as_victim);
    }

    #[tokio::test]
    async fn test_empty_queue_is_idle() {
        let store = Arc::new(InMemoryQueueStore::default());
        store
            .add(QueueKind::Killers, entry(1, 10.0, Utc::now()))
            .unwrap();

        let mut notifier = MockMatchNotifier::new();
        notifier.expect_notify_match().never();

        let report = engine(store, notifier, 0.5).run_cycle().await.unwrap();
        assert!(report.is_idle());
        assert_eq!(report.killers_seen, 1);
    }

    #[tokio::test]
    async fn test_reset_between_plan_and_commit_drops_pairs() {
        let store = Arc::new(InMemoryQueueStore::default());
        let now = Utc::now();
        store.add(QueueKind::Killers, entry(1, 600.0, now)).unwrap();
        store.add(QueueKind::Victims, entry(2, 600.0, now)).unwrap();

        let mut notifier = MockMatchNotifier::new();
        notifier.expect_notify_match().never();
        let engine = engine(store.clone(), notifier, 0.5);

        let plan = engine.plan(now).unwrap();
        assert_eq!(plan.pairs.len(), 1);

        store.clear(QueueKind::Killers).unwrap();
        store.clear(QueueKind::Victims).unwrap();

        let outcome = engine.commit(plan, now);
        assert!(outcome.committed.is_empty());
        assert_eq!(outcome.dropped, 1);
        assert_eq!(engine.notify(outcome.committed).await, 0);
    }

    #[tokio::test]
    async fn test_vanished_victim_leaves_killer_untouched() {
        let store = Arc::new(InMemoryQueueStore::default());
        let now = Utc::now();
        let killer = entry(1, 600.0, now - Duration::seconds(30));
        store.add(QueueKind::Killers, killer.clone()).unwrap();
        store.add(QueueKind::Victims, entry(2, 600.0, now)).unwrap();

        let engine = engine(store.clone(), MockMatchNotifier::new(), 0.5);
        let plan = engine.plan(now).unwrap();

        store.remove(QueueKind::Victims, 2).unwrap();
        let outcome = engine.commit(plan, now);

        assert_eq!(outcome.dropped, 1);
        let killers = store.list(QueueKind::Killers).unwrap();
        assert_eq!(killers, vec![killer]);
    }

    #[tokio::test]
    async fn test_notification_failure_keeps_removal() {
        let store = Arc::new(InMemoryQueueStore::default());
        let now = Utc::now();
        store.add(QueueKind::Killers, entry(1, 600.0, now)).unwrap();
        store.add(QueueKind::Victims, entry(2, 650.0, now)).unwrap();
        store.add(QueueKind::Killers, entry(3, 900.0, now)).unwrap();
        store.add(QueueKind::Victims, entry(4, 900.0, now)).unwrap();

        let mut notifier = MockMatchNotifier::new();
        notifier.expect_notify_match().times(2).returning(|r| {
            if r.killer_id == 1 {
                Err(MatchmakingError::NotificationFailed {
                    killer_id: r.killer_id,
                    victim_id: r.victim_id,
                    message: "timeout".to_string(),
                })
            } else {
                Ok(())
            }
        });

        let report = engine(store.clone(), notifier, 0.5)
            .run_cycle_at(now)
            .await
            .unwrap();

        assert_eq!(report.matches.len(), 2);
        assert_eq!(report.notification_failures, 1);
        assert_eq!(store.lengths().unwrap().killers, 0);
        assert_eq!(store.lengths().unwrap().victims, 0);
    }
}
