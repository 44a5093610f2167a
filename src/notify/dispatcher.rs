//! Notification dispatcher
//!
//! A stateless conduit between the core and the external game system: it
//! hands committed matches to the notifier and answers read-only queue
//! queries on the external system's behalf.

use crate::error::Result;
use crate::metrics::MetricsCollector;
use crate::notify::notifier::MatchNotifier;
use crate::queue::QueueStore;
use crate::types::{ExpectedQueues, MatchResult, PlayerId, QueueLengths, QueueStatus};
use std::sync::Arc;
use tracing::{debug, error, warn};

#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn MatchNotifier>,
    store: Arc<dyn QueueStore>,
    metrics: Arc<MetricsCollector>,
}

impl NotificationDispatcher {
    pub fn new(
        notifier: Arc<dyn MatchNotifier>,
        store: Arc<dyn QueueStore>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            notifier,
            store,
            metrics,
        }
    }

    /// Deliver a match once.
    ///
    /// A failure is logged, counted and returned to the caller, but never
    /// retried; the queue removals that produced the match stay in place.
    pub async fn notify_match(&self, result: &MatchResult) -> Result<()> {
        let timer = self.metrics.start_timer();
        let outcome = self.notifier.notify_match(result).await;
        self.metrics
            .record_notification(outcome.is_ok(), timer.stop());

        match &outcome {
            Ok(()) => debug!(
                "Notified match {}: {} -> {}",
                result.match_id, result.killer_id, result.victim_id
            ),
            Err(e) => warn!(
                "Dropping notification for match {} ({} -> {}): {}",
                result.match_id, result.killer_id, result.victim_id, e
            ),
        }
        outcome
    }

    pub fn queue_lengths(&self) -> Result<QueueLengths> {
        self.store.lengths()
    }

    pub fn is_queued(&self, id: PlayerId) -> Result<QueueStatus> {
        self.store.contains(id)
    }

    /// Liveness of the matching backend
    pub async fn healthcheck(&self) -> Result<()> {
        self.store.ping().map_err(|e| {
            error!("Queue store healthcheck failed: {}", e);
            e
        })
    }

    /// Whether the external system answers; not part of liveness
    pub async fn notifier_reachable(&self) -> Result<()> {
        self.notifier.ping().await
    }

    pub async fn expected_queues(&self) -> Result<ExpectedQueues> {
        self.notifier.fetch_expected_queues().await
    }
}
