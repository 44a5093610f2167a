//! Queue reconciliation against the external system's view
//!
//! The bot layer can report which players it believes are waiting. Local
//! entries it does not know about are stale and get removed. Ids it expects
//! but which are not queued locally are only reported: the core holds no
//! player data for them, so the bot must enqueue them again.

use crate::error::Result;
use crate::metrics::MetricsCollector;
use crate::notify::NotificationDispatcher;
use crate::queue::QueueStore;
use crate::types::{ExpectedQueues, PlayerId, QueueKind};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Differences found for one queue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueDiff {
    /// Ids removed locally because the external system no longer expects them
    pub removed: Vec<PlayerId>,
    /// Ids expected by the external system but not queued here
    pub missing: Vec<PlayerId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub killers: QueueDiff,
    pub victims: QueueDiff,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.killers == QueueDiff::default() && self.victims == QueueDiff::default()
    }
}

#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn QueueStore>,
    dispatcher: NotificationDispatcher,
    metrics: Arc<MetricsCollector>,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn QueueStore>,
        dispatcher: NotificationDispatcher,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            metrics,
        }
    }

    /// Fetch the expected membership and apply it
    pub async fn run(&self) -> Result<ReconcileReport> {
        let outcome = match self.dispatcher.expected_queues().await {
            Ok(expected) => self.apply(&expected),
            Err(e) => Err(e),
        };

        self.metrics.record_reconciliation(outcome.is_ok());
        match &outcome {
            Ok(report) if report.is_clean() => info!("Queues already in sync with the bot"),
            Ok(report) => info!(
                "Reconciled queues: removed {}/{} stale killers/victims, {}/{} missing",
                report.killers.removed.len(),
                report.victims.removed.len(),
                report.killers.missing.len(),
                report.victims.missing.len()
            ),
            Err(e) => warn!("Queue reconciliation failed: {}", e),
        }
        outcome
    }

    /// Reconcile local queues against an expected membership
    pub fn apply(&self, expected: &ExpectedQueues) -> Result<ReconcileReport> {
        Ok(ReconcileReport {
            killers: self.apply_queue(QueueKind::Killers, &expected.killers_queue)?,
            victims: self.apply_queue(QueueKind::Victims, &expected.victims_queue)?,
        })
    }

    fn apply_queue(&self, queue: QueueKind, expected: &[PlayerId]) -> Result<QueueDiff> {
        let expected_ids: HashSet<PlayerId> = expected.iter().copied().collect();
        let local = self.store.list(queue)?;
        let local_ids: HashSet<PlayerId> = local.iter().map(|entry| entry.id()).collect();

        let mut diff = QueueDiff::default();
        for entry in &local {
            if !expected_ids.contains(&entry.id()) && self.store.remove(queue, entry.id())? {
                diff.removed.push(entry.id());
            }
        }

        let mut seen = HashSet::new();
        diff.missing = expected
            .iter()
            .copied()
            .filter(|id| !local_ids.contains(id) && seen.insert(*id))
            .collect();

        if !diff.removed.is_empty() {
            self.metrics.record_stale_removed(queue, diff.removed.len());
        }
        Ok(diff)
    }
}
