//! Outbound notifier interface

use crate::error::{MatchmakingError, Result};
use crate::types::{ExpectedQueues, MatchNotification, MatchResult};
use async_trait::async_trait;
use tracing::info;

/// Trait for talking to the external game system
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MatchNotifier: Send + Sync {
    /// Deliver one committed match
    async fn notify_match(&self, result: &MatchResult) -> Result<()>;

    /// Membership the external system believes should be queued
    async fn fetch_expected_queues(&self) -> Result<ExpectedQueues>;

    /// Check that the external system answers
    async fn ping(&self) -> Result<()>;
}

/// Notifier that only logs matches, for running without a bot
#[derive(Debug, Default, Clone)]
pub struct LogOnlyNotifier;

#[async_trait]
impl MatchNotifier for LogOnlyNotifier {
    async fn notify_match(&self, result: &MatchResult) -> Result<()> {
        let notification = MatchNotification::from(result);
        info!(
            "Match {} (not delivered): killer {} -> victim {}, quality {:.3}",
            notification.match_id,
            notification.killer_id,
            notification.victim_id,
            notification.match_quality
        );
        Ok(())
    }

    /// There is no membership to compare against, so reconciliation never
    /// applies; an empty answer would mark every queued player stale
    async fn fetch_expected_queues(&self) -> Result<ExpectedQueues> {
        Err(MatchmakingError::ReconciliationFailed {
            message: "no external system in log-only mode".to_string(),
        })
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
