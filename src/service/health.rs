//! Health reporting for the matchmaking service

use crate::service::app::MatchmakingService;
use crate::types::QueueLengths;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::warn;

/// Health check status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Gauge encoding (0=unhealthy, 1=degraded, 2=healthy)
    pub fn as_gauge(&self) -> u8 {
        match self {
            HealthStatus::Healthy => 2,
            HealthStatus::Degraded => 1,
            HealthStatus::Unhealthy => 0,
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "✅ healthy"),
            HealthStatus::Degraded => write!(f, "⚠️  degraded"),
            HealthStatus::Unhealthy => write!(f, "❌ unhealthy"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Worst status among the components
    pub status: HealthStatus,
    pub service: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub checks: Vec<ComponentCheck>,
    pub stats: ServiceStats,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    pub name: String,
    pub status: HealthStatus,
    /// Error message if not healthy
    pub message: Option<String>,
    /// Check duration in milliseconds
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStats {
    pub queue_lengths: QueueLengths,
    pub matches_total: u64,
    pub uptime_seconds: u64,
}

impl HealthCheck {
    /// Check every component of the service.
    ///
    /// The queue store decides liveness. A stopped scheduler or an
    /// unreachable bot only degrades the service.
    pub async fn check(service: &MatchmakingService) -> Self {
        let checks = vec![
            Self::check_queue_store(service),
            Self::check_scheduler(service),
            Self::check_notifier(service).await,
        ];

        let status = checks
            .iter()
            .map(|check| check.status)
            .max()
            .unwrap_or(HealthStatus::Healthy);

        let metrics = service.metrics();
        metrics.update_health_status(status.as_gauge());
        for check in &checks {
            metrics.update_component_health(&check.name, check.status == HealthStatus::Healthy);
        }

        HealthCheck {
            status,
            service: service.config().service.name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now(),
            checks,
            stats: ServiceStats {
                queue_lengths: service.queue_lengths().unwrap_or_default(),
                matches_total: metrics.matches().matches_total.get(),
                uptime_seconds: service.uptime().as_secs(),
            },
        }
    }

    fn check_queue_store(service: &MatchmakingService) -> ComponentCheck {
        let start = Instant::now();
        let (status, message) = match service.store().ping() {
            Ok(()) => (HealthStatus::Healthy, None),
            Err(e) => (HealthStatus::Unhealthy, Some(e.to_string())),
        };

        ComponentCheck {
            name: "queue_store".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn check_scheduler(service: &MatchmakingService) -> ComponentCheck {
        let (status, message) = if service.is_running() {
            (HealthStatus::Healthy, None)
        } else {
            (
                HealthStatus::Degraded,
                Some("Scheduler is not running".to_string()),
            )
        };

        ComponentCheck {
            name: "scheduler".to_string(),
            status,
            message,
            duration_ms: 0,
        }
    }

    async fn check_notifier(service: &MatchmakingService) -> ComponentCheck {
        let start = Instant::now();
        let (status, message) = match service.dispatcher().notifier_reachable().await {
            Ok(()) => (HealthStatus::Healthy, None),
            Err(e) => {
                warn!("Notifier health check failed: {}", e);
                (HealthStatus::Degraded, Some(e.to_string()))
            }
        };

        ComponentCheck {
            name: "notifier".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }
}
