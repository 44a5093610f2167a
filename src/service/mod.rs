//! Service layer: lifecycle, scheduling, reconciliation and health

pub mod app;
pub mod health;
pub mod reconcile;

pub use app::MatchmakingService;
pub use health::{ComponentCheck, HealthCheck, HealthStatus};
pub use reconcile::{QueueDiff, ReconcileReport, Reconciler};
