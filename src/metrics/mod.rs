//! Prometheus metrics for the matchmaking service

pub mod collector;

pub use collector::{
    MatchMetrics, MetricsCollector, MetricsTimer, NotifierMetrics, QueueMetrics, ServiceMetrics,
};
