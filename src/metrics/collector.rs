//! Metrics collection using Prometheus
//!
//! Every metric lives in a registry owned by the collector, so tests can
//! create as many collectors as they like without global registration clashes.

use crate::types::{QueueKind, QueueLengths};
use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Opts, Registry,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the matchmaking service
#[derive(Clone)]
pub struct MetricsCollector {
    registry: Arc<Registry>,
    service_metrics: ServiceMetrics,
    queue_metrics: QueueMetrics,
    match_metrics: MatchMetrics,
    notifier_metrics: NotifierMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,

    /// Component health status
    pub component_health: IntGaugeVec,
}

/// Queue membership metrics
#[derive(Clone)]
pub struct QueueMetrics {
    /// Enqueue attempts by queue and outcome (added, duplicate, rejected)
    pub enqueues_total: IntCounterVec,

    /// Explicit removals by queue
    pub removals_total: IntCounterVec,

    /// Current queue length
    pub queue_length: IntGaugeVec,

    /// Queue resets
    pub resets_total: IntCounter,
}

/// Matching cycle metrics
#[derive(Clone)]
pub struct MatchMetrics {
    /// Cycles run, by outcome (completed, idle, failed)
    pub cycles_total: IntCounterVec,

    /// Cycles that errored or panicked
    pub cycle_failures_total: IntCounter,

    /// Pairs committed and handed to the notifier
    pub matches_total: IntCounter,

    /// Accepted pairs dropped at commit
    pub pairs_dropped_total: IntCounter,

    /// Candidates skipped because scoring failed
    pub scoring_failures_total: IntCounter,

    /// Quality of committed matches
    pub match_quality: Histogram,

    /// Wall time of a full cycle
    pub cycle_duration_seconds: Histogram,

    /// Time a player waited before being matched
    pub wait_time_at_match_seconds: HistogramVec,
}

/// Outbound call metrics
#[derive(Clone)]
pub struct NotifierMetrics {
    /// Match notifications by status
    pub notifications_total: IntCounterVec,

    /// Notification call duration
    pub notification_duration_seconds: Histogram,

    /// Reconciliation runs by status
    pub reconciliations_total: IntCounterVec,

    /// Entries removed as stale by reconciliation
    pub stale_entries_removed_total: IntCounterVec,
}

impl MetricsCollector {
    /// Create a new metrics collector with its own registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let queue_metrics = QueueMetrics::new(&registry)?;
        let match_metrics = MatchMetrics::new(&registry)?;
        let notifier_metrics = NotifierMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            queue_metrics,
            match_metrics,
            notifier_metrics,
        })
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    pub fn queue(&self) -> &QueueMetrics {
        &self.queue_metrics
    }

    pub fn matches(&self) -> &MatchMetrics {
        &self.match_metrics
    }

    pub fn notifier(&self) -> &NotifierMetrics {
        &self.notifier_metrics
    }

    /// Record the outcome of an enqueue attempt
    pub fn record_enqueue(&self, queue: QueueKind, outcome: &str) {
        self.queue_metrics
            .enqueues_total
            .with_label_values(&[queue.as_str(), outcome])
            .inc();
    }

    pub fn record_removal(&self, queue: QueueKind) {
        self.queue_metrics
            .removals_total
            .with_label_values(&[queue.as_str()])
            .inc();
    }

    pub fn record_reset(&self) {
        self.queue_metrics.resets_total.inc();
    }

    /// Refresh both queue length gauges
    pub fn update_queue_lengths(&self, lengths: QueueLengths) {
        self.queue_metrics
            .queue_length
            .with_label_values(&[QueueKind::Killers.as_str()])
            .set(lengths.killers as i64);
        self.queue_metrics
            .queue_length
            .with_label_values(&[QueueKind::Victims.as_str()])
            .set(lengths.victims as i64);
    }

    /// Record a finished cycle
    pub fn record_cycle(&self, outcome: &str, duration: Duration) {
        self.match_metrics
            .cycles_total
            .with_label_values(&[outcome])
            .inc();
        self.match_metrics
            .cycle_duration_seconds
            .observe(duration.as_secs_f64());
    }

    pub fn record_cycle_failure(&self) {
        self.match_metrics.cycle_failures_total.inc();
        self.match_metrics
            .cycles_total
            .with_label_values(&["failed"])
            .inc();
    }

    /// Record a committed match and how long each side waited
    pub fn record_match(&self, quality: f64, killer_wait: f64, victim_wait: f64) {
        self.match_metrics.matches_total.inc();
        self.match_metrics.match_quality.observe(quality);
        self.match_metrics
            .wait_time_at_match_seconds
            .with_label_values(&[QueueKind::Killers.as_str()])
            .observe(killer_wait);
        self.match_metrics
            .wait_time_at_match_seconds
            .with_label_values(&[QueueKind::Victims.as_str()])
            .observe(victim_wait);
    }

    pub fn record_pair_dropped(&self) {
        self.match_metrics.pairs_dropped_total.inc();
    }

    pub fn record_scoring_failure(&self) {
        self.match_metrics.scoring_failures_total.inc();
    }

    /// Record a notification attempt
    pub fn record_notification(&self, success: bool, duration: Duration) {
        let status = if success { "success" } else { "failed" };
        self.notifier_metrics
            .notifications_total
            .with_label_values(&[status])
            .inc();
        self.notifier_metrics
            .notification_duration_seconds
            .observe(duration.as_secs_f64());
    }

    /// Record a reconciliation run
    pub fn record_reconciliation(&self, success: bool) {
        let status = if success { "success" } else { "failed" };
        self.notifier_metrics
            .reconciliations_total
            .with_label_values(&[status])
            .inc();
    }

    pub fn record_stale_removed(&self, queue: QueueKind, count: usize) {
        self.notifier_metrics
            .stale_entries_removed_total
            .with_label_values(&[queue.as_str()])
            .inc_by(count as u64);
    }

    /// Update health status
    pub fn update_health_status(&self, status: u8) {
        self.service_metrics.health_status.set(status as i64);
    }

    /// Update component health
    pub fn update_component_health(&self, component: &str, healthy: bool) {
        let status = if healthy { 1 } else { 0 };
        self.service_metrics
            .component_health
            .with_label_values(&[component])
            .set(status);
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds =
            IntGauge::new("killer_mm_uptime_seconds", "Service uptime in seconds")?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let health_status = IntGauge::new(
            "killer_mm_health_status",
            "Health status (0=unhealthy, 1=degraded, 2=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        let component_health = IntGaugeVec::new(
            Opts::new("killer_mm_component_health", "Component health status"),
            &["component"],
        )?;
        registry.register(Box::new(component_health.clone()))?;

        Ok(Self {
            uptime_seconds,
            health_status,
            component_health,
        })
    }
}

impl QueueMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let enqueues_total = IntCounterVec::new(
            Opts::new("killer_mm_enqueues_total", "Enqueue attempts by outcome"),
            &["queue", "outcome"],
        )?;
        registry.register(Box::new(enqueues_total.clone()))?;

        let removals_total = IntCounterVec::new(
            Opts::new("killer_mm_removals_total", "Explicit queue removals"),
            &["queue"],
        )?;
        registry.register(Box::new(removals_total.clone()))?;

        let queue_length = IntGaugeVec::new(
            Opts::new("killer_mm_queue_length", "Players currently waiting"),
            &["queue"],
        )?;
        registry.register(Box::new(queue_length.clone()))?;

        let resets_total = IntCounter::new("killer_mm_queue_resets_total", "Queue resets")?;
        registry.register(Box::new(resets_total.clone()))?;

        Ok(Self {
            enqueues_total,
            removals_total,
            queue_length,
            resets_total,
        })
    }
}

impl MatchMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let cycles_total = IntCounterVec::new(
            Opts::new("killer_mm_cycles_total", "Matchmaking cycles run"),
            &["outcome"],
        )?;
        registry.register(Box::new(cycles_total.clone()))?;

        let cycle_failures_total = IntCounter::new(
            "killer_mm_cycle_failures_total",
            "Cycles that errored or panicked",
        )?;
        registry.register(Box::new(cycle_failures_total.clone()))?;

        let matches_total = IntCounter::new("killer_mm_matches_total", "Committed matches")?;
        registry.register(Box::new(matches_total.clone()))?;

        let pairs_dropped_total = IntCounter::new(
            "killer_mm_pairs_dropped_total",
            "Accepted pairs dropped at commit",
        )?;
        registry.register(Box::new(pairs_dropped_total.clone()))?;

        let scoring_failures_total = IntCounter::new(
            "killer_mm_scoring_failures_total",
            "Candidates skipped after a scoring failure",
        )?;
        registry.register(Box::new(scoring_failures_total.clone()))?;

        let match_quality = Histogram::with_opts(
            HistogramOpts::new("killer_mm_match_quality", "Quality of committed matches")
                .buckets(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0]),
        )?;
        registry.register(Box::new(match_quality.clone()))?;

        let cycle_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "killer_mm_cycle_duration_seconds",
                "Matchmaking cycle duration",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        )?;
        registry.register(Box::new(cycle_duration_seconds.clone()))?;

        let wait_time_at_match_seconds = HistogramVec::new(
            HistogramOpts::new(
                "killer_mm_wait_time_at_match_seconds",
                "Time spent queued before being matched",
            )
            .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 300.0, 900.0, 3600.0]),
            &["queue"],
        )?;
        registry.register(Box::new(wait_time_at_match_seconds.clone()))?;

        Ok(Self {
            cycles_total,
            cycle_failures_total,
            matches_total,
            pairs_dropped_total,
            scoring_failures_total,
            match_quality,
            cycle_duration_seconds,
            wait_time_at_match_seconds,
        })
    }
}

impl NotifierMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let notifications_total = IntCounterVec::new(
            Opts::new("killer_mm_notifications_total", "Match notifications sent"),
            &["status"],
        )?;
        registry.register(Box::new(notifications_total.clone()))?;

        let notification_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "killer_mm_notification_duration_seconds",
                "Match notification call duration",
            )
            .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]),
        )?;
        registry.register(Box::new(notification_duration_seconds.clone()))?;

        let reconciliations_total = IntCounterVec::new(
            Opts::new("killer_mm_reconciliations_total", "Reconciliation runs"),
            &["status"],
        )?;
        registry.register(Box::new(reconciliations_total.clone()))?;

        let stale_entries_removed_total = IntCounterVec::new(
            Opts::new(
                "killer_mm_stale_entries_removed_total",
                "Queue entries removed by reconciliation",
            ),
            &["queue"],
        )?;
        registry.register(Box::new(stale_entries_removed_total.clone()))?;

        Ok(Self {
            notifications_total,
            notification_duration_seconds,
            reconciliations_total,
            stale_entries_removed_total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::{Encoder, TextEncoder};

    fn render(collector: &MetricsCollector) -> String {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&collector.registry().gather(), &mut buffer)
            .unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_collectors_do_not_share_registries() {
        let first = MetricsCollector::new().expect("Failed to create metrics collector");
        let second = MetricsCollector::new().expect("Failed to create metrics collector");

        first.record_pair_dropped();
        assert_eq!(first.matches().pairs_dropped_total.get(), 1);
        assert_eq!(second.matches().pairs_dropped_total.get(), 0);
    }

    #[test]
    fn test_enqueue_outcomes_are_labelled() {
        let collector = MetricsCollector::new().unwrap();

        collector.record_enqueue(QueueKind::Killers, "added");
        collector.record_enqueue(QueueKind::Killers, "duplicate");
        collector.record_enqueue(QueueKind::Killers, "duplicate");

        let enqueues = &collector.queue().enqueues_total;
        assert_eq!(enqueues.with_label_values(&["killers", "added"]).get(), 1);
        assert_eq!(enqueues.with_label_values(&["killers", "duplicate"]).get(), 2);
        assert_eq!(enqueues.with_label_values(&["victims", "added"]).get(), 0);
    }

    #[test]
    fn test_match_and_cycle_recording() {
        let collector = MetricsCollector::new().unwrap();

        collector.record_cycle("completed", Duration::from_millis(3));
        collector.record_cycle_failure();
        collector.record_match(0.8, 12.0, 30.0);
        collector.update_queue_lengths(QueueLengths {
            killers: 3,
            victims: 4,
        });

        assert_eq!(collector.matches().matches_total.get(), 1);
        assert_eq!(collector.matches().cycle_failures_total.get(), 1);
        assert_eq!(
            collector
                .queue()
                .queue_length
                .with_label_values(&["victims"])
                .get(),
            4
        );

        let text = render(&collector);
        assert!(text.contains("killer_mm_match_quality"));
        assert!(text.contains("killer_mm_cycles_total"));
    }

    #[test]
    fn test_metrics_timer() {
        let collector = MetricsCollector::new().unwrap();
        let timer = collector.start_timer();

        std::thread::sleep(Duration::from_millis(10));
        assert!(timer.elapsed() >= Duration::from_millis(10));
        assert!(timer.stop() >= Duration::from_millis(10));
    }
}
