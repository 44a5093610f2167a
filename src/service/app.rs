//! Service lifecycle: wiring, the cycle scheduler and admin operations
//!
//! [`MatchmakingService`] owns the queue store and runs the matching engine
//! on a fixed interval in a background task. Request handlers call into it
//! concurrently with the scheduler.

use crate::config::AppConfig;
use crate::engine::{GreedyMatcher, MatchingEngine};
use crate::error::{MatchmakingError, Result};
use crate::metrics::MetricsCollector;
use crate::notify::{MatchNotifier, NotificationDispatcher};
use crate::queue::{InMemoryQueueStore, QueueStore};
use crate::scoring::{CompatibilityScorer, PairScorer};
use crate::service::reconcile::{ReconcileReport, Reconciler};
use crate::types::{
    DualEnqueue, PlayerId, PlayerPayload, QueueEntry, QueueKind, QueueLengths, QueueSnapshot,
    QueueStatus,
};
use crate::utils::current_timestamp;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

const HEALTH_METRICS_INTERVAL: Duration = Duration::from_secs(15);

struct BackgroundTasks {
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

pub struct MatchmakingService {
    config: Arc<AppConfig>,
    store: Arc<dyn QueueStore>,
    engine: Arc<MatchingEngine>,
    dispatcher: NotificationDispatcher,
    reconciler: Reconciler,
    metrics: Arc<MetricsCollector>,
    cycle_interval: Duration,
    started_at: Instant,
    running: Arc<AtomicBool>,
    tasks: Mutex<Option<BackgroundTasks>>,
}

impl MatchmakingService {
    /// Build the service with an in-memory store and the configured scorer
    pub fn new(config: AppConfig, notifier: Arc<dyn MatchNotifier>) -> Result<Self> {
        let metrics = Arc::new(MetricsCollector::new().map_err(|e| {
            MatchmakingError::InternalError {
                message: format!("Failed to create metrics collector: {}", e),
            }
        })?);
        let scorer = Arc::new(CompatibilityScorer::new(config.scoring.clone()));

        Ok(Self::from_parts(
            config,
            Arc::new(InMemoryQueueStore::default()),
            scorer,
            notifier,
            metrics,
        ))
    }

    /// Build the service from explicit components
    pub fn from_parts(
        config: AppConfig,
        store: Arc<dyn QueueStore>,
        scorer: Arc<dyn PairScorer>,
        notifier: Arc<dyn MatchNotifier>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        let dispatcher = NotificationDispatcher::new(notifier, store.clone(), metrics.clone());
        let matcher = GreedyMatcher::new(scorer, config.matchmaking.quality_threshold);
        let engine = Arc::new(MatchingEngine::new(
            store.clone(),
            matcher,
            dispatcher.clone(),
            metrics.clone(),
        ));
        let reconciler = Reconciler::new(store.clone(), dispatcher.clone(), metrics.clone());
        let cycle_interval = config.matchmaking_interval();

        Self {
            config: Arc::new(config),
            store,
            engine,
            dispatcher,
            reconciler,
            metrics,
            cycle_interval,
            started_at: Instant::now(),
            running: Arc::new(AtomicBool::new(false)),
            tasks: Mutex::new(None),
        }
    }

    /// Override the pause between cycles
    pub fn with_cycle_interval(mut self, interval: Duration) -> Self {
        self.cycle_interval = interval;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    pub fn store(&self) -> Arc<dyn QueueStore> {
        self.store.clone()
    }

    pub fn engine(&self) -> Arc<MatchingEngine> {
        self.engine.clone()
    }

    pub fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Start the scheduler and the periodic maintenance tasks.
    ///
    /// Runs one reconciliation first; its failure is logged, not fatal.
    pub async fn start(&self) -> Result<()> {
        let mut tasks = self.tasks.lock().await;
        if tasks.is_some() {
            warn!("Matchmaking service already running");
            return Ok(());
        }

        info!("Starting killer matchmaking service");

        if let Err(e) = self.reconciler.run().await {
            warn!("Startup reconciliation failed, continuing: {}", e);
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut handles = Vec::new();

        info!(
            "Starting matchmaking scheduler ({}ms interval, threshold {})",
            self.cycle_interval.as_millis(),
            self.config.matchmaking.quality_threshold
        );
        handles.push((
            "scheduler",
            tokio::spawn(run_scheduler(
                self.engine.clone(),
                self.metrics.clone(),
                self.cycle_interval,
                shutdown_rx.clone(),
            )),
        ));

        if let Some(period) = self.config.reconcile_interval() {
            info!("Starting reconciliation task ({}s interval)", period.as_secs());
            handles.push((
                "reconciler",
                tokio::spawn(run_reconciler(
                    self.reconciler.clone(),
                    period,
                    shutdown_rx.clone(),
                )),
            ));
        }

        handles.push((
            "health_metrics",
            tokio::spawn(run_health_metrics(
                self.store.clone(),
                self.metrics.clone(),
                self.started_at,
                shutdown_rx,
            )),
        ));

        self.running.store(true, Ordering::SeqCst);
        *tasks = Some(BackgroundTasks {
            shutdown_tx,
            handles,
        });

        info!("✅ Killer matchmaking service started");
        Ok(())
    }

    /// Stop background tasks.
    ///
    /// A sleeping scheduler stops at once; an in-flight cycle is allowed to
    /// finish, bounded by the configured shutdown timeout.
    pub async fn stop(&self) -> Result<()> {
        let Some(tasks) = self.tasks.lock().await.take() else {
            debug!("Matchmaking service not running");
            return Ok(());
        };

        info!("Stopping killer matchmaking service");
        self.running.store(false, Ordering::SeqCst);
        let _ = tasks.shutdown_tx.send(true);

        let timeout = self.config.shutdown_timeout();
        for (name, mut handle) in tasks.handles {
            match tokio::time::timeout(timeout, &mut handle).await {
                Ok(Ok(())) => debug!("Background task '{}' stopped", name),
                Ok(Err(e)) => error!("Background task '{}' ended abnormally: {}", name, e),
                Err(_) => {
                    warn!(
                        "Background task '{}' did not stop within {}s, aborting",
                        name,
                        timeout.as_secs()
                    );
                    handle.abort();
                }
            }
        }

        info!("✅ Killer matchmaking service stopped");
        Ok(())
    }

    /// Enqueue a validated player in one queue; `false` when already queued there
    pub fn add_player(&self, queue: QueueKind, payload: PlayerPayload) -> Result<bool> {
        let entry = self.validated_entry(queue, payload)?;
        self.enqueue(queue, entry)
    }

    /// Enqueue the same snapshot in both queues
    pub fn add_to_both(&self, payload: PlayerPayload) -> Result<DualEnqueue> {
        let (id, data) = payload.into_player().map_err(|e| {
            for queue in QueueKind::ALL {
                self.metrics.record_enqueue(queue, "rejected");
            }
            e
        })?;
        let entry = QueueEntry::new(id, data, current_timestamp());

        Ok(DualEnqueue {
            added_as_killer: self.enqueue(QueueKind::Killers, entry.clone())?,
            added_as_victim: self.enqueue(QueueKind::Victims, entry)?,
        })
    }

    fn validated_entry(&self, queue: QueueKind, payload: PlayerPayload) -> Result<QueueEntry> {
        match payload.into_player() {
            Ok((id, data)) => Ok(QueueEntry::new(id, data, current_timestamp())),
            Err(e) => {
                debug!("Rejected {} enqueue: {}", queue, e);
                self.metrics.record_enqueue(queue, "rejected");
                Err(e)
            }
        }
    }

    fn enqueue(&self, queue: QueueKind, entry: QueueEntry) -> Result<bool> {
        let id = entry.id();
        let added = self.store.add(queue, entry).map_err(|e| {
            error!("Failed to enqueue {} into {}: {}", id, queue, e);
            e
        })?;

        if added {
            info!("Player {} joined the {} queue", id, queue);
            self.metrics.record_enqueue(queue, "added");
        } else {
            debug!("Player {} already waits in the {} queue", id, queue);
            self.metrics.record_enqueue(queue, "duplicate");
        }
        Ok(added)
    }

    /// Remove a player from one queue; `false` when not queued there
    pub fn remove_player(&self, queue: QueueKind, id: PlayerId) -> Result<bool> {
        let removed = self.store.remove(queue, id)?;
        if removed {
            info!("Player {} left the {} queue", id, queue);
            self.metrics.record_removal(queue);
        }
        Ok(removed)
    }

    pub fn queue_lengths(&self) -> Result<QueueLengths> {
        self.dispatcher.queue_lengths()
    }

    pub fn player_status(&self, id: PlayerId) -> Result<QueueStatus> {
        self.dispatcher.is_queued(id)
    }

    /// Both queues in `joined_at` order
    pub fn snapshot(&self) -> Result<QueueSnapshot> {
        Ok(QueueSnapshot {
            killers: self.store.list(QueueKind::Killers)?,
            victims: self.store.list(QueueKind::Victims)?,
        })
    }

    /// Clear both queues, returning how many entries each held.
    ///
    /// Safe during a cycle: that cycle's pending commits find nothing to
    /// remove and drop their pairs.
    pub fn reset_queues(&self) -> Result<QueueLengths> {
        let cleared = QueueLengths {
            killers: self.store.clear(QueueKind::Killers)?,
            victims: self.store.clear(QueueKind::Victims)?,
        };
        self.metrics.record_reset();
        self.metrics.update_queue_lengths(QueueLengths::default());
        info!(
            "Queues reset: {} killers and {} victims cleared",
            cleared.killers, cleared.victims
        );
        Ok(cleared)
    }

    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        self.reconciler.run().await
    }

    /// Liveness of the matching backend; fatal at startup
    pub async fn healthcheck(&self) -> Result<()> {
        self.dispatcher.healthcheck().await
    }
}

/// Cycle scheduler: one cycle at a time, fixed pause between them
async fn run_scheduler(
    engine: Arc<MatchingEngine>,
    metrics: Arc<MetricsCollector>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!("Matchmaking scheduler started");

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }

        // The cycle runs outside the select so shutdown never interrupts it
        run_guarded_cycle(&engine, &metrics).await;

        if *shutdown.borrow() {
            break;
        }
    }

    info!("Matchmaking scheduler stopped");
}

/// Run one cycle in its own task so a panic is contained and logged
async fn run_guarded_cycle(engine: &Arc<MatchingEngine>, metrics: &MetricsCollector) {
    let task_engine = engine.clone();
    match tokio::spawn(async move { task_engine.run_cycle().await }).await {
        Ok(Ok(report)) => {
            if !report.matches.is_empty() || report.dropped_pairs > 0 {
                info!(
                    "Cycle matched {} pairs ({} dropped, {} notifications failed)",
                    report.matches.len(),
                    report.dropped_pairs,
                    report.notification_failures
                );
            }
        }
        Ok(Err(e)) => {
            error!("Matchmaking cycle skipped: {}", e);
            metrics.record_cycle_failure();
        }
        Err(e) if e.is_panic() => {
            error!("Matchmaking cycle panicked: {}", e);
            metrics.record_cycle_failure();
        }
        Err(e) => {
            error!("Matchmaking cycle task cancelled: {}", e);
            metrics.record_cycle_failure();
        }
    }
}

async fn run_reconciler(
    reconciler: Reconciler,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately and startup already reconciled
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }
        // Failures are logged and counted inside the reconciler
        let _ = reconciler.run().await;
    }

    info!("Reconciliation task stopped");
}

async fn run_health_metrics(
    store: Arc<dyn QueueStore>,
    metrics: Arc<MetricsCollector>,
    started_at: Instant,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(HEALTH_METRICS_INTERVAL);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }

        metrics
            .service()
            .uptime_seconds
            .set(started_at.elapsed().as_secs() as i64);

        let store_healthy = store.ping().is_ok();
        metrics.update_component_health("queue_store", store_healthy);
        metrics.update_health_status(if store_healthy { 2 } else { 0 });

        if let Ok(lengths) = store.lengths() {
            metrics.update_queue_lengths(lengths);
            debug!(
                "Queue lengths: {} killers, {} victims",
                lengths.killers, lengths.victims
            );
        }
    }
}
