//! HTTP server for the queue API, health checks and Prometheus metrics

use crate::api::handlers::{self, ApiState};
use anyhow::{Context, Result};
use axum::{
    routing::{delete, get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Build the router with every route of the boundary
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/ping", get(handlers::ping))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .route("/queues", get(handlers::snapshot))
        .route("/queues/len", get(handlers::queue_lengths))
        .route("/queues/both", post(handlers::add_to_both))
        .route("/queues/reset", post(handlers::reset_queues))
        .route("/queues/reconcile", post(handlers::reconcile))
        .route("/queues/{kind}", post(handlers::add_player))
        .route("/queues/{kind}/{id}", delete(handlers::remove_player))
        .route("/players/{id}", get(handlers::player_status))
        .with_state(state)
}

pub struct ApiServer {
    addr: String,
    state: ApiState,
    shutdown_tx: broadcast::Sender<()>,
}

impl ApiServer {
    pub fn new(host: &str, port: u16, state: ApiState) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            addr: format!("{}:{}", host, port),
            state,
            shutdown_tx,
        }
    }

    /// Bind the configured `host:port`; the host may be a name or an address
    pub async fn bind(&self) -> Result<TcpListener> {
        let listener = TcpListener::bind(self.addr.as_str())
            .await
            .with_context(|| format!("Failed to bind {}", self.addr))?;

        let local = listener.local_addr().context("Bound socket has no address")?;
        info!("HTTP server listening on http://{} ({})", self.addr, local);
        Ok(listener)
    }

    /// Bind, then serve until [`ApiServer::stop`] is called
    pub async fn start(&self) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until [`ApiServer::stop`] is called
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        axum::serve(listener, router(self.state.clone()))
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("HTTP server shutdown signal received");
            })
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }

    pub fn stop(&self) {
        if let Err(e) = self.shutdown_tx.send(()) {
            warn!("Failed to send shutdown signal to HTTP server: {}", e);
        }
    }
}
