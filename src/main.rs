//! Main entry point for the killer matchmaking service
//!
//! Loads configuration, initializes logging, verifies the matching backend,
//! then runs the cycle scheduler and the HTTP boundary until SIGINT/SIGTERM.

use anyhow::{Context, Result};
use clap::Parser;
use killer_matchmaking::api::ApiServer;
use killer_matchmaking::config::{validate_config, AppConfig};
use killer_matchmaking::notify::{HttpMatchNotifier, LogOnlyNotifier, MatchNotifier};
use killer_matchmaking::service::{HealthCheck, HealthStatus, MatchmakingService};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

/// Killer Matchmaking Service - pairs killers with victims for the assassin game
#[derive(Parser)]
#[command(
    name = "killer-matchmaking",
    version,
    about = "Matchmaking service pairing killers with victims",
    long_about = "Keeps the killers and victims queues of the assassin game, scores every \
                 candidate pair by rating, course, group, academic type and waiting time, and \
                 notifies the chat bot about each accepted match."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Perform health check and exit
    #[arg(long, help = "Perform a health check and exit with status code")]
    health_check: bool,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// HTTP port override
    #[arg(long, value_name = "PORT", help = "Override HTTP server port")]
    http_port: Option<u16>,

    /// Bot URL override
    #[arg(long, value_name = "URL", help = "Override the chat bot base URL")]
    bot_url: Option<String>,

    /// Cycle interval override
    #[arg(long, value_name = "SECONDS", help = "Override the matchmaking interval")]
    interval: Option<u64>,

    /// Log matches instead of notifying the bot
    #[arg(long, help = "Log matches instead of posting them to the bot")]
    log_only: bool,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(
        long,
        help = "Validate configuration and exit without starting service"
    )]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C) signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

fn display_startup_banner(config: &AppConfig, log_only: bool) {
    info!("🎯 Killer Matchmaking Service");
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!(
        "   HTTP: {}:{}",
        config.service.http_host, config.service.http_port
    );
    if log_only {
        info!("   Bot: disabled (log-only)");
    } else {
        info!("   Bot: {}", config.notifier.bot_url);
    }
    info!(
        "   Cycle: every {}s, threshold {}",
        config.matchmaking.interval_seconds, config.matchmaking.quality_threshold
    );
    info!(
        "   Scoring: max diff {}, course {}, group {}, type {}, time {}",
        config.scoring.max_rating_diff,
        config.scoring.course_coefficient,
        config.scoring.group_coefficient,
        config.scoring.type_coefficient,
        config.scoring.time_coefficient
    );
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

/// Load and merge configuration from file, environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.to_lowercase();
    }
    if args.debug {
        config.service.log_level = "debug".to_string();
    }
    if let Some(http_port) = args.http_port {
        config.service.http_port = http_port;
    }
    if let Some(bot_url) = &args.bot_url {
        config.notifier.bot_url = bot_url.clone();
    }
    if let Some(interval) = args.interval {
        config.matchmaking.interval_seconds = interval;
    }

    validate_config(&config)?;
    Ok(config)
}

fn build_service(config: AppConfig, log_only: bool) -> Result<MatchmakingService> {
    let notifier: Arc<dyn MatchNotifier> = if log_only {
        Arc::new(LogOnlyNotifier)
    } else {
        Arc::new(HttpMatchNotifier::new(&config.notifier)?)
    };
    MatchmakingService::new(config, notifier).context("Failed to initialize service")
}

/// Perform health check and exit with a matching status code
async fn perform_health_check(service: &MatchmakingService) -> Result<()> {
    info!("Performing health check...");
    let health = HealthCheck::check(service).await;

    println!("Health Check: {}", health.status);
    for check in &health.checks {
        match &check.message {
            Some(message) => println!("  {}: {} ({})", check.name, check.status, message),
            None => println!("  {}: {}", check.name, check.status),
        }
    }

    if health.status == HealthStatus::Unhealthy {
        std::process::exit(1);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {:#}", e);
        std::process::exit(1);
    });

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if args.dry_run {
        info!("Configuration validation successful");
        display_startup_banner(&config, args.log_only);
        info!("Dry run completed - exiting without starting service");
        return Ok(());
    }

    display_startup_banner(&config, args.log_only);

    let service = match build_service(config.clone(), args.log_only) {
        Ok(service) => Arc::new(service),
        Err(e) => {
            error!("Failed to initialize application: {:#}", e);
            std::process::exit(1);
        }
    };

    if args.health_check {
        return perform_health_check(&service).await;
    }

    // The service is useless without its matching backend
    if let Err(e) = service.healthcheck().await {
        error!("Startup healthcheck failed: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = service.start().await {
        error!("Failed to start service: {}", e);
        std::process::exit(1);
    }

    let server = Arc::new(ApiServer::new(
        &config.service.http_host,
        config.service.http_port,
        service.clone(),
    ));
    // An unreachable service is as fatal as a failed startup healthcheck
    let listener = match server.bind().await {
        Ok(listener) => listener,
        Err(e) => {
            error!("HTTP server failed to start: {:#}", e);
            if let Err(e) = service.stop().await {
                warn!("Service did not stop cleanly: {}", e);
            }
            std::process::exit(1);
        }
    };
    let server_task = {
        let server = server.clone();
        tokio::spawn(async move {
            if let Err(e) = server.serve(listener).await {
                error!("HTTP server failed: {:#}", e);
            }
        })
    };

    info!("✅ Killer Matchmaking Service is running");
    info!("Press Ctrl+C to shutdown gracefully...");

    wait_for_shutdown_signal().await;
    info!("🛑 Shutdown signal received, beginning graceful shutdown...");

    server.stop();
    if let Err(e) = service.stop().await {
        warn!("Service did not stop cleanly: {}", e);
    }

    match tokio::time::timeout(config.shutdown_timeout(), server_task).await {
        Ok(_) => info!("✅ Graceful shutdown completed successfully"),
        Err(_) => warn!("⚠️  Shutdown timeout exceeded, forcing exit"),
    }

    info!("🛑 Killer Matchmaking Service stopped");
    Ok(())
}
