//! Main application configuration
//!
//! This module defines the primary configuration structures for the killer
//! matchmaking service, including TOML/environment loading and validation.

use crate::config::scoring::ScoringConfig;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub matchmaking: MatchmakingSettings,
    pub scoring: ScoringConfig,
    pub notifier: NotifierSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and health reports
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Address the HTTP API binds to
    pub http_host: String,
    /// Port of the HTTP API, health and metrics endpoints
    pub http_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// Matchmaking cycle settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchmakingSettings {
    /// Seconds between the end of one cycle and the start of the next
    pub interval_seconds: u64,
    /// Minimum score a pair needs to be accepted
    pub quality_threshold: f64,
    /// Seconds between reconciliations against the game system (0 disables)
    pub reconcile_interval_seconds: u64,
}

/// Outbound notification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierSettings {
    /// Base URL of the game/bot service receiving matches
    pub bot_url: String,
    /// Shared secret sent with every match notification
    pub secret_key: String,
    /// Timeout for a single outbound request in seconds
    pub request_timeout_seconds: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "killer-matchmaking".to_string(),
            log_level: "info".to_string(),
            http_host: "0.0.0.0".to_string(),
            http_port: 6543,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl Default for MatchmakingSettings {
    fn default() -> Self {
        Self {
            interval_seconds: 5,
            quality_threshold: 0.6,
            reconcile_interval_seconds: 0,
        }
    }
}

impl Default for NotifierSettings {
    fn default() -> Self {
        Self {
            bot_url: "http://localhost:8000".to_string(),
            secret_key: String::new(),
            request_timeout_seconds: 5,
        }
    }
}

/// Read and parse an environment variable, `None` when unset
fn env_value<T: FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("Invalid {} value: {}", name, raw)),
        Err(_) => Ok(None),
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file; environment variables still win
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config = Self::from_toml_str(&raw)?;
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Parse configuration from TOML text without applying the environment
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("Failed to parse TOML configuration")
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Some(name) = env_value("SERVICE_NAME")? {
            self.service.name = name;
        }
        if let Some(level) = env_value::<String>("LOG_LEVEL")? {
            self.service.log_level = level.to_lowercase();
        }
        if let Some(port) = env_value("PORT")? {
            self.service.http_port = port;
        }
        if let Some(timeout) = env_value("SHUTDOWN_TIMEOUT_SECONDS")? {
            self.service.shutdown_timeout_seconds = timeout;
        }

        // Matchmaking settings
        if let Some(interval) = env_value("MATCHMAKING_INTERVAL")? {
            self.matchmaking.interval_seconds = interval;
        }
        if let Some(threshold) = env_value("QUALITY_THRESHOLD")? {
            self.matchmaking.quality_threshold = threshold;
        }
        if let Some(interval) = env_value("RECONCILE_INTERVAL")? {
            self.matchmaking.reconcile_interval_seconds = interval;
        }

        // Scoring coefficients
        if let Some(diff) = env_value("MAX_RATING_DIFF")? {
            self.scoring.max_rating_diff = diff;
        }
        if let Some(course) = env_value("COURSE_COEFFICIENT")? {
            self.scoring.course_coefficient = course;
        }
        if let Some(group) = env_value("GROUP_COEFFICIENT")? {
            self.scoring.group_coefficient = group;
        }
        if let Some(kind) = env_value("TYPE_COEFFICIENT")? {
            self.scoring.type_coefficient = kind;
        }
        if let Some(time) = env_value("TIME_COEFFICIENT")? {
            self.scoring.time_coefficient = time;
        }

        // Notifier settings
        if let Some(url) = env_value("BOT_URL")? {
            self.notifier.bot_url = url;
        }
        if let Ok(secret) = env::var("SECRET_KEY") {
            self.notifier.secret_key = secret;
        }
        if let Some(timeout) = env_value("NOTIFY_TIMEOUT_SECONDS")? {
            self.notifier.request_timeout_seconds = timeout;
        }

        Ok(())
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Get the pause between matchmaking cycles as Duration
    pub fn matchmaking_interval(&self) -> Duration {
        Duration::from_secs(self.matchmaking.interval_seconds)
    }

    /// Get the reconciliation period, `None` when disabled
    pub fn reconcile_interval(&self) -> Option<Duration> {
        match self.matchmaking.reconcile_interval_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Get the outbound request timeout as Duration
    pub fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.notifier.request_timeout_seconds)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.http_port == 0 {
        return Err(anyhow!("HTTP port cannot be 0"));
    }
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }

    if config.matchmaking.interval_seconds == 0 {
        return Err(anyhow!("Matchmaking interval must be greater than 0"));
    }
    let threshold = config.matchmaking.quality_threshold;
    if !(0.0..=1.0).contains(&threshold) {
        return Err(anyhow!(
            "Quality threshold must be within [0, 1], got {}",
            threshold
        ));
    }

    config.scoring.validate()?;

    if config.notifier.bot_url.trim().is_empty() {
        return Err(anyhow!("Bot URL cannot be empty"));
    }
    if config.notifier.request_timeout_seconds == 0 {
        return Err(anyhow!("Notification timeout must be greater than 0"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.matchmaking_interval(), Duration::from_secs(5));
        assert_eq!(config.reconcile_interval(), None);
        assert!(config.scoring.course_coefficient > 0.0);
        assert!(config.scoring.group_coefficient < 0.0);
        assert!(config.scoring.type_coefficient < 0.0);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [matchmaking]
            interval_seconds = 2
            quality_threshold = 0.5

            [scoring]
            type_coefficient = -0.1
            "#,
        )
        .unwrap();

        assert_eq!(config.matchmaking.interval_seconds, 2);
        assert_eq!(config.matchmaking.quality_threshold, 0.5);
        assert_eq!(config.scoring.type_coefficient, -0.1);
        assert_eq!(config.scoring.max_rating_diff, 1000.0);
        assert_eq!(config.service.http_port, 6543);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.matchmaking.quality_threshold = 1.5;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.scoring.max_rating_diff = 0.0;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.matchmaking.interval_seconds = 0;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.service.log_level = "loud".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.notifier.bot_url = " ".to_string();
        assert!(validate_config(&config).is_err());
    }
}
