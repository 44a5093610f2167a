//! Configuration management for the killer matchmaking service
//!
//! This module handles configuration loading from TOML files and environment
//! variables, validation, and default values. The resulting config is built
//! once at startup and shared read-only.

pub mod app;
pub mod scoring;

// Re-export commonly used types
pub use app::{validate_config, AppConfig, MatchmakingSettings, NotifierSettings, ServiceSettings};
pub use scoring::ScoringConfig;
