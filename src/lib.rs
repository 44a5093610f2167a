//! Killer Matchmaking - pairing engine for the assassin game
//!
//! This crate keeps the killers and victims queues, scores candidate pairs
//! with a multi-factor compatibility function, commits accepted pairs by
//! removing both players from their queues, and notifies the chat bot layer
//! of every match.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod notify;
pub mod queue;
pub mod scoring;
pub mod service;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{MatchmakingError, Result};
pub use types::*;

// Re-export key components
pub use engine::MatchingEngine;
pub use notify::{MatchNotifier, NotificationDispatcher};
pub use queue::{InMemoryQueueStore, QueueStore};
pub use scoring::{CompatibilityScorer, PairScorer};
pub use service::MatchmakingService;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
