//! Compatibility scoring between a killer and a victim candidate

pub mod compatibility;

pub use compatibility::{CompatibilityScorer, PairScorer, ScoreBreakdown};
