//! Matching engine: pairing policy and the per-cycle pipeline

pub mod cycle;
pub mod matcher;

pub use cycle::{CommitOutcome, CyclePlan, CycleReport, MatchingEngine};
pub use matcher::{CandidatePair, GreedyMatcher, Pairing};
