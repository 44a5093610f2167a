//! Greedy killer-seeks-best-victim pairing
//!
//! Killers are visited in `joined_at` order and each takes the best-scoring
//! victim still free this cycle. Ties between victims go to the one listed
//! first, i.e. the one waiting longest. This is deterministic but not a
//! globally optimal assignment.

use crate::scoring::PairScorer;
use crate::types::{PlayerId, QueueEntry};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// A provisionally accepted pair, not yet removed from the queues
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePair {
    pub killer: QueueEntry,
    pub victim: QueueEntry,
    pub quality: f64,
}

/// Result of one pairing pass
#[derive(Debug, Clone, Default)]
pub struct Pairing {
    /// Pairs in killer iteration order
    pub pairs: Vec<CandidatePair>,
    /// Candidates skipped because scoring failed
    pub scoring_failures: usize,
}

pub struct GreedyMatcher {
    scorer: Arc<dyn PairScorer>,
    quality_threshold: f64,
}

impl GreedyMatcher {
    pub fn new(scorer: Arc<dyn PairScorer>, quality_threshold: f64) -> Self {
        Self {
            scorer,
            quality_threshold,
        }
    }

    pub fn quality_threshold(&self) -> f64 {
        self.quality_threshold
    }

    /// Pair killers against victims as of `now`
    pub fn find_pairs(
        &self,
        killers: &[QueueEntry],
        victims: &[QueueEntry],
        now: DateTime<Utc>,
    ) -> Pairing {
        let mut pairing = Pairing::default();
        if killers.is_empty() || victims.is_empty() {
            return pairing;
        }

        let mut ordered: Vec<&QueueEntry> = killers.iter().collect();
        ordered.sort_by_key(|entry| entry.joined_at());

        let mut matched_killers: HashSet<PlayerId> = HashSet::new();
        let mut matched_victims: HashSet<PlayerId> = HashSet::new();

        for killer in ordered {
            if matched_killers.contains(&killer.id()) {
                continue;
            }

            let mut best: Option<(&QueueEntry, f64)> = None;
            for victim in victims {
                if victim.id() == killer.id() || matched_victims.contains(&victim.id()) {
                    continue;
                }

                let quality = match self.scorer.rate_pair(killer, victim, now) {
                    Ok(quality) => quality,
                    Err(e) => {
                        warn!(
                            "Skipping candidate {} -> {}: {}",
                            killer.id(),
                            victim.id(),
                            e
                        );
                        pairing.scoring_failures += 1;
                        continue;
                    }
                };

                if best.map_or(true, |(_, top)| quality > top) {
                    best = Some((victim, quality));
                }
            }

            match best {
                Some((victim, quality)) if quality > 0.0 && quality >= self.quality_threshold => {
                    debug!(
                        "Accepted pair {} -> {} with quality {:.3}",
                        killer.id(),
                        victim.id(),
                        quality
                    );
                    matched_killers.insert(killer.id());
                    matched_victims.insert(victim.id());
                    pairing.pairs.push(CandidatePair {
                        killer: killer.clone(),
                        victim: victim.clone(),
                        quality,
                    });
                }
                Some((victim, quality)) => debug!(
                    "Killer {} stays queued, best victim {} only scored {:.3}",
                    killer.id(),
                    victim.id(),
                    quality
                ),
                None => debug!("Killer {} has no eligible victim", killer.id()),
            }
        }

        pairing
    }
}
