use crate::config::{ArbitrationMode, EngineConfig};
use crate::pipeline::domain::{Candidate, CandidateKey, estimated_distance};
use crate::pipeline::services::confirmation::ConfirmationTracker;
use crate::pipeline::services::cooldown::CooldownRegistry;
use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use std::sync::Arc;
use tracing::debug;

/// A candidate with its per-cycle priority. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub score: u32,
    pub estimated_distance: f32,
}

/// Guards against narrating the same static scene over and over.
///
/// Independent from the confirmation counter.
#[derive(Debug, Default)]
pub struct RepeatWinnerGuard {
    last_winner: Option<CandidateKey>,
    same_winner_count: u32,
}

impl RepeatWinnerGuard {
    /// Decide whether `key` may win this cycle. Must be followed by `commit` when it does.
    ///
    /// Every cycle the previous winner comes out on top counts towards the
    /// threshold, including the cycle it first won.
    fn permits(&mut self, key: &CandidateKey, threshold: u32) -> bool {
        if self.last_winner.as_ref() != Some(key) {
            return true;
        }
        self.same_winner_count = self.same_winner_count.saturating_add(1);
        self.same_winner_count >= threshold
    }

    /// Only a different key restarts the count.
    fn commit(&mut self, key: &CandidateKey) {
        if self.last_winner.as_ref() != Some(key) {
            self.last_winner = Some(key.clone());
            self.same_winner_count = 1;
        }
    }

    pub fn last_winner(&self) -> Option<&CandidateKey> {
        self.last_winner.as_ref()
    }

    pub fn reset(&mut self) {
        self.last_winner = None;
        self.same_winner_count = 0;
    }
}

/// Picks this cycle's winners among confirmed, off-cooldown candidates.
pub struct PriorityArbiter {
    config: Arc<EngineConfig>,
    repeat_guard: RepeatWinnerGuard,
}

impl PriorityArbiter {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self {
            config,
            repeat_guard: RepeatWinnerGuard::default(),
        }
    }

    pub fn score(&self, candidate: &Candidate) -> ScoredCandidate {
        let distance = estimated_distance(candidate.confidence, &candidate.region);
        let tier = self.config.tier_weight(candidate.tier);
        let confidence = (candidate.confidence * self.config.confidence_weight as f32).round() as u32;
        let proximity = ((1.0 - distance) * self.config.proximity_weight as f32).round() as u32;

        ScoredCandidate {
            candidate: candidate.clone(),
            score: tier.saturating_add(confidence).saturating_add(proximity),
            estimated_distance: distance,
        }
    }

    /// Selects winners and, before returning, marks each one spoken and
    /// clears its confirmation so it cannot win again until it both
    /// re-accumulates and clears cooldown.
    pub fn arbitrate(
        &mut self,
        candidates: &[Candidate],
        confirmations: &mut ConfirmationTracker,
        cooldowns: &mut CooldownRegistry,
        now: DateTime<Utc>,
    ) -> Vec<ScoredCandidate> {
        let eligible: Vec<ScoredCandidate> = candidates
            .iter()
            .filter(|candidate| {
                if !confirmations.is_eligible(&candidate.key) {
                    return false;
                }
                if cooldowns.is_on_cooldown(&candidate.key, now) {
                    debug!("Suppressing {}: on cooldown", candidate.key);
                    return false;
                }
                true
            })
            .map(|candidate| self.score(candidate))
            .collect();

        let winners = match self.config.arbitration_mode {
            ArbitrationMode::SingleWinner => self.select_single(eligible),
            ArbitrationMode::MultiWinner | ArbitrationMode::TextReading => {
                Self::select_all(eligible)
            }
        };

        for winner in &winners {
            cooldowns.record_spoken(&winner.candidate.key, now);
            confirmations.mark_triggered(&winner.candidate.key);
        }

        winners
    }

    fn select_single(&mut self, eligible: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
        // Strictly greater, so ties keep the first candidate in aggregator order
        let mut best: Option<ScoredCandidate> = None;
        for scored in eligible {
            match &best {
                Some(current) if scored.score <= current.score => {}
                _ => best = Some(scored),
            }
        }

        let Some(best) = best else {
            return Vec::new();
        };

        if !self
            .repeat_guard
            .permits(&best.candidate.key, self.config.repeat_winner_threshold)
        {
            debug!(
                "Suppressing {}: same winner as previous cycle",
                best.candidate.key
            );
            return Vec::new();
        }

        self.repeat_guard.commit(&best.candidate.key);
        vec![best]
    }

    fn select_all(eligible: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
        let mut seen = IndexSet::new();
        eligible
            .into_iter()
            .filter(|scored| seen.insert(scored.candidate.key.clone()))
            .collect()
    }

    pub fn last_winner(&self) -> Option<&CandidateKey> {
        self.repeat_guard.last_winner()
    }

    pub fn reset(&mut self) {
        self.repeat_guard.reset();
    }
}
