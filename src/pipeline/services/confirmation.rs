use crate::pipeline::domain::CandidateKey;
use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationState {
    pub consecutive_frames: u32,
    pub last_seen: DateTime<Utc>,
}

/// Counts how many consecutive frames each key has been present.
///
/// Entries are created on first sight and never removed except by `reset`.
/// Eligibility is derived from the counter on demand and never stored.
pub struct ConfirmationTracker {
    required_frames: u32,
    states: IndexMap<CandidateKey, ConfirmationState>,
}

impl ConfirmationTracker {
    pub fn new(required_frames: u32) -> Self {
        Self {
            required_frames: required_frames.max(1),
            states: IndexMap::new(),
        }
    }

    /// Advance one frame. Present keys gain exactly one, absent keys drop to zero.
    pub fn observe<'a, I>(&mut self, present: I, now: DateTime<Utc>)
    where
        I: IntoIterator<Item = &'a CandidateKey>,
    {
        let present: IndexSet<&CandidateKey> = present.into_iter().collect();

        for (key, state) in self.states.iter_mut() {
            if !present.contains(key) {
                state.consecutive_frames = 0;
            }
        }

        for key in present {
            self.states
                .entry(key.clone())
                .and_modify(|state| {
                    state.consecutive_frames = state.consecutive_frames.saturating_add(1);
                    state.last_seen = now;
                })
                .or_insert(ConfirmationState {
                    consecutive_frames: 1,
                    last_seen: now,
                });
        }
    }

    pub fn is_eligible(&self, key: &CandidateKey) -> bool {
        self.consecutive_frames(key) >= self.required_frames
    }

    pub fn consecutive_frames(&self, key: &CandidateKey) -> u32 {
        self.states
            .get(key)
            .map(|state| state.consecutive_frames)
            .unwrap_or(0)
    }

    pub fn state(&self, key: &CandidateKey) -> Option<&ConfirmationState> {
        self.states.get(key)
    }

    /// Called when a key is spoken; it must re-accumulate before alerting again.
    pub fn mark_triggered(&mut self, key: &CandidateKey) {
        if let Some(state) = self.states.get_mut(key) {
            state.consecutive_frames = 0;
        }
    }

    pub fn tracked_keys(&self) -> usize {
        self.states.len()
    }

    pub fn reset(&mut self) {
        self.states.clear();
    }
}
