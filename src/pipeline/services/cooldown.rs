use crate::pipeline::domain::CandidateKey;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;

/// Last-spoken timestamp per key.
pub struct CooldownRegistry {
    cooldown: TimeDelta,
    last_spoken: HashMap<CandidateKey, DateTime<Utc>>,
}

impl CooldownRegistry {
    pub fn new(cooldown: TimeDelta) -> Self {
        Self {
            cooldown,
            last_spoken: HashMap::new(),
        }
    }

    /// A key with no entry has never been spoken and is not on cooldown.
    pub fn is_on_cooldown(&self, key: &CandidateKey, now: DateTime<Utc>) -> bool {
        self.last_spoken
            .get(key)
            .map(|spoken| now - *spoken < self.cooldown)
            .unwrap_or(false)
    }

    pub fn record_spoken(&mut self, key: &CandidateKey, now: DateTime<Utc>) {
        self.last_spoken.insert(key.clone(), now);
    }

    pub fn last_spoken(&self, key: &CandidateKey) -> Option<DateTime<Utc>> {
        self.last_spoken.get(key).copied()
    }

    pub fn reset(&mut self) {
        self.last_spoken.clear();
    }
}
