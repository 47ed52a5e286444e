use serde::{Deserialize, Serialize};
use std::fmt;

use super::detection::Region;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryTier {
    High,
    Medium,
    Low,
}

/// Stable identity used to follow a candidate across frames.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CandidateKey(String);

impl CandidateKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CandidateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CandidateKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Lowercased, trimmed, whitespace-collapsed category label.
pub fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// A detection or text match that survived filtering for the current frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub key: CandidateKey,
    /// Spoken label, as the user should hear it.
    pub label: String,
    pub tier: CategoryTier,
    pub confidence: f32,
    pub region: Region,
    pub annotation: Option<String>,
}

impl Candidate {
    pub fn is_high_priority(&self) -> bool {
        self.tier == CategoryTier::High
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_normalize_case_and_spacing() {
        assert_eq!(normalize_label("  Traffic   Light "), "traffic light");
        assert_eq!(normalize_label("PERSON"), "person");
    }
}
