use crate::config::{EngineConfig, KeyStrategy};
use crate::pipeline::domain::{
    Candidate, CandidateKey, CategoryTier, Detection, Direction, FrameInput, Region, TextMatch,
    normalize_label,
};
use std::sync::Arc;
use tracing::debug;

/// Turns one frame's raw input into the ordered candidate set.
///
/// Pure function of the frame and the configuration; holds no state.
pub struct FrameAggregator {
    config: Arc<EngineConfig>,
}

impl FrameAggregator {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self { config }
    }

    /// Candidates keep the order of the raw input.
    pub fn aggregate(&self, input: &FrameInput) -> Vec<Candidate> {
        match input {
            FrameInput::Detections(detections) => detections
                .iter()
                .filter_map(|detection| self.from_detection(detection))
                .collect(),
            FrameInput::Matches(matches) => matches
                .iter()
                .filter_map(|text_match| self.from_match(text_match))
                .collect(),
            // Read as a whole, never tracked per key
            FrameInput::Lines(_) => Vec::new(),
        }
    }

    fn from_detection(&self, detection: &Detection) -> Option<Candidate> {
        // NaN confidence fails this comparison and is dropped
        if !(detection.confidence >= self.config.confidence_threshold) {
            debug!(
                "Dropping {} below confidence threshold ({:.2})",
                detection.category, detection.confidence
            );
            return None;
        }

        let label = normalize_label(&detection.category);
        let tier = self.config.tier_of(&label)?;

        if !self.passes_region_filters(&label, &detection.region) {
            return None;
        }

        Some(Candidate {
            key: self.key_for(&label, &detection.region),
            label,
            tier,
            confidence: detection.confidence.clamp(0.0, 1.0),
            region: detection.region,
            annotation: None,
        })
    }

    /// The lookup already decided relevance, so matches skip the category filter.
    fn from_match(&self, text_match: &TextMatch) -> Option<Candidate> {
        let key = normalize_label(&text_match.name);
        if key.is_empty() || !self.passes_region_filters(&key, &text_match.region) {
            return None;
        }
        let tier = self.config.tier_of(&key).unwrap_or(CategoryTier::Medium);

        Some(Candidate {
            key: CandidateKey::new(key),
            label: text_match.name.trim().to_string(),
            tier,
            confidence: 1.0,
            region: text_match.region,
            annotation: text_match
                .annotation
                .as_ref()
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty()),
        })
    }

    fn key_for(&self, label: &str, region: &Region) -> CandidateKey {
        match self.config.key_strategy {
            KeyStrategy::Category => CandidateKey::new(label),
            KeyStrategy::CategoryAndZone => CandidateKey::new(format!(
                "{}@{}",
                label,
                Direction::from_x(region.cx).zone_token()
            )),
        }
    }

    /// Region of interest and minimum area, each applied when configured.
    fn passes_region_filters(&self, label: &str, region: &Region) -> bool {
        if !self.in_region_of_interest(region) {
            debug!("Dropping {} outside region of interest", label);
            return false;
        }

        if let Some(min_area) = self.config.min_relative_area {
            if region.area() < min_area {
                debug!("Dropping {} below minimum area", label);
                return false;
            }
        }

        true
    }

    fn in_region_of_interest(&self, region: &Region) -> bool {
        match self.config.region_of_interest {
            Some(fraction) => {
                let min = (1.0 - fraction) / 2.0;
                let max = 1.0 - min;
                (min..=max).contains(&region.cx) && (min..=max).contains(&region.cy)
            }
            None => true,
        }
    }
}
