use crate::config::{ArbitrationMode, EngineConfig};
use crate::pipeline::domain::{Direction, DistanceBand, Elevation};
use crate::pipeline::services::arbiter::ScoredCandidate;
use std::sync::Arc;

/// Phrases winners as a single utterance.
pub struct MessageComposer {
    config: Arc<EngineConfig>,
}

impl MessageComposer {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self { config }
    }

    /// `None` when there is nothing to say this cycle.
    pub fn compose(&self, winners: &[ScoredCandidate]) -> Option<String> {
        match (self.config.arbitration_mode, winners) {
            (_, []) => None,
            (ArbitrationMode::SingleWinner, [winner, ..]) => Some(self.describe(winner)),
            (ArbitrationMode::MultiWinner | ArbitrationMode::TextReading, winners) => {
                Some(self.list(winners))
            }
        }
    }

    /// "[qualifier] label direction [elevation], distance[, urgency]"
    pub fn describe(&self, scored: &ScoredCandidate) -> String {
        let candidate = &scored.candidate;
        let mut text = String::new();

        if let Some(qualifier) = confidence_qualifier(candidate.confidence) {
            text.push_str(qualifier);
            text.push(' ');
        }
        text.push_str(&candidate.label);
        text.push(' ');
        text.push_str(Direction::from_x(candidate.region.cx).phrase());
        if let Some(elevation) = Elevation::from_y(candidate.region.cy).phrase() {
            text.push(' ');
            text.push_str(elevation);
        }

        let band = DistanceBand::from_estimate(scored.estimated_distance);
        text.push_str(", ");
        text.push_str(band.phrase());

        if candidate.is_high_priority() && band.is_urgent() && !self.config.phrases.urgency_suffix.is_empty() {
            text.push_str(", ");
            text.push_str(&self.config.phrases.urgency_suffix);
        }

        if let Some(annotation) = &candidate.annotation {
            text.push_str(&self.config.phrases.annotation_separator);
            text.push_str(annotation);
        }

        text
    }

    /// Every winner's label and annotation, in aggregator order.
    pub fn list(&self, winners: &[ScoredCandidate]) -> String {
        let phrases = &self.config.phrases;
        let items: Vec<String> = winners
            .iter()
            .map(|scored| match &scored.candidate.annotation {
                Some(annotation) => format!(
                    "{}{}{}",
                    scored.candidate.label, phrases.annotation_separator, annotation
                ),
                None => scored.candidate.label.clone(),
            })
            .collect();

        let body = items.join(&phrases.item_separator);
        if phrases.multi_lead_in.is_empty() {
            body
        } else {
            format!("{} {}", phrases.multi_lead_in, body)
        }
    }
}

fn confidence_qualifier(confidence: f32) -> Option<&'static str> {
    if confidence > 0.75 {
        Some("Clear")
    } else if confidence < 0.5 {
        Some("Possible")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::domain::{Candidate, CandidateKey, CategoryTier, Region, estimated_distance};

    fn scored(label: &str, tier: CategoryTier, confidence: f32, region: Region) -> ScoredCandidate {
        ScoredCandidate {
            candidate: Candidate {
                key: CandidateKey::from(label),
                label: label.to_string(),
                tier,
                confidence,
                region,
                annotation: None,
            },
            score: 0,
            estimated_distance: estimated_distance(confidence, &region),
        }
    }

    fn composer(mode: ArbitrationMode) -> MessageComposer {
        MessageComposer::new(Arc::new(EngineConfig::default().with_arbitration_mode(mode)))
    }

    #[test]
    fn nothing_to_say_without_winners() {
        assert_eq!(composer(ArbitrationMode::SingleWinner).compose(&[]), None);
        assert_eq!(composer(ArbitrationMode::MultiWinner).compose(&[]), None);
    }

    #[test]
    fn high_tier_close_object_gets_urgency() {
        let text = composer(ArbitrationMode::SingleWinner)
            .describe(&scored("person", CategoryTier::High, 0.5, Region::new(0.1, 0.5, 0.2, 0.2)));
        assert_eq!(text, "person far left, close by, watch out");
    }

    #[test]
    fn qualifiers_and_elevation() {
        let composer = composer(ArbitrationMode::SingleWinner);
        let clear = composer.describe(&scored("chair", CategoryTier::Medium, 0.9, Region::new(0.5, 0.8, 0.2, 0.2)));
        assert_eq!(clear, "Clear chair ahead below, very close");

        let possible = composer.describe(&scored("bottle", CategoryTier::Low, 0.4, Region::new(0.7, 0.2, 0.1, 0.1)));
        assert!(possible.starts_with("Possible bottle right above"));
        assert!(!possible.contains("watch out"));
    }

    #[test]
    fn distant_high_tier_has_no_urgency() {
        let text = composer(ArbitrationMode::SingleWinner)
            .describe(&scored("car", CategoryTier::High, 0.0, Region::new(0.95, 0.95, 0.1, 0.1)));
        assert_eq!(text, "Possible car far right below, in the distance");
    }

    #[test]
    fn multi_winner_lists_items_in_order_with_annotations() {
        let mut sugar = scored("Sugar", CategoryTier::Medium, 1.0, Region::new(0.5, 0.5, 0.2, 0.1));
        sugar.candidate.annotation = Some("raises blood glucose".to_string());
        let mut alcohol = scored("Alcohol", CategoryTier::Medium, 1.0, Region::new(0.5, 0.5, 0.2, 0.1));
        alcohol.candidate.annotation = Some("avoid when driving".to_string());
        let salt = scored("Salt", CategoryTier::Medium, 1.0, Region::new(0.5, 0.5, 0.2, 0.1));

        let text = composer(ArbitrationMode::MultiWinner).compose(&[sugar, alcohol, salt]);
        assert_eq!(
            text.as_deref(),
            Some("Found Sugar: raises blood glucose; Alcohol: avoid when driving; Salt")
        );
    }
}
