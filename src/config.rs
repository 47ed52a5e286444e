use crate::error::ConfigError;
use crate::pipeline::domain::{CategoryTier, normalize_label};
use crate::pipeline::services::speech::EnqueueMode;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Prefix for environment overrides, e.g. `NARRATOR__COOLDOWN_MS=1500`.
pub const ENV_PREFIX: &str = "NARRATOR";

/// Every tunable constant of the arbitration engine. Set once at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub confidence_threshold: f32,
    pub required_consecutive_frames: u32,
    pub cooldown_ms: u64,
    pub repeat_winner_threshold: u32,
    /// Minimum `w * h` of a detection, as a fraction of the frame.
    pub min_relative_area: Option<f32>,
    /// Side of the centred square crop that detection centers must fall inside.
    pub region_of_interest: Option<f32>,
    pub high_priority_categories: Vec<String>,
    pub medium_priority_categories: Vec<String>,
    pub low_priority_categories: Vec<String>,
    pub tier_weights: TierWeights,
    pub confidence_weight: u32,
    pub proximity_weight: u32,
    pub arbitration_mode: ArbitrationMode,
    pub enqueue_mode: EnqueueMode,
    pub key_strategy: KeyStrategy,
    pub phrases: PhraseTemplates,
    pub reading: ReadingConfig,
    pub classifier_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArbitrationMode {
    /// Obstacle and hazard narration, at most one utterance per cycle
    SingleWinner,
    /// Ingredient and text matching, every eligible candidate reported together
    MultiWinner,
    /// Printed-text narration, the whole recognized text read out when it changes
    TextReading,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStrategy {
    Category,
    CategoryAndZone,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierWeights {
    pub high: u32,
    pub medium: u32,
    pub low: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhraseTemplates {
    pub urgency_suffix: String,
    pub item_separator: String,
    pub annotation_separator: String,
    pub multi_lead_in: String,
}

/// Limits for reading printed text aloud.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadingConfig {
    /// Shorter readings are treated as noise
    pub min_chars: usize,
    /// Longer readings are cut and end with "..."
    pub max_chars: usize,
    /// Fraction of matching positions at which a reading counts as the previous one again
    pub similarity_threshold: f32,
}

impl Default for ReadingConfig {
    fn default() -> Self {
        Self {
            min_chars: 10,
            max_chars: 600,
            similarity_threshold: 0.7,
        }
    }
}

impl Default for TierWeights {
    fn default() -> Self {
        Self {
            high: 50,
            medium: 30,
            low: 10,
        }
    }
}

impl Default for PhraseTemplates {
    fn default() -> Self {
        Self {
            urgency_suffix: "watch out".to_string(),
            item_separator: "; ".to_string(),
            annotation_separator: ": ".to_string(),
            multi_lead_in: "Found".to_string(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::obstacle_narration()
    }
}

fn labels(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl EngineConfig {
    /// Configuration for live obstacle and hazard narration
    pub fn obstacle_narration() -> Self {
        Self {
            confidence_threshold: 0.35,
            required_consecutive_frames: 3,
            cooldown_ms: 2000,
            repeat_winner_threshold: 3,
            min_relative_area: Some(0.01),
            region_of_interest: Some(0.8),
            high_priority_categories: labels(&[
                "person", "car", "bicycle", "motorcycle", "bus", "truck", "stairs", "dog",
            ]),
            medium_priority_categories: labels(&[
                "chair",
                "bench",
                "door",
                "pole",
                "traffic light",
                "stop sign",
                "fire hydrant",
            ]),
            low_priority_categories: labels(&[
                "bottle",
                "cup",
                "potted plant",
                "backpack",
                "handbag",
                "umbrella",
            ]),
            tier_weights: TierWeights::default(),
            confidence_weight: 30,
            proximity_weight: 20,
            arbitration_mode: ArbitrationMode::SingleWinner,
            enqueue_mode: EnqueueMode::Interrupt,
            key_strategy: KeyStrategy::Category,
            phrases: PhraseTemplates::default(),
            reading: ReadingConfig::default(),
            classifier_timeout_ms: Some(500),
        }
    }

    /// Configuration for scanning ingredient labels against the lookup database
    pub fn ingredient_scan() -> Self {
        Self {
            confidence_threshold: 0.0,
            required_consecutive_frames: 3,
            cooldown_ms: 10_000,
            repeat_winner_threshold: 1,
            min_relative_area: Some(0.002),
            region_of_interest: Some(0.5),
            high_priority_categories: Vec::new(),
            medium_priority_categories: Vec::new(),
            low_priority_categories: Vec::new(),
            arbitration_mode: ArbitrationMode::MultiWinner,
            enqueue_mode: EnqueueMode::Append,
            classifier_timeout_ms: Some(1500),
            ..Self::obstacle_narration()
        }
    }

    /// Configuration for reading printed text aloud
    pub fn text_reading() -> Self {
        Self {
            required_consecutive_frames: 1,
            cooldown_ms: 4000,
            repeat_winner_threshold: 1,
            min_relative_area: None,
            region_of_interest: None,
            high_priority_categories: Vec::new(),
            medium_priority_categories: Vec::new(),
            low_priority_categories: Vec::new(),
            arbitration_mode: ArbitrationMode::TextReading,
            enqueue_mode: EnqueueMode::Append,
            classifier_timeout_ms: Some(1500),
            ..Self::obstacle_narration()
        }
    }

    /// Load from an optional file, layered under `NARRATOR__*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_over(&Self::default(), path)
    }

    /// Same as `load`, with `base` supplying every value the file and environment leave out.
    pub fn load_over(base: &EngineConfig, path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_layers(base, path, environment())
    }

    fn load_layers(
        base: &EngineConfig,
        path: Option<&Path>,
        environment: config::Environment,
    ) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder().add_source(config::Config::try_from(base)?);
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let configuration: EngineConfig = builder
            .add_source(environment)
            .build()?
            .try_deserialize()?;
        configuration.validate()?;
        Ok(configuration)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(invalid("Confidence threshold must be between 0.0 and 1.0"));
        }

        if self.required_consecutive_frames == 0 {
            return Err(invalid("Required consecutive frames must be at least 1"));
        }

        if self.cooldown_ms == 0 {
            return Err(invalid("Cooldown must be greater than 0"));
        }

        if self.repeat_winner_threshold == 0 {
            return Err(invalid("Repeat winner threshold must be at least 1"));
        }

        if let Some(roi) = self.region_of_interest {
            if !(roi > 0.0 && roi <= 1.0) {
                return Err(invalid("Region of interest must be in (0.0, 1.0]"));
            }
        }

        if let Some(area) = self.min_relative_area {
            if !(0.0..=1.0).contains(&area) {
                return Err(invalid("Minimum relative area must be between 0.0 and 1.0"));
            }
        }

        if self.reading.max_chars == 0 {
            return Err(invalid("Reading limit must be at least 1 character"));
        }

        if !(0.0..=1.0).contains(&self.reading.similarity_threshold) {
            return Err(invalid("Reading similarity threshold must be between 0.0 and 1.0"));
        }

        if self.classifier_timeout_ms == Some(0) {
            return Err(invalid("Classifier timeout must be greater than 0"));
        }

        if self.arbitration_mode == ArbitrationMode::SingleWinner && self.tiers().next().is_none() {
            return Err(invalid("At least one category must be configured"));
        }

        let mut seen = HashSet::new();
        for (label, _) in self.tiers() {
            if !seen.insert(label.clone()) {
                return Err(ConfigError::Invalid(format!(
                    "Category '{label}' is assigned to more than one tier"
                )));
            }
        }

        Ok(())
    }

    fn tiers(&self) -> impl Iterator<Item = (String, CategoryTier)> + '_ {
        let high = self
            .high_priority_categories
            .iter()
            .map(|c| (normalize_label(c), CategoryTier::High));
        let medium = self
            .medium_priority_categories
            .iter()
            .map(|c| (normalize_label(c), CategoryTier::Medium));
        let low = self
            .low_priority_categories
            .iter()
            .map(|c| (normalize_label(c), CategoryTier::Low));
        high.chain(medium).chain(low)
    }

    /// Tier of an already normalized label; `None` means outside the importance set.
    pub fn tier_of(&self, label: &str) -> Option<CategoryTier> {
        self.tiers()
            .find(|(category, _)| category == label)
            .map(|(_, tier)| tier)
    }

    pub fn tier_weight(&self, tier: CategoryTier) -> u32 {
        match tier {
            CategoryTier::High => self.tier_weights.high,
            CategoryTier::Medium => self.tier_weights.medium,
            CategoryTier::Low => self.tier_weights.low,
        }
    }

    pub fn cooldown(&self) -> chrono::TimeDelta {
        chrono::TimeDelta::milliseconds(i64::try_from(self.cooldown_ms).unwrap_or(i64::MAX))
    }

    pub fn classifier_timeout(&self) -> Option<Duration> {
        self.classifier_timeout_ms.map(Duration::from_millis)
    }

    pub fn with_arbitration_mode(mut self, mode: ArbitrationMode) -> Self {
        self.arbitration_mode = mode;
        self
    }

    pub fn with_required_frames(mut self, frames: u32) -> Self {
        self.required_consecutive_frames = frames;
        self
    }

    pub fn with_cooldown_ms(mut self, cooldown_ms: u64) -> Self {
        self.cooldown_ms = cooldown_ms;
        self
    }

    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn with_repeat_winner_threshold(mut self, threshold: u32) -> Self {
        self.repeat_winner_threshold = threshold;
        self
    }

    pub fn with_region_of_interest(mut self, roi: Option<f32>, min_area: Option<f32>) -> Self {
        self.region_of_interest = roi;
        self.min_relative_area = min_area;
        self
    }

    pub fn with_key_strategy(mut self, strategy: KeyStrategy) -> Self {
        self.key_strategy = strategy;
        self
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid(message.to_string())
}
