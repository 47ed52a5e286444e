use chrono::{TimeDelta, Utc};
use clap::{Parser, ValueEnum};
use detection_narrator::{
    AppError, CoordinatorBuilder, EngineConfig, Frame,
    pipeline::domain::{Detection, Observation, RecognizedText},
    pipeline::services::{InMemoryIngredientLookup, LoggingSpeech, ScriptedClassifier},
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, info};

#[derive(Parser)]
#[command(
    name = "narrator",
    about = "Replay recorded detections through the narration engine"
)]
struct Cli {
    /// Configuration file (TOML, JSON or YAML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Preset the configuration file is layered over
    #[arg(long, value_enum, default_value_t = Preset::Obstacle)]
    preset: Preset,

    /// JSON lines, one observation per frame
    #[arg(long)]
    scenario: PathBuf,

    /// JSON list of `{name, annotation}` entries for text matching
    #[arg(long)]
    ingredients: Option<PathBuf>,

    /// Delay between submitted frames
    #[arg(long, default_value_t = 100)]
    frame_interval_ms: u64,

    /// Log every pipeline step
    #[arg(long, short)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Preset {
    Obstacle,
    Ingredient,
    /// Read printed text aloud
    Reading,
}

/// One line of a scenario file.
#[derive(Deserialize)]
struct ScenarioEntry {
    timestamp_ms: i64,
    #[serde(default)]
    detections: Option<Vec<Detection>>,
    #[serde(default)]
    text: Option<Vec<RecognizedText>>,
}

impl ScenarioEntry {
    fn observation(self) -> Observation {
        match (self.detections, self.text) {
            (_, Some(text)) => Observation::Text(text),
            (Some(detections), None) => Observation::Detections(detections),
            (None, None) => Observation::default(),
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();
}

fn read_scenario(path: &Path) -> Result<Vec<ScenarioEntry>, AppError> {
    let contents = std::fs::read_to_string(path)?;
    let mut entries = Vec::new();
    for line in contents.lines().filter(|line| !line.trim().is_empty()) {
        entries.push(serde_json::from_str(line)?);
    }
    Ok(entries)
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let base = match cli.preset {
        Preset::Obstacle => EngineConfig::obstacle_narration(),
        Preset::Ingredient => EngineConfig::ingredient_scan(),
        Preset::Reading => EngineConfig::text_reading(),
    };
    let configuration = EngineConfig::load_over(&base, cli.config.as_deref())?;

    let entries = read_scenario(&cli.scenario)?;
    let started = Utc::now();
    let mut classifier = ScriptedClassifier::new();
    let mut frames = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        let sequence = index as u64 + 1;
        frames.push(Frame::empty(
            sequence,
            started + TimeDelta::milliseconds(entry.timestamp_ms),
        ));
        classifier = classifier.with_observation(sequence, entry.observation());
    }
    info!("Loaded {} frames from {}", frames.len(), cli.scenario.display());

    let mut builder = CoordinatorBuilder::new(configuration)
        .classifier(Arc::new(classifier))
        .speech(Arc::new(LoggingSpeech));
    if let Some(path) = &cli.ingredients {
        let lookup = InMemoryIngredientLookup::from_json_file(path)?;
        info!("Loaded {} ingredient entries", lookup.len());
        builder = builder.lookup(Arc::new(lookup));
    }
    let coordinator = builder.build()?;

    let interval = Duration::from_millis(cli.frame_interval_ms);
    for frame in frames {
        coordinator.submit(frame);
        tokio::time::sleep(interval).await;
    }

    let stats = coordinator.drain().await;
    info!(
        "Processed {} frames ({} skipped, {} classifier failures), spoke {} times",
        stats.frames_processed, stats.frames_skipped, stats.classifier_failures, stats.utterances
    );
    Ok(())
}
