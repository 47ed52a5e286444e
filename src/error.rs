use thiserror::Error;
use uuid::Uuid;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Config(#[from] ConfigError),
    #[error("Classifier Error: {0}")]
    Classifier(String),
    #[error("Lookup Error: {0}")]
    Lookup(String),
    #[error("Speech Error: {0}")]
    Speech(#[from] SpeechError),
    #[error("Pipeline Error: {0}")]
    Pipeline(String),
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Scenario Error: {0}")]
    Scenario(#[from] serde_json::Error),
}

// Configuration Error Type, always fatal at construction time
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("Speech queue is full, dropped utterance for frame {0}")]
    QueueFull(Uuid),
    #[error("Speech channel is closed")]
    Closed,
}
