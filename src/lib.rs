pub mod common;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod pipeline;

pub use common::Frame;
pub use config::{ArbitrationMode, EngineConfig, KeyStrategy};
pub use coordinator::{Coordinator, CoordinatorBuilder, CoordinatorStats};
pub use error::{AppError, ConfigError, SpeechError};
pub use pipeline::ArbitrationEngine;
