pub mod context;
pub mod domain;
pub mod engine;
pub mod services;

pub use context::{ComposedState, FrameContext, IngestedState};
pub use domain::{Candidate, CandidateKey, Detection, FrameInput, Observation, Region};
pub use engine::ArbitrationEngine;
