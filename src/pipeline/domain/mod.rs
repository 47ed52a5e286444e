pub mod candidate;
pub mod detection;
pub mod position;

pub use candidate::{Candidate, CandidateKey, CategoryTier, normalize_label};
pub use detection::{
    Detection, FrameInput, Observation, RecognizedText, Region, RegionTransform, TextMatch,
};
pub use position::{Direction, DistanceBand, Elevation, estimated_distance};
