use crate::pipeline::domain::{Candidate, FrameInput};
use crate::pipeline::services::arbiter::ScoredCandidate;
use crate::pipeline::services::speech::Utterance;

// Markers to track the state of the frame processing pipeline
pub struct IngestedState {
    pub(super) input: FrameInput,
}

pub struct AggregatedState {
    pub(super) candidates: Vec<Candidate>,
}

pub struct ArbitratedState {
    pub(super) candidates: Vec<Candidate>,
    pub(super) winners: Vec<ScoredCandidate>,
}

pub struct ComposedState {
    pub(super) candidates: Vec<Candidate>,
    pub(super) winners: Vec<ScoredCandidate>,
    pub(super) utterance: Option<Utterance>,
}

pub trait ProcessingState: 'static {
    fn state_name() -> &'static str;
}

impl ProcessingState for IngestedState {
    fn state_name() -> &'static str {
        "Ingested"
    }
}

impl ProcessingState for AggregatedState {
    fn state_name() -> &'static str {
        "Aggregated"
    }
}

impl ProcessingState for ArbitratedState {
    fn state_name() -> &'static str {
        "Arbitrated"
    }
}

impl ProcessingState for ComposedState {
    fn state_name() -> &'static str {
        "Composed"
    }
}
