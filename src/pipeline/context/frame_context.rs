use crate::common::frame::Frame;
use crate::pipeline::context::metrics::FrameMetrics;
use crate::pipeline::context::state::{
    AggregatedState, ArbitratedState, ComposedState, IngestedState, ProcessingState,
};
use crate::pipeline::domain::{Candidate, FrameInput};
use crate::pipeline::services::arbiter::ScoredCandidate;
use crate::pipeline::services::speech::Utterance;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};

// FrameContext with compile-time state tracking
pub struct FrameContext<S> {
    frame: Arc<Frame>,
    metrics: FrameMetrics,
    processing_start: Instant,
    stage_start: Instant,
    state: S,
}

impl<S: ProcessingState> FrameContext<S> {
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.frame.captured_at()
    }

    pub fn metrics(&self) -> &FrameMetrics {
        &self.metrics
    }

    pub fn elapsed(&self) -> Duration {
        self.processing_start.elapsed()
    }

    pub fn state_name(&self) -> &'static str {
        S::state_name()
    }

    fn advance<T>(self, metrics: FrameMetrics, state: T) -> FrameContext<T> {
        FrameContext {
            frame: self.frame,
            metrics,
            processing_start: self.processing_start,
            stage_start: Instant::now(),
            state,
        }
    }
}

impl FrameContext<IngestedState> {
    pub fn new(frame: Frame, input: FrameInput) -> Self {
        let now = Instant::now();
        Self {
            frame: Arc::new(frame),
            metrics: FrameMetrics::new(),
            processing_start: now,
            stage_start: now,
            state: IngestedState { input },
        }
    }

    pub fn input(&self) -> &FrameInput {
        &self.state.input
    }

    pub fn into_aggregated(self, candidates: Vec<Candidate>) -> FrameContext<AggregatedState> {
        let mut metrics = self.metrics.clone();
        metrics.record_aggregation(self.stage_start.elapsed(), candidates.len());
        self.advance(metrics, AggregatedState { candidates })
    }
}

impl FrameContext<AggregatedState> {
    pub fn candidates(&self) -> &[Candidate] {
        &self.state.candidates
    }

    pub fn into_arbitrated(self, winners: Vec<ScoredCandidate>) -> FrameContext<ArbitratedState> {
        let mut metrics = self.metrics.clone();
        metrics.record_arbitration(self.stage_start.elapsed(), winners.len());
        let candidates = self.state.candidates;
        FrameContext {
            frame: self.frame,
            metrics,
            processing_start: self.processing_start,
            stage_start: Instant::now(),
            state: ArbitratedState {
                candidates,
                winners,
            },
        }
    }
}

impl FrameContext<ArbitratedState> {
    pub fn winners(&self) -> &[ScoredCandidate] {
        &self.state.winners
    }

    pub fn into_composed(self, utterance: Option<Utterance>) -> FrameContext<ComposedState> {
        let mut metrics = self.metrics.clone();
        metrics.record_composition(self.stage_start.elapsed());
        let ArbitratedState {
            candidates,
            winners,
        } = self.state;
        FrameContext {
            frame: self.frame,
            metrics,
            processing_start: self.processing_start,
            stage_start: Instant::now(),
            state: ComposedState {
                candidates,
                winners,
                utterance,
            },
        }
    }
}

impl FrameContext<ComposedState> {
    pub fn candidates(&self) -> &[Candidate] {
        &self.state.candidates
    }

    pub fn winners(&self) -> &[ScoredCandidate] {
        &self.state.winners
    }

    pub fn utterance(&self) -> Option<&Utterance> {
        self.state.utterance.as_ref()
    }

    pub fn into_utterance(self) -> Option<Utterance> {
        self.state.utterance
    }
}
