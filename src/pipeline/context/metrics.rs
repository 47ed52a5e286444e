use std::time::Duration;

/// Metrics collected during frame processing
#[derive(Debug, Clone, Default)]
pub struct FrameMetrics {
    aggregation_duration: Option<Duration>,
    arbitration_duration: Option<Duration>,
    composition_duration: Option<Duration>,
    candidate_count: usize,
    winner_count: usize,
}

impl FrameMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_aggregation(&mut self, duration: Duration, candidates: usize) {
        self.aggregation_duration = Some(duration);
        self.candidate_count = candidates;
    }

    pub fn record_arbitration(&mut self, duration: Duration, winners: usize) {
        self.arbitration_duration = Some(duration);
        self.winner_count = winners;
    }

    pub fn record_composition(&mut self, duration: Duration) {
        self.composition_duration = Some(duration);
    }

    pub fn candidate_count(&self) -> usize {
        self.candidate_count
    }

    pub fn winner_count(&self) -> usize {
        self.winner_count
    }

    /// Sum of the recorded stage durations.
    pub fn total(&self) -> Duration {
        [
            self.aggregation_duration,
            self.arbitration_duration,
            self.composition_duration,
        ]
        .into_iter()
        .flatten()
        .sum()
    }
}
