use crate::pipeline::domain::{CandidateKey, Region};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Read-only view of one processed frame, for display paths only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineSnapshot {
    pub frame_id: Option<Uuid>,
    pub sequence: u64,
    pub candidate_regions: Vec<Region>,
    pub spoken: Vec<CandidateKey>,
    pub tracked_keys: usize,
}

/// Display collaborator. Informational only; nothing is read back.
pub trait OverlaySink: Send + Sync {
    fn overlay(&self, rects: &[Region]);
}

/// Remembers the last set of rectangles (for testing and development)
#[derive(Clone, Default)]
pub struct RecordingOverlay {
    last: Arc<Mutex<Vec<Region>>>,
}

impl RecordingOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Vec<Region> {
        self.last.lock().map(|rects| rects.clone()).unwrap_or_default()
    }
}

impl OverlaySink for RecordingOverlay {
    fn overlay(&self, rects: &[Region]) {
        if let Ok(mut last) = self.last.lock() {
            *last = rects.to_vec();
        }
    }
}
