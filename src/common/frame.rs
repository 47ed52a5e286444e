use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// One camera tick. Pixels are opaque to the engine and only read by the classifier.
#[derive(Clone, Debug)]
pub struct Frame {
    frame_id: Uuid,
    sequence: u64,
    captured_at: DateTime<Utc>,
    pixels: Arc<[u8]>,
    dimensions: (u32, u32),
}

impl Frame {
    pub fn new(sequence: u64, captured_at: DateTime<Utc>, pixels: Vec<u8>, dimensions: (u32, u32)) -> Self {
        Self {
            frame_id: Uuid::new_v4(),
            sequence,
            captured_at,
            pixels: Arc::from(pixels),
            dimensions,
        }
    }

    /// A frame with no pixel payload, for replayed or synthetic input.
    pub fn empty(sequence: u64, captured_at: DateTime<Utc>) -> Self {
        Self::new(sequence, captured_at, Vec::new(), (0, 0))
    }

    pub fn frame_id(&self) -> Uuid {
        self.frame_id
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }
}
