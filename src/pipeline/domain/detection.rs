use serde::{Deserialize, Serialize};

/// Normalized bounding region. Every field is a fraction of the frame extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub cx: f32,
    pub cy: f32,
    pub w: f32,
    pub h: f32,
}

impl Region {
    pub fn new(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self { cx, cy, w, h }
    }

    pub fn area(&self) -> f32 {
        self.w * self.h
    }

    pub fn clamped(self) -> Self {
        Self {
            cx: self.cx.clamp(0.0, 1.0),
            cy: self.cy.clamp(0.0, 1.0),
            w: self.w.clamp(0.0, 1.0),
            h: self.h.clamp(0.0, 1.0),
        }
    }

    /// Mean of the horizontal and vertical deviation from the frame center, in [0, 1].
    pub fn center_offset(&self) -> f32 {
        let dx = (self.cx - 0.5).abs() / 0.5;
        let dy = (self.cy - 0.5).abs() / 0.5;
        ((dx + dy) / 2.0).clamp(0.0, 1.0)
    }
}

/// Affine mapping from model space to display space.
///
/// Applying a transform always yields a new value; detections are never
/// rewritten in place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionTransform {
    pub scale_x: f32,
    pub scale_y: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl RegionTransform {
    pub fn identity() -> Self {
        Self {
            scale_x: 1.0,
            scale_y: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    /// Undo a letterbox: the model saw the display frame scaled into a square
    /// input with padding on the shorter axis.
    pub fn letterbox(display_width: f32, display_height: f32) -> Self {
        if display_width <= 0.0 || display_height <= 0.0 {
            return Self::identity();
        }
        let longest = display_width.max(display_height);
        let content_w = display_width / longest;
        let content_h = display_height / longest;
        Self {
            scale_x: 1.0 / content_w,
            scale_y: 1.0 / content_h,
            offset_x: -(1.0 - content_w) / 2.0 / content_w,
            offset_y: -(1.0 - content_h) / 2.0 / content_h,
        }
    }

    pub fn apply(&self, region: &Region) -> Region {
        Region {
            cx: region.cx * self.scale_x + self.offset_x,
            cy: region.cy * self.scale_y + self.offset_y,
            w: region.w * self.scale_x,
            h: region.h * self.scale_y,
        }
        .clamped()
    }
}

impl Default for RegionTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// One raw classifier output for a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub category: String,
    pub confidence: f32,
    pub region: Region,
}

impl Detection {
    pub fn new(category: impl Into<String>, confidence: f32, region: Region) -> Self {
        Self {
            category: category.into(),
            confidence,
            region,
        }
    }

    pub fn transformed(&self, transform: &RegionTransform) -> Self {
        Self {
            category: self.category.clone(),
            confidence: self.confidence,
            region: transform.apply(&self.region),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedText {
    pub text: String,
    pub region: Region,
}

/// A database entry matched from a recognized text span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextMatch {
    pub name: String,
    pub annotation: Option<String>,
    pub region: Region,
}

/// What the classifier reported for one frame, before any lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Observation {
    Detections(Vec<Detection>),
    Text(Vec<RecognizedText>),
}

impl Default for Observation {
    fn default() -> Self {
        Observation::Detections(Vec::new())
    }
}

/// Input handed to the engine once all asynchronous work for a frame is done.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameInput {
    Detections(Vec<Detection>),
    Matches(Vec<TextMatch>),
    /// Recognized text with no lookup behind it, read out as printed text
    Lines(Vec<RecognizedText>),
}

impl FrameInput {
    pub fn empty() -> Self {
        FrameInput::Detections(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FrameInput::Detections(d) => d.is_empty(),
            FrameInput::Matches(m) => m.is_empty(),
            FrameInput::Lines(l) => l.iter().all(|line| line.text.trim().is_empty()),
        }
    }
}

impl Default for FrameInput {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_offset_is_zero_at_center_and_one_in_corner() {
        assert_eq!(Region::new(0.5, 0.5, 0.1, 0.1).center_offset(), 0.0);
        assert!((Region::new(0.0, 1.0, 0.1, 0.1).center_offset() - 1.0).abs() < 1e-6);
        assert!((Region::new(0.1, 0.5, 0.1, 0.1).center_offset() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn transformed_detection_is_a_new_value() {
        let original = Detection::new("person", 0.9, Region::new(0.5, 0.25, 0.2, 0.2));
        let transform = RegionTransform {
            scale_x: 1.0,
            scale_y: 2.0,
            offset_x: 0.0,
            offset_y: -0.25,
        };
        let rescaled = original.transformed(&transform);

        assert_eq!(original.region, Region::new(0.5, 0.25, 0.2, 0.2));
        assert!((rescaled.region.cy - 0.25).abs() < 1e-6);
        assert!((rescaled.region.h - 0.4).abs() < 1e-6);
        assert_eq!(rescaled.category, "person");
    }

    #[test]
    fn letterbox_maps_padded_square_back_to_display() {
        // 16:9 display, padding above and below the content
        let transform = RegionTransform::letterbox(1600.0, 900.0);
        let top_of_content = Region::new(0.5, (1.0 - 0.5625) / 2.0, 0.0, 0.0);
        let mapped = transform.apply(&top_of_content);
        assert!(mapped.cy.abs() < 1e-5);
        assert!((mapped.cx - 0.5).abs() < 1e-5);
    }

    #[test]
    fn observation_parses_from_json() {
        let json = r#"{"detections":[{"category":"car","confidence":0.8,"region":{"cx":0.5,"cy":0.5,"w":0.2,"h":0.2}}]}"#;
        let observation: Observation = serde_json::from_str(json).unwrap();
        match observation {
            Observation::Detections(d) => assert_eq!(d[0].category, "car"),
            Observation::Text(_) => panic!("expected detections"),
        }
    }

    #[test]
    fn blank_lines_count_as_empty_input() {
        let line = |text: &str| RecognizedText {
            text: text.to_string(),
            region: Region::new(0.5, 0.5, 0.5, 0.1),
        };
        assert!(FrameInput::empty().is_empty());
        assert!(FrameInput::Lines(vec![line("  "), line("")]).is_empty());
        assert!(!FrameInput::Lines(vec![line(""), line("Exit")]).is_empty());
    }
}
