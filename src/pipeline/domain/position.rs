//! Coarse positional vocabulary shared by keying, scoring and phrasing.
//!
//! The distance estimate here is a cheap proxy built from classifier
//! confidence and how far the object sits from the frame center. It is an
//! approximation for monocular input, not a measured depth.
use serde::{Deserialize, Serialize};
use std::fmt;

use super::detection::Region;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    FarLeft,
    Left,
    Ahead,
    Right,
    FarRight,
}

impl Direction {
    pub fn from_x(x: f32) -> Self {
        if x < 0.25 {
            Direction::FarLeft
        } else if x < 0.4 {
            Direction::Left
        } else if x <= 0.6 {
            Direction::Ahead
        } else if x <= 0.75 {
            Direction::Right
        } else {
            Direction::FarRight
        }
    }

    pub fn phrase(&self) -> &'static str {
        match self {
            Direction::FarLeft => "far left",
            Direction::Left => "left",
            Direction::Ahead => "ahead",
            Direction::Right => "right",
            Direction::FarRight => "far right",
        }
    }

    /// Short token used when a direction qualifies a tracking key.
    pub fn zone_token(&self) -> &'static str {
        match self {
            Direction::FarLeft => "far-left",
            Direction::Left => "left",
            Direction::Ahead => "ahead",
            Direction::Right => "right",
            Direction::FarRight => "far-right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.phrase())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Elevation {
    Above,
    Level,
    Below,
}

impl Elevation {
    pub fn from_y(y: f32) -> Self {
        if y < 0.3 {
            Elevation::Above
        } else if y > 0.7 {
            Elevation::Below
        } else {
            Elevation::Level
        }
    }

    pub fn phrase(&self) -> Option<&'static str> {
        match self {
            Elevation::Above => Some("above"),
            Elevation::Level => None,
            Elevation::Below => Some("below"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DistanceBand {
    VeryClose,
    CloseBy,
    Nearby,
    InTheDistance,
}

impl DistanceBand {
    pub fn from_estimate(distance: f32) -> Self {
        if distance < 0.25 {
            DistanceBand::VeryClose
        } else if distance < 0.5 {
            DistanceBand::CloseBy
        } else if distance < 0.75 {
            DistanceBand::Nearby
        } else {
            DistanceBand::InTheDistance
        }
    }

    pub fn phrase(&self) -> &'static str {
        match self {
            DistanceBand::VeryClose => "very close",
            DistanceBand::CloseBy => "close by",
            DistanceBand::Nearby => "nearby",
            DistanceBand::InTheDistance => "in the distance",
        }
    }

    pub fn is_urgent(&self) -> bool {
        matches!(self, DistanceBand::VeryClose | DistanceBand::CloseBy)
    }
}

/// `(1 - confidence) * 0.7 + center_offset * 0.3`, clamped to [0, 1].
pub fn estimated_distance(confidence: f32, region: &Region) -> f32 {
    let confidence = confidence.clamp(0.0, 1.0);
    ((1.0 - confidence) * 0.7 + region.center_offset() * 0.3).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_boundaries_resolve_to_higher_bucket() {
        assert_eq!(Direction::from_x(0.24), Direction::FarLeft);
        assert_eq!(Direction::from_x(0.25), Direction::Left);
        assert_eq!(Direction::from_x(0.4), Direction::Ahead);
        assert_eq!(Direction::from_x(0.6), Direction::Ahead);
        assert_eq!(Direction::from_x(0.61), Direction::Right);
        assert_eq!(Direction::from_x(0.75), Direction::Right);
        assert_eq!(Direction::from_x(0.76), Direction::FarRight);
    }

    #[test]
    fn elevation_only_qualifies_outer_bands() {
        assert_eq!(Elevation::from_y(0.29).phrase(), Some("above"));
        assert_eq!(Elevation::from_y(0.3).phrase(), None);
        assert_eq!(Elevation::from_y(0.7).phrase(), None);
        assert_eq!(Elevation::from_y(0.71).phrase(), Some("below"));
    }

    #[test]
    fn distance_estimate_blends_confidence_and_centrality() {
        let region = Region::new(0.1, 0.5, 0.2, 0.2);
        let distance = estimated_distance(0.5, &region);
        assert!((distance - 0.47).abs() < 1e-5);
        assert_eq!(DistanceBand::from_estimate(distance), DistanceBand::CloseBy);

        let centered = Region::new(0.5, 0.5, 0.2, 0.2);
        assert_eq!(estimated_distance(1.0, &centered), 0.0);
        assert_eq!(DistanceBand::from_estimate(0.75), DistanceBand::InTheDistance);
    }
}
