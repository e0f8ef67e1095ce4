use std::fmt;

use serde::Serialize;

use crate::shared::frame::Frame;

/// Orientation applied to a face image before encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    Upright,
    Clockwise90,
    Half,
    CounterClockwise90,
}

impl Rotation {
    /// Retry order: as captured, then a quarter turn each way with the
    /// half turn in between.
    pub const ALL: [Rotation; 4] = [
        Rotation::Upright,
        Rotation::Clockwise90,
        Rotation::Half,
        Rotation::CounterClockwise90,
    ];

    /// Returns `None` when a non-RGB frame needs turning.
    pub fn apply(&self, frame: &Frame) -> Option<Frame> {
        match self {
            Rotation::Upright => Some(frame.clone()),
            Rotation::Clockwise90 => frame.rotate_cw(),
            Rotation::Half => frame.rotate_180(),
            Rotation::CounterClockwise90 => frame.rotate_ccw(),
        }
    }

    /// Clockwise rotation in degrees.
    pub fn degrees(&self) -> u16 {
        match self {
            Rotation::Upright => 0,
            Rotation::Clockwise90 => 90,
            Rotation::Half => 180,
            Rotation::CounterClockwise90 => 270,
        }
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}
