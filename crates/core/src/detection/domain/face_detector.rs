use crate::shared::frame::Frame;

use super::detection::Detection;

/// Domain interface for face detection.
///
/// Implementations may hold mutable inference state, hence `&mut self`.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>>;
}
