use std::path::Path;

use crate::shared::frame::Frame;

/// Loads a still image (face crop or gallery reference) as an RGB frame.
pub trait ImageReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<Frame, Box<dyn std::error::Error>>;
}
