use std::path::Path;

use crate::shared::frame::Frame;

/// Persists a single RGB frame as an image file.
///
/// The encoding is chosen from the path's extension. The parent directory
/// must already exist.
pub trait ImageWriter: Send {
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;
}
