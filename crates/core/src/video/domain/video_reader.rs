use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Decoded frame stream of a video source.
///
/// The stream is single-pass: once [`VideoReader::frames`] has been drained
/// the source must be reopened to read it again. Per-frame decode failures
/// are yielded as `Err` items so callers can skip them and keep going.
pub trait VideoReader: Send {
    /// Opens a video file and returns its stream properties.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Returns a lazy iterator over decoded frames in presentation order.
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_>;

    /// Releases decoder resources. Safe to call more than once.
    fn close(&mut self);
}
