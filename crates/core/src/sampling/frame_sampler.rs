use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;

#[derive(Error, Debug)]
pub enum SamplerError {
    #[error("cannot open video source {path}: {reason}")]
    SourceUnavailable { path: PathBuf, reason: String },
}

/// Thins a decoded frame stream to every Nth frame and normalizes each
/// emitted frame to landscape RGB.
///
/// Frames are counted from 1; a frame is emitted when its position is
/// divisible by `frame_skip`. Undecodable frames and frames whose channel
/// layout can't be coerced still count towards the position but are
/// dropped.
pub struct FrameSampler {
    reader: Box<dyn VideoReader>,
    frame_skip: usize,
    auto_rotate_portrait: bool,
}

impl FrameSampler {
    pub fn new(reader: Box<dyn VideoReader>, frame_skip: usize, auto_rotate_portrait: bool) -> Self {
        Self {
            reader,
            frame_skip: frame_skip.max(1),
            auto_rotate_portrait,
        }
    }

    pub fn frame_skip(&self) -> usize {
        self.frame_skip
    }

    /// Opens `path` for sampling.
    pub fn open(&mut self, path: &Path) -> Result<VideoMetadata, SamplerError> {
        self.reader
            .open(path)
            .map_err(|e| SamplerError::SourceUnavailable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    /// Lazily yields the sampled frames of the opened source.
    ///
    /// The sequence is single-pass; reopen the source to sample it again.
    pub fn samples(&mut self) -> impl Iterator<Item = Frame> + '_ {
        let skip = self.frame_skip;
        let auto_rotate = self.auto_rotate_portrait;
        self.reader
            .frames()
            .enumerate()
            .filter(move |(i, _)| (i + 1) % skip == 0)
            .filter_map(move |(i, decoded)| {
                let frame = match decoded {
                    Ok(frame) => frame,
                    Err(e) => {
                        log::debug!("Skipping frame {}: decode error: {e}", i + 1);
                        return None;
                    }
                };
                normalize(&frame, auto_rotate).or_else(|| {
                    log::debug!(
                        "Skipping frame {}: cannot coerce {} channels to RGB",
                        i + 1,
                        frame.channels()
                    );
                    None
                })
            })
    }

    pub fn close(&mut self) {
        self.reader.close();
    }
}

/// Coerces to RGB and, if enabled, turns portrait frames clockwise.
fn normalize(frame: &Frame, auto_rotate: bool) -> Option<Frame> {
    let rgb = frame.to_rgb()?;
    if auto_rotate && rgb.is_portrait() {
        rgb.rotate_cw()
    } else {
        Some(rgb)
    }
}
