use thiserror::Error;

use crate::shared::frame::Frame;

use super::embedding::Embedding;
use super::face_encoder::FaceEncoder;
use super::rotation::Rotation;

#[derive(Error, Debug, PartialEq)]
pub enum EncodeError {
    #[error("no face found in any orientation")]
    NoFaceFound,
}

/// Wraps a [`FaceEncoder`] and retries sideways or upside-down images.
///
/// Orientations are tried in [`Rotation::ALL`] order and the first one the
/// inner encoder produces an embedding for wins. Encoder errors are treated
/// the same as "no face".
pub struct RotatingEncoder {
    inner: Box<dyn FaceEncoder>,
}

impl RotatingEncoder {
    pub fn new(inner: Box<dyn FaceEncoder>) -> Self {
        Self { inner }
    }

    /// Returns the embedding and the rotation that produced it.
    pub fn encode(&mut self, face: &Frame) -> Result<(Embedding, Rotation), EncodeError> {
        for rotation in Rotation::ALL {
            let Some(rotated) = rotation.apply(face) else {
                log::debug!("Cannot turn a {}-channel face to {rotation}", face.channels());
                continue;
            };
            match self.inner.encode(&rotated) {
                Ok(Some(embedding)) => {
                    log::debug!("Encoded face at {rotation}");
                    return Ok((embedding, rotation));
                }
                Ok(None) => log::debug!("No face at {rotation}"),
                Err(e) => log::debug!("Encoder failed at {rotation}: {e}"),
            }
        }
        Err(EncodeError::NoFaceFound)
    }
}
