use crate::shared::frame::Frame;

use super::embedding::Embedding;

/// Turns a face image into an identity embedding.
///
/// `Ok(None)` means the image was processed but holds no detectable face.
pub trait FaceEncoder: Send {
    fn encode(&mut self, image: &Frame) -> Result<Option<Embedding>, Box<dyn std::error::Error>>;
}
