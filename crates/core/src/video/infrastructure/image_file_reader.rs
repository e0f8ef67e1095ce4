use std::path::Path;

use crate::shared::frame::Frame;
use crate::video::domain::image_reader::ImageReader;

/// Decodes still images with the `image` crate.
///
/// Any pixel layout the decoder supports (grayscale, RGBA, 16-bit) is
/// converted to 8-bit RGB.
pub struct ImageFileReader;

impl ImageFileReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageReader for ImageFileReader {
    fn read(&self, path: &Path) -> Result<Frame, Box<dyn std::error::Error>> {
        let img = image::open(path)?.to_rgb8();
        if img.width() == 0 || img.height() == 0 {
            return Err(format!("{} has no pixels", path.display()).into());
        }
        Ok(Frame::from_rgb_image(img, 0))
    }
}
