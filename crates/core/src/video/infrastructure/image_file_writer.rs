use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

/// JPEG quality for face crops and frontal images.
const JPEG_QUALITY: u8 = 95;

/// Writes frames with the `image` crate.
///
/// `.jpg`/`.jpeg` paths are encoded at [`JPEG_QUALITY`]; other extensions use
/// the crate's default encoder for that format.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let img = frame
            .to_rgb_image()
            .ok_or("Failed to create image from frame data")?;

        let is_jpeg = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"));

        if is_jpeg {
            let out = BufWriter::new(File::create(path)?);
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(out, JPEG_QUALITY);
            img.write_with_encoder(encoder)?;
        } else {
            img.save(path)?;
        }
        Ok(())
    }
}
