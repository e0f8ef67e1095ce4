use std::path::PathBuf;

use crate::frontalization::domain::frontalization_stage::{
    FrontalizationStage, FrontalizeRequest,
};
use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

/// Last-resort frontalization: reflects the left half of the face onto
/// the right half. Produces output for any readable image.
pub struct MirrorStage {
    writer: Box<dyn ImageWriter>,
}

impl MirrorStage {
    pub fn new(writer: Box<dyn ImageWriter>) -> Self {
        Self { writer }
    }
}

impl FrontalizationStage for MirrorStage {
    fn name(&self) -> &'static str {
        "mirror"
    }

    fn frontalize(
        &mut self,
        request: &FrontalizeRequest<'_>,
    ) -> Result<Option<PathBuf>, Box<dyn std::error::Error>> {
        let mirrored = mirror_left_half(request.face).ok_or("Face is not a non-empty image")?;
        self.writer.write(request.output_path, &mirrored)?;
        Ok(Some(request.output_path.to_path_buf()))
    }
}

/// Same-size copy of `frame` whose right half is the mirror image of its
/// left half. The middle column of an odd-width frame stays in place.
pub fn mirror_left_half(frame: &Frame) -> Option<Frame> {
    let (w, h) = (frame.width() as usize, frame.height() as usize);
    let channels = frame.channels() as usize;
    if w == 0 || h == 0 || frame.data().len() != w * h * channels {
        return None;
    }

    let left_cols = w.div_ceil(2);
    let data = frame.data();
    let mut out = Vec::with_capacity(data.len());
    for y in 0..h {
        let row = &data[y * w * channels..(y + 1) * w * channels];
        for x in 0..w {
            let src_x = if x < left_cols { x } else { w - 1 - x };
            out.extend_from_slice(&row[src_x * channels..(src_x + 1) * channels]);
        }
    }
    Some(Frame::new(
        out,
        frame.width(),
        frame.height(),
        frame.channels(),
        frame.index(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    fn row_frame(reds: &[u8]) -> Frame {
        let data = reds.iter().flat_map(|&r| [r, 0, 0]).collect();
        Frame::new(data, reds.len() as u32, 1, 3, 0)
    }

    fn reds(frame: &Frame) -> Vec<u8> {
        frame.data().chunks_exact(3).map(|px| px[0]).collect()
    }

    #[test]
    fn test_mirror_even_width() {
        let mirrored = mirror_left_half(&row_frame(&[1, 2, 3, 4])).unwrap();
        assert_eq!(reds(&mirrored), vec![1, 2, 2, 1]);
    }

    #[test]
    fn test_mirror_odd_width_keeps_center() {
        let mirrored = mirror_left_half(&row_frame(&[1, 2, 3, 4, 5])).unwrap();
        assert_eq!(reds(&mirrored), vec![1, 2, 3, 2, 1]);
    }

    #[test]
    fn test_mirror_preserves_dimensions_on_every_row() {
        let frame = Frame::new((0..2 * 4 * 3).map(|v| v as u8).collect(), 4, 2, 3, 9);
        let mirrored = mirror_left_half(&frame).unwrap();
        assert_eq!((mirrored.width(), mirrored.height(), mirrored.index()), (4, 2, 9));
        assert_eq!(reds(&mirrored), vec![0, 3, 3, 0, 12, 15, 15, 12]);
    }

    #[test]
    fn test_mirror_single_column() {
        let mirrored = mirror_left_half(&row_frame(&[7])).unwrap();
        assert_eq!(reds(&mirrored), vec![7]);
    }

    struct RecordingWriter {
        written: Arc<Mutex<Vec<(PathBuf, Frame)>>>,
    }

    impl ImageWriter for RecordingWriter {
        fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            self.written
                .lock()
                .unwrap()
                .push((path.to_path_buf(), frame.clone()));
            Ok(())
        }
    }

    #[test]
    fn test_stage_always_writes_for_valid_image() {
        let written = Arc::new(Mutex::new(Vec::new()));
        let mut stage = MirrorStage::new(Box::new(RecordingWriter {
            written: written.clone(),
        }));
        let face = row_frame(&[1, 2, 3, 4]);
        let out = Path::new("/out/face_0000_frontal.jpg");
        let request = FrontalizeRequest {
            face_path: Path::new("/faces/face_0000.jpg"),
            face: &face,
            person: None,
            output_path: out,
        };

        assert_eq!(stage.frontalize(&request).unwrap(), Some(out.to_path_buf()));
        let written = written.lock().unwrap();
        assert_eq!(written[0].0, out);
        assert_eq!(reds(&written[0].1), vec![1, 2, 2, 1]);
    }
}
