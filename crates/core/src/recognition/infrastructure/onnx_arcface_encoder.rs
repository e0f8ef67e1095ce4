use std::path::Path;

use crate::detection::domain::detection::Detection;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::infrastructure::execution_provider::load_session;
use crate::recognition::domain::embedding::Embedding;
use crate::recognition::domain::face_encoder::FaceEncoder;
use crate::shared::frame::Frame;

const INPUT_SIZE: usize = 112;
const NORM_MEAN: f32 = 127.5;
const NORM_STD: f32 = 127.5;

/// ArcFace embedder: locates the most confident face with a detector and
/// embeds that crop with an ONNX recognition model.
pub struct OnnxArcFaceEncoder {
    detector: Box<dyn FaceDetector>,
    session: ort::session::Session,
}

impl OnnxArcFaceEncoder {
    pub fn new(
        model_path: &Path,
        detector: Box<dyn FaceDetector>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session = load_session(model_path)?;
        Ok(Self { detector, session })
    }

    fn embed(&mut self, face: &Frame) -> Result<Embedding, Box<dyn std::error::Error>> {
        let tensor = preprocess(face).ok_or("Face crop is not a valid RGB image")?;
        let input_value = ort::value::Tensor::from_array(tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("Recognition model produced no outputs".into());
        }
        let embedding_array = outputs[0].try_extract_array::<f32>()?;
        let embedding_slice = embedding_array
            .as_slice()
            .ok_or("Cannot get embedding slice")?;
        Ok(Embedding::normalized(embedding_slice.to_vec()))
    }
}

impl FaceEncoder for OnnxArcFaceEncoder {
    fn encode(&mut self, image: &Frame) -> Result<Option<Embedding>, Box<dyn std::error::Error>> {
        let detections = self.detector.detect(image)?;
        let Some(best) = most_confident(&detections) else {
            return Ok(None);
        };
        let Some(crop) = image.crop(
            best.x1.max(0.0) as u32,
            best.y1.max(0.0) as u32,
            best.x2.ceil().max(0.0) as u32,
            best.y2.ceil().max(0.0) as u32,
        ) else {
            return Ok(None);
        };
        self.embed(&crop).map(Some)
    }
}

fn most_confident(detections: &[Detection]) -> Option<&Detection> {
    detections
        .iter()
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
}

/// Nearest-neighbour resize to 112x112, `(p - 127.5) / 127.5`, NCHW layout.
fn preprocess(face: &Frame) -> Option<ndarray::Array4<f32>> {
    let src = face.as_ndarray()?;
    let src_w = face.width() as usize;
    let src_h = face.height() as usize;
    if face.channels() != 3 || src_w == 0 || src_h == 0 {
        return None;
    }

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, INPUT_SIZE, INPUT_SIZE));
    for y in 0..INPUT_SIZE {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / INPUT_SIZE as f64) as usize).min(src_h - 1);
        for x in 0..INPUT_SIZE {
            let src_x =
                (((x as f64 + 0.5) * src_w as f64 / INPUT_SIZE as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, y, x]] = (src[[src_y, src_x, c]] as f32 - NORM_MEAN) / NORM_STD;
            }
        }
    }
    Some(tensor)
}
