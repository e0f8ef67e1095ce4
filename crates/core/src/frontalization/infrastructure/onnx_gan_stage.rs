use std::path::{Path, PathBuf};

use crate::detection::infrastructure::execution_provider::load_session;
use crate::frontalization::domain::frontalization_stage::{
    FrontalizationStage, FrontalizeRequest,
};
use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

/// Input side used when the model declares dynamic spatial dimensions.
const DEFAULT_INPUT_SIZE: u32 = 128;

/// Image-to-image frontalization network exported to ONNX.
///
/// Takes `[1, 3, H, W]` RGB in `[0, 1]` and returns the same layout.
pub struct OnnxGanStage {
    session: ort::session::Session,
    input_width: u32,
    input_height: u32,
    writer: Box<dyn ImageWriter>,
}

impl OnnxGanStage {
    pub fn new(
        model_path: &Path,
        writer: Box<dyn ImageWriter>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session = load_session(model_path)?;
        let (input_width, input_height) = session
            .inputs()
            .first()
            .and_then(|input| match input.dtype() {
                ort::value::ValueType::Tensor { shape, .. }
                    if shape.len() == 4 && shape[2] > 0 && shape[3] > 0 =>
                {
                    Some((shape[3] as u32, shape[2] as u32))
                }
                _ => None,
            })
            .unwrap_or((DEFAULT_INPUT_SIZE, DEFAULT_INPUT_SIZE));

        Ok(Self {
            session,
            input_width,
            input_height,
            writer,
        })
    }

    fn generate(&mut self, face: &Frame) -> Result<Frame, Box<dyn std::error::Error>> {
        let resized = face
            .resize(self.input_width, self.input_height)
            .ok_or("Face is not a valid RGB image")?;
        let tensor = to_unit_tensor(&resized).ok_or("Face is not a valid RGB image")?;
        let input_value = ort::value::Tensor::from_array(tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("Frontalization model produced no outputs".into());
        }
        let output = outputs[0].try_extract_array::<f32>()?;
        let output = output
            .into_dimensionality::<ndarray::Ix4>()
            .map_err(|e| format!("Unexpected frontalization output shape: {e}"))?;
        from_unit_tensor(output.view(), face.index())
            .ok_or_else(|| "Frontalization output is not a 3-channel image".into())
    }
}

impl FrontalizationStage for OnnxGanStage {
    fn name(&self) -> &'static str {
        "gan"
    }

    fn frontalize(
        &mut self,
        request: &FrontalizeRequest<'_>,
    ) -> Result<Option<PathBuf>, Box<dyn std::error::Error>> {
        let frontal = self.generate(request.face)?;
        self.writer.write(request.output_path, &frontal)?;
        Ok(Some(request.output_path.to_path_buf()))
    }
}

/// HWC u8 to NCHW f32 scaled into `[0, 1]`.
fn to_unit_tensor(frame: &Frame) -> Option<ndarray::Array4<f32>> {
    let src = frame.as_ndarray()?;
    let (h, w) = (frame.height() as usize, frame.width() as usize);
    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, h, w));
    for y in 0..h {
        for x in 0..w {
            for c in 0..3 {
                tensor[[0, c, y, x]] = src[[y, x, c]] as f32 / 255.0;
            }
        }
    }
    Some(tensor)
}

/// NCHW `[0, 1]` back to an RGB frame, clamping out-of-range values.
fn from_unit_tensor(tensor: ndarray::ArrayView4<'_, f32>, index: usize) -> Option<Frame> {
    let &[batch, channels, h, w] = tensor.shape() else {
        return None;
    };
    if batch == 0 || channels != 3 || h == 0 || w == 0 {
        return None;
    }
    let mut data = Vec::with_capacity(h * w * 3);
    for y in 0..h {
        for x in 0..w {
            for c in 0..3 {
                let v = tensor[[0, c, y, x]];
                let v = if v.is_nan() { 0.0 } else { v };
                data.push((v * 255.0).round().clamp(0.0, 255.0) as u8);
            }
        }
    }
    Some(Frame::new(data, w as u32, h as u32, 3, index))
}
