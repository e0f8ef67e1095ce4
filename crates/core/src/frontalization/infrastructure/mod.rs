pub mod gallery_copy_stage;
pub mod gemini_stage;
pub mod mirror_stage;
pub mod onnx_gan_stage;
