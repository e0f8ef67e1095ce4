pub mod config;
pub mod constants;
pub mod frame;
pub mod model_resolver;
pub mod video_metadata;
