//! Face extraction, identity matching and frontalization for videos.
//!
//! Each bounded context keeps its traits and value types under `domain/`
//! and its ffmpeg, ONNX Runtime, filesystem and HTTP adapters under
//! `infrastructure/`. The use cases in [`pipeline`] wire them together.

pub mod detection;
pub mod extraction;
pub mod frontalization;
pub mod gallery;
pub mod pipeline;
pub mod recognition;
pub mod sampling;
pub mod shared;
pub mod video;
