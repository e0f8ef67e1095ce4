use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::detection::domain::detection::DEFAULT_CROP_PADDING;
use crate::extraction::domain::face_deduplicator::DEFAULT_DEDUP_DISTANCE;
use crate::frontalization::infrastructure::gemini_stage::{
    DEFAULT_ENDPOINT, DEFAULT_MAX_REFERENCE_IMAGES, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS,
};
use crate::gallery::infrastructure::gallery_loader::DEFAULT_MIN_REFERENCES;
use crate::recognition::domain::identity_matcher::DEFAULT_MATCH_THRESHOLD;

pub const DEFAULT_FRAME_SKIP: usize = 2;
pub const DEFAULT_MAX_UNIQUE_FACES: usize = 8;
pub const DEFAULT_DETECTION_CONFIDENCE: f64 = 0.55;
pub const DEFAULT_RESIZE: u32 = 400;
pub const DEFAULT_API_KEY_ENV: &str = "GOOGLE_API_KEY";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    Invalid(String),
}

/// Tuning knobs for one deployment of the extraction/identification pipeline.
///
/// Every field has a default, so a config file only needs the keys it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Keep every Nth decoded frame.
    pub frame_skip: usize,
    pub max_unique_faces: usize,
    /// Detections below this confidence are ignored.
    pub detection_confidence: f64,
    /// Crops whose fingerprint is within this many bits of an accepted one
    /// are duplicates.
    pub dedup_distance: u32,
    /// Fraction of the box size added on each side before cropping.
    pub crop_padding: f64,
    pub resize_width: u32,
    pub resize_height: u32,
    /// Euclidean distance above which a match is rejected as unknown.
    pub match_threshold: f64,
    /// Minimum successfully encoded references for a gallery person.
    pub min_references: usize,
    /// Rotate portrait frames to landscape before detection.
    pub auto_rotate_portrait: bool,
    /// ONNX frontalization model; the stage is skipped when unset.
    pub frontal_model: Option<PathBuf>,
    pub remote: RemoteConfig,
}

/// Remote generative frontalization settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub max_reference_images: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_skip: DEFAULT_FRAME_SKIP,
            max_unique_faces: DEFAULT_MAX_UNIQUE_FACES,
            detection_confidence: DEFAULT_DETECTION_CONFIDENCE,
            dedup_distance: DEFAULT_DEDUP_DISTANCE,
            crop_padding: DEFAULT_CROP_PADDING,
            resize_width: DEFAULT_RESIZE,
            resize_height: DEFAULT_RESIZE,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            min_references: DEFAULT_MIN_REFERENCES,
            auto_rotate_portrait: true,
            frontal_model: None,
            remote: RemoteConfig::default(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_reference_images: DEFAULT_MAX_REFERENCE_IMAGES,
        }
    }
}

impl PipelineConfig {
    /// `<config_dir>/FaceRoster/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("FaceRoster").join("config.json"))
    }

    /// Loads the explicit file if given, else the default file if it
    /// exists, else the built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_skip == 0 {
            return Err(ConfigError::Invalid("frame_skip must be >= 1".into()));
        }
        if self.max_unique_faces == 0 {
            return Err(ConfigError::Invalid("max_unique_faces must be >= 1".into()));
        }
        if !(0.0..=1.0).contains(&self.detection_confidence) {
            return Err(ConfigError::Invalid(format!(
                "detection_confidence must be between 0.0 and 1.0, got {}",
                self.detection_confidence
            )));
        }
        if self.dedup_distance >= 64 {
            return Err(ConfigError::Invalid(format!(
                "dedup_distance must be below 64 bits, got {}",
                self.dedup_distance
            )));
        }
        if !(0.0..=1.0).contains(&self.crop_padding) {
            return Err(ConfigError::Invalid(format!(
                "crop_padding must be between 0.0 and 1.0, got {}",
                self.crop_padding
            )));
        }
        if self.resize_width == 0 || self.resize_height == 0 {
            return Err(ConfigError::Invalid("resize dimensions must be non-zero".into()));
        }
        if !self.match_threshold.is_finite() || self.match_threshold < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "match_threshold must be a non-negative number, got {}",
                self.match_threshold
            )));
        }
        if self.min_references == 0 {
            return Err(ConfigError::Invalid("min_references must be >= 1".into()));
        }
        if self.remote.timeout_secs == 0 {
            return Err(ConfigError::Invalid("remote.timeout_secs must be >= 1".into()));
        }
        Ok(())
    }
}
