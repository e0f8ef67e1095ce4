use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::frontalization::domain::frontalization_stage::{
    FrontalizationStage, FrontalizeRequest,
};
use crate::shared::config::RemoteConfig;
use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "models/gemini-2.0-flash-exp-image-generation";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_REFERENCE_IMAGES: usize = 6;

const PROMPT: &str = "You are an identity-preserving face frontalization AI. \
Input: first image = detected face from video. Other images = same person reference photos. \
Output: generate a clear 512x512 realistic FRONTAL face. \
Do not beautify. Keep identity EXACT.";

#[derive(Error, Debug)]
pub enum GeminiError {
    #[error("environment variable {0} is not set")]
    MissingApiKey(String),
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("failed to read {path}: {source}")]
    ReadImage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("generateContent request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("generateContent returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("response carried no image")]
    NoImage,
    #[error("invalid base64 image data: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("cannot decode returned image: {0}")]
    Decode(#[from] image::ImageError),
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text {
        text: String,
    },
    Image {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct InlineData {
    #[serde(rename = "mimeType", alias = "mime_type")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(rename = "inlineData", alias = "inline_data")]
    inline_data: Option<InlineData>,
}

/// Frontalizes through Gemini image generation, passing the matched
/// person's reference photos to anchor the identity.
pub struct GeminiStage {
    client: reqwest::blocking::Client,
    url: String,
    api_key: String,
    max_reference_images: usize,
    writer: Box<dyn ImageWriter>,
}

impl GeminiStage {
    /// Reads the API key from the configured environment variable.
    pub fn from_config(
        config: &RemoteConfig,
        writer: Box<dyn ImageWriter>,
    ) -> Result<Self, GeminiError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| GeminiError::MissingApiKey(config.api_key_env.clone()))?;
        Self::new(config, api_key, writer)
    }

    pub fn new(
        config: &RemoteConfig,
        api_key: String,
        writer: Box<dyn ImageWriter>,
    ) -> Result<Self, GeminiError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(GeminiError::Client)?;
        Ok(Self {
            client,
            url: generate_content_url(&config.endpoint, &config.model),
            api_key,
            max_reference_images: config.max_reference_images,
            writer,
        })
    }

    fn generate(&self, request: &FrontalizeRequest<'_>) -> Result<Frame, GeminiError> {
        let references = request
            .person
            .map(|p| p.reference_images.as_slice())
            .unwrap_or_default();
        let images = std::iter::once(request.face_path)
            .chain(
                references
                    .iter()
                    .take(self.max_reference_images)
                    .map(PathBuf::as_path),
            )
            .collect::<Vec<_>>();
        let body = build_request(&images)?;

        log::debug!(
            "Requesting remote frontalization of {} with {} reference(s)",
            request.face_path.display(),
            images.len() - 1
        );
        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(GeminiError::Request)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GeminiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let parsed: GenerateResponse = response.json().map_err(GeminiError::Request)?;
        let bytes = first_image(parsed)?;
        let image = image::load_from_memory(&bytes)?;
        Ok(Frame::from_rgb_image(image.to_rgb8(), request.face.index()))
    }
}

impl FrontalizationStage for GeminiStage {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn frontalize(
        &mut self,
        request: &FrontalizeRequest<'_>,
    ) -> Result<Option<PathBuf>, Box<dyn std::error::Error>> {
        let frontal = self.generate(request)?;
        self.writer.write(request.output_path, &frontal)?;
        Ok(Some(request.output_path.to_path_buf()))
    }
}

fn generate_content_url(endpoint: &str, model: &str) -> String {
    format!(
        "{}/{}:generateContent",
        endpoint.trim_end_matches('/'),
        model.trim_start_matches('/')
    )
}

/// Prompt first, then every image as an inline base64 part, in order.
fn build_request(images: &[&Path]) -> Result<GenerateRequest, GeminiError> {
    let mut parts = vec![RequestPart::Text {
        text: PROMPT.to_string(),
    }];
    for path in images {
        let bytes = fs::read(path).map_err(|e| GeminiError::ReadImage {
            path: path.to_path_buf(),
            source: e,
        })?;
        parts.push(RequestPart::Image {
            inline_data: InlineData {
                mime_type: mime_type(path).to_string(),
                data: base64::engine::general_purpose::STANDARD.encode(bytes),
            },
        });
    }
    Ok(GenerateRequest {
        contents: vec![Content {
            role: "user",
            parts,
        }],
    })
}

fn mime_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("png") => "image/png",
        _ => "image/jpeg",
    }
}

/// Bytes of the first inline image of the first candidate.
fn first_image(response: GenerateResponse) -> Result<Vec<u8>, GeminiError> {
    let data = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|content| content.parts.into_iter().find_map(|p| p.inline_data))
        .ok_or(GeminiError::NoImage)?;
    Ok(base64::engine::general_purpose::STANDARD.decode(data.data)?)
}
