use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::gallery::domain::gallery::Person;
use crate::shared::frame::Frame;

use super::frontalization_stage::{FrontalizationStage, FrontalizeRequest};

const FRONTAL_SUFFIX: &str = "_frontal.jpg";

/// Output of a successful frontalization.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrontalizedFace {
    pub path: PathBuf,
    /// Name of the stage that produced it.
    pub stage: String,
}

/// Ordered list of frontalization strategies; the first one to produce an
/// image wins.
///
/// Stage failures are logged and never surface to the caller.
pub struct FrontalizerChain {
    stages: Vec<Box<dyn FrontalizationStage>>,
}

impl FrontalizerChain {
    pub fn new(stages: Vec<Box<dyn FrontalizationStage>>) -> Self {
        Self { stages }
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// `<output_dir>/<face stem>_frontal.jpg`.
    pub fn output_path(face_path: &Path, output_dir: &Path) -> PathBuf {
        let stem = face_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "face".to_string());
        output_dir.join(format!("{stem}{FRONTAL_SUFFIX}"))
    }

    pub fn frontalize(
        &mut self,
        face_path: &Path,
        face: &Frame,
        person: Option<&Person>,
        output_dir: &Path,
    ) -> Option<FrontalizedFace> {
        if let Err(e) = fs::create_dir_all(output_dir) {
            log::warn!(
                "Cannot create frontal output dir {}: {e}",
                output_dir.display()
            );
            return None;
        }

        let output_path = Self::output_path(face_path, output_dir);
        let request = FrontalizeRequest {
            face_path,
            face,
            person,
            output_path: &output_path,
        };

        for stage in self.stages.iter_mut() {
            match stage.frontalize(&request) {
                Ok(Some(path)) => {
                    log::info!(
                        "Frontalized {} via {}",
                        face_path.display(),
                        stage.name()
                    );
                    return Some(FrontalizedFace {
                        path,
                        stage: stage.name().to_string(),
                    });
                }
                Ok(None) => log::debug!("{} skipped {}", stage.name(), face_path.display()),
                Err(e) => log::warn!(
                    "{} failed for {}: {e}",
                    stage.name(),
                    face_path.display()
                ),
            }
        }

        log::warn!("No frontal image produced for {}", face_path.display());
        None
    }
}
