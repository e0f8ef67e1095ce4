use std::path::Path;

use super::extract_faces_use_case::{ExtractError, ExtractFacesUseCase};
use super::identify_faces_use_case::{IdentifiedFace, IdentifyFacesUseCase};

/// Extraction followed by identification of every extracted face.
pub struct ProcessVideoUseCase {
    extract: ExtractFacesUseCase,
    identify: IdentifyFacesUseCase,
}

impl ProcessVideoUseCase {
    pub fn new(extract: ExtractFacesUseCase, identify: IdentifyFacesUseCase) -> Self {
        Self { extract, identify }
    }

    /// Faces are written to `faces_dir`; a video that cannot be opened
    /// yields an empty list.
    pub fn execute(
        &mut self,
        video: &Path,
        faces_dir: &Path,
    ) -> Result<Vec<IdentifiedFace>, ExtractError> {
        let faces = self.extract.execute(video, faces_dir)?;
        if faces.is_empty() {
            log::info!("No faces found in {}", video.display());
            return Ok(Vec::new());
        }
        Ok(self.identify.execute(&faces))
    }
}
