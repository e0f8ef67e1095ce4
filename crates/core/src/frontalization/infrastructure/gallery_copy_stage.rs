use std::fs;
use std::path::PathBuf;

use crate::frontalization::domain::frontalization_stage::{
    FrontalizationStage, FrontalizeRequest,
};

/// Uses the matched person's designated frontal photo verbatim.
pub struct GalleryCopyStage;

impl GalleryCopyStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GalleryCopyStage {
    fn default() -> Self {
        Self::new()
    }
}

impl FrontalizationStage for GalleryCopyStage {
    fn name(&self) -> &'static str {
        "gallery"
    }

    fn frontalize(
        &mut self,
        request: &FrontalizeRequest<'_>,
    ) -> Result<Option<PathBuf>, Box<dyn std::error::Error>> {
        let Some(frontal) = request.person.and_then(|p| p.frontal_image.as_deref()) else {
            return Ok(None);
        };
        fs::copy(frontal, request.output_path)?;
        Ok(Some(request.output_path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::domain::gallery::Person;
    use crate::shared::frame::Frame;
    use std::path::Path;
    use tempfile::TempDir;

    fn face() -> Frame {
        Frame::new(vec![0u8; 3], 1, 1, 3, 0)
    }

    #[test]
    fn test_copies_frontal_of_matched_person() {
        let tmp = TempDir::new().unwrap();
        let frontal = tmp.path().join("frontal.jpg");
        fs::write(&frontal, b"frontal bytes").unwrap();
        let mut person = Person::new("alice", Vec::new());
        person.frontal_image = Some(frontal);

        let out = tmp.path().join("face_0000_frontal.jpg");
        let face = face();
        let request = FrontalizeRequest {
            face_path: Path::new("face_0000.jpg"),
            face: &face,
            person: Some(&person),
            output_path: &out,
        };

        let written = GalleryCopyStage::new().frontalize(&request).unwrap();
        assert_eq!(written, Some(out.clone()));
        assert_eq!(fs::read(&out).unwrap(), b"frontal bytes");
    }

    #[test]
    fn test_skips_without_match_or_frontal() {
        let face = face();
        let person = Person::new("bob", Vec::new());
        for person in [None, Some(&person)] {
            let request = FrontalizeRequest {
                face_path: Path::new("face_0000.jpg"),
                face: &face,
                person,
                output_path: Path::new("/out/face_0000_frontal.jpg"),
            };
            assert_eq!(GalleryCopyStage::new().frontalize(&request).unwrap(), None);
        }
    }

    #[test]
    fn test_missing_frontal_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let mut person = Person::new("carl", Vec::new());
        person.frontal_image = Some(tmp.path().join("gone.jpg"));
        let face = face();
        let out = tmp.path().join("out.jpg");
        let request = FrontalizeRequest {
            face_path: Path::new("face_0000.jpg"),
            face: &face,
            person: Some(&person),
            output_path: &out,
        };
        assert!(GalleryCopyStage::new().frontalize(&request).is_err());
    }
}
