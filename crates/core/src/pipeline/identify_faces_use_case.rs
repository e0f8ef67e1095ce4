use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::frontalization::domain::frontalizer_chain::{FrontalizedFace, FrontalizerChain};
use crate::gallery::domain::gallery::Gallery;
use crate::recognition::domain::identity_matcher::{Identity, IdentityMatcher};
use crate::recognition::domain::rotating_encoder::RotatingEncoder;
use crate::recognition::domain::rotation::Rotation;
use crate::video::domain::image_reader::ImageReader;

/// Outcome for one face file.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IdentifiedFace {
    pub face: PathBuf,
    pub identity: Identity,
    /// Distance to the closest gallery embedding; serialized as `null` when
    /// nothing was comparable.
    pub distance: f64,
    /// Orientation the face was encoded in, if any.
    pub rotation: Option<Rotation>,
    pub frontal: Option<FrontalizedFace>,
}

/// Matches saved face crops against a gallery and, when a frontalizer is
/// configured, produces a frontal view for each of them.
pub struct IdentifyFacesUseCase {
    reader: Box<dyn ImageReader>,
    encoder: RotatingEncoder,
    matcher: IdentityMatcher,
    gallery: Arc<Gallery>,
    frontalizer: Option<(FrontalizerChain, PathBuf)>,
}

impl IdentifyFacesUseCase {
    /// `frontalizer` pairs the chain with the directory frontal images go to.
    pub fn new(
        reader: Box<dyn ImageReader>,
        encoder: RotatingEncoder,
        matcher: IdentityMatcher,
        gallery: Arc<Gallery>,
        frontalizer: Option<(FrontalizerChain, PathBuf)>,
    ) -> Self {
        Self {
            reader,
            encoder,
            matcher,
            gallery,
            frontalizer,
        }
    }

    pub fn execute(&mut self, faces: &[PathBuf]) -> Vec<IdentifiedFace> {
        if self.gallery.is_empty() {
            log::warn!("Gallery is empty; every face will be unknown");
        }
        faces.iter().map(|face| self.identify(face)).collect()
    }

    fn identify(&mut self, face_path: &Path) -> IdentifiedFace {
        let image = match self.reader.read(face_path) {
            Ok(image) => image,
            Err(e) => {
                log::warn!("Cannot read face {}: {e}", face_path.display());
                return IdentifiedFace {
                    face: face_path.to_path_buf(),
                    identity: Identity::Unknown,
                    distance: f64::INFINITY,
                    rotation: None,
                    frontal: None,
                };
            }
        };

        let (embedding, rotation) = match self.encoder.encode(&image) {
            Ok((embedding, rotation)) => (Some(embedding), Some(rotation)),
            Err(e) => {
                log::warn!("{}: {e}", face_path.display());
                (None, None)
            }
        };

        let result = self.matcher.best_match(embedding.as_ref(), &self.gallery);
        log::info!(
            "{} -> {} (distance {:.3})",
            face_path.display(),
            result.identity,
            result.distance
        );

        let frontal = self.frontalizer.as_mut().and_then(|(chain, dir)| {
            let person = match &result.identity {
                Identity::Known(name) => self.gallery.person(name),
                Identity::Unknown => None,
            };
            chain.frontalize(face_path, &image, person, dir)
        });

        IdentifiedFace {
            face: face_path.to_path_buf(),
            identity: result.identity,
            distance: result.distance,
            rotation,
            frontal,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::frontalization::infrastructure::gallery_copy_stage::GalleryCopyStage;
    use crate::frontalization::infrastructure::mirror_stage::MirrorStage;
    use crate::gallery::domain::gallery::Person;
    use crate::recognition::domain::embedding::Embedding;
    use crate::recognition::domain::face_encoder::FaceEncoder;
    use crate::shared::frame::Frame;
    use crate::video::infrastructure::image_file_writer::ImageFileWriter;
    use std::fs;
    use tempfile::TempDir;

    /// Reads a file's first byte as a 2x2 image of that value.
    pub(crate) struct ByteReader;

    impl ImageReader for ByteReader {
        fn read(&self, path: &Path) -> Result<Frame, Box<dyn std::error::Error>> {
            let bytes = fs::read(path)?;
            let value = *bytes.first().ok_or("empty image")?;
            Ok(Frame::new(vec![value; 12], 2, 2, 3, 0))
        }
    }

    /// Embeds the top-left pixel value; 0 holds no face.
    pub(crate) struct ValueEncoder;

    impl FaceEncoder for ValueEncoder {
        fn encode(&mut self, image: &Frame) -> Result<Option<Embedding>, Box<dyn std::error::Error>> {
            match image.data()[0] {
                0 => Ok(None),
                v => Ok(Some(Embedding::new(vec![v as f32 / 100.0]))),
            }
        }
    }

    pub(crate) fn gallery(frontal: Option<PathBuf>) -> Arc<Gallery> {
        let mut alice = Person::new("alice", vec![Embedding::new(vec![0.1])]);
        alice.frontal_image = frontal;
        let bob = Person::new("bob", vec![Embedding::new(vec![0.9])]);
        Arc::new(Gallery::new(vec![alice, bob]))
    }

    fn face(dir: &Path, name: &str, value: u8) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, [value]).unwrap();
        path
    }

    fn use_case(
        gallery: Arc<Gallery>,
        frontalizer: Option<(FrontalizerChain, PathBuf)>,
    ) -> IdentifyFacesUseCase {
        IdentifyFacesUseCase::new(
            Box::new(ByteReader),
            RotatingEncoder::new(Box::new(ValueEncoder)),
            IdentityMatcher::new(0.2),
            gallery,
            frontalizer,
        )
    }

    #[test]
    fn test_matches_and_rejects_by_threshold() {
        let tmp = TempDir::new().unwrap();
        let near_alice = face(tmp.path(), "face_0000.jpg", 12);
        let far_from_all = face(tmp.path(), "face_0001.jpg", 50);

        let results = use_case(gallery(None), None).execute(&[near_alice.clone(), far_from_all]);

        assert_eq!(results[0].face, near_alice);
        assert_eq!(results[0].identity, Identity::Known("alice".into()));
        assert!((results[0].distance - 0.02).abs() < 1e-6);
        assert_eq!(results[0].rotation, Some(Rotation::Upright));
        assert_eq!(results[1].identity, Identity::Unknown);
        assert!((results[1].distance - 0.4).abs() < 1e-6);
        assert!(results.iter().all(|r| r.frontal.is_none()));
    }

    #[test]
    fn test_unreadable_face_is_unknown() {
        let tmp = TempDir::new().unwrap();
        let empty = tmp.path().join("face_0000.jpg");
        fs::write(&empty, b"").unwrap();

        let results = use_case(gallery(None), None).execute(&[empty]);

        assert_eq!(results[0].identity, Identity::Unknown);
        assert!(results[0].distance.is_infinite());
        assert_eq!(results[0].rotation, None);
    }

    #[test]
    fn test_faceless_image_is_unknown_with_infinite_distance() {
        let tmp = TempDir::new().unwrap();
        let blank = face(tmp.path(), "face_0000.jpg", 0);

        let results = use_case(gallery(None), None).execute(&[blank]);

        assert_eq!(results[0].identity, Identity::Unknown);
        assert!(results[0].distance.is_infinite());
    }

    #[test]
    fn test_frontalizes_known_via_gallery_and_unknown_via_mirror() {
        let tmp = TempDir::new().unwrap();
        let frontal = tmp.path().join("alice_frontal_ref.jpg");
        fs::write(&frontal, b"alice").unwrap();
        let out = tmp.path().join("frontal");
        let chain = FrontalizerChain::new(vec![
            Box::new(GalleryCopyStage::new()),
            Box::new(MirrorStage::new(Box::new(ImageFileWriter::new()))),
        ]);
        let alice_face = face(tmp.path(), "face_0000.jpg", 10);
        let stranger = face(tmp.path(), "face_0001.jpg", 50);

        let results = use_case(gallery(Some(frontal)), Some((chain, out.clone())))
            .execute(&[alice_face, stranger]);

        let alice = results[0].frontal.as_ref().unwrap();
        assert_eq!(alice.stage, "gallery");
        assert_eq!(alice.path, out.join("face_0000_frontal.jpg"));
        assert_eq!(fs::read(&alice.path).unwrap(), b"alice");

        let unknown = results[1].frontal.as_ref().unwrap();
        assert_eq!(unknown.stage, "mirror");
        assert!(unknown.path.is_file());
    }

    #[test]
    fn test_record_serializes_identity_and_null_distance() {
        let record = IdentifiedFace {
            face: PathBuf::from("faces/face_0000.jpg"),
            identity: Identity::Unknown,
            distance: f64::INFINITY,
            rotation: Some(Rotation::Clockwise90),
            frontal: None,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["identity"], "unknown");
        assert!(json["distance"].is_null());
        assert_eq!(json["rotation"], "clockwise90");
        assert!(json["frontal"].is_null());
    }
}
