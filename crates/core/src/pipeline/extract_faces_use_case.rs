use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::detection::domain::detection::Detection;
use crate::detection::domain::face_detector::FaceDetector;
use crate::extraction::domain::face_deduplicator::FaceDeduplicator;
use crate::extraction::domain::perceptual_hash::PerceptualHash;
use crate::sampling::frame_sampler::FrameSampler;
use crate::shared::config::PipelineConfig;
use crate::shared::constants::face_file_name;
use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("cannot create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("extraction cancelled")]
    Cancelled,
}

/// Knobs of one extraction session.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractionSettings {
    pub max_faces: usize,
    pub detection_confidence: f64,
    pub crop_padding: f64,
    pub resize_width: u32,
    pub resize_height: u32,
    pub dedup_distance: u32,
}

impl From<&PipelineConfig> for ExtractionSettings {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            max_faces: config.max_unique_faces,
            detection_confidence: config.detection_confidence,
            crop_padding: config.crop_padding,
            resize_width: config.resize_width,
            resize_height: config.resize_height,
            dedup_distance: config.dedup_distance,
        }
    }
}

/// Called with `(samples processed, expected samples or 0)`; returning
/// `false` cancels the session.
pub type ProgressCallback = Box<dyn Fn(usize, usize) -> bool + Send>;

/// Pulls distinct faces out of a video.
///
/// Sampled frames go through the detector; confident detections are padded,
/// cropped, resized and fingerprinted, and only crops that differ from every
/// face already saved in this session are written as
/// `face_0000.jpg`, `face_0001.jpg`, ... The session stops as soon as
/// `max_faces` crops have been written.
pub struct ExtractFacesUseCase {
    sampler: FrameSampler,
    detector: Box<dyn FaceDetector>,
    writer: Box<dyn ImageWriter>,
    settings: ExtractionSettings,
    on_progress: Option<ProgressCallback>,
}

impl ExtractFacesUseCase {
    pub fn new(
        sampler: FrameSampler,
        detector: Box<dyn FaceDetector>,
        writer: Box<dyn ImageWriter>,
        settings: ExtractionSettings,
        on_progress: Option<ProgressCallback>,
    ) -> Self {
        Self {
            sampler,
            detector,
            writer,
            settings,
            on_progress,
        }
    }

    /// Returns the written face files in index order.
    ///
    /// A video that cannot be opened yields an empty list.
    pub fn execute(
        &mut self,
        video: &Path,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, ExtractError> {
        fs::create_dir_all(output_dir).map_err(|e| ExtractError::OutputDir {
            path: output_dir.to_path_buf(),
            source: e,
        })?;

        let metadata = match self.sampler.open(video) {
            Ok(metadata) => metadata,
            Err(e) => {
                log::warn!("{e}; no faces extracted");
                return Ok(Vec::new());
            }
        };
        let expected = metadata
            .expected_samples(self.sampler.frame_skip())
            .unwrap_or(0);
        log::info!(
            "Extracting faces from {} ({}x{}, {} frames, every {} sampled)",
            video.display(),
            metadata.width,
            metadata.height,
            metadata.total_frames,
            self.sampler.frame_skip()
        );

        let mut session = Session {
            detector: self.detector.as_mut(),
            writer: self.writer.as_ref(),
            settings: &self.settings,
            dedup: FaceDeduplicator::new(self.settings.dedup_distance),
            saved: Vec::new(),
            output_dir,
        };

        let mut cancelled = false;
        for (processed, frame) in self.sampler.samples().enumerate() {
            if session.is_full() {
                break;
            }
            session.process_frame(&frame);
            if let Some(ref callback) = self.on_progress {
                if !callback(processed + 1, expected) {
                    cancelled = true;
                    break;
                }
            }
        }
        let saved = session.saved;
        self.sampler.close();

        if cancelled {
            return Err(ExtractError::Cancelled);
        }
        log::info!(
            "Saved {} unique face(s) to {}",
            saved.len(),
            output_dir.display()
        );
        Ok(saved)
    }
}

/// Per-run state: the fingerprints and files accepted so far.
struct Session<'a> {
    detector: &'a mut dyn FaceDetector,
    writer: &'a dyn ImageWriter,
    settings: &'a ExtractionSettings,
    dedup: FaceDeduplicator,
    saved: Vec<PathBuf>,
    output_dir: &'a Path,
}

impl Session<'_> {
    fn is_full(&self) -> bool {
        self.saved.len() >= self.settings.max_faces
    }

    fn process_frame(&mut self, frame: &Frame) {
        let detections = match self.detector.detect(frame) {
            Ok(detections) => detections,
            Err(e) => {
                log::warn!("Detection failed on frame {}: {e}", frame.index());
                return;
            }
        };

        let threshold = self.settings.detection_confidence;
        for detection in detections.iter().filter(|d| d.confidence >= threshold) {
            if self.is_full() {
                return;
            }
            self.consider(frame, detection);
        }
    }

    fn consider(&mut self, frame: &Frame, detection: &Detection) {
        let (x1, y1, x2, y2) =
            detection.padded_bounds(self.settings.crop_padding, frame.width(), frame.height());
        let Some(crop) = frame.crop(x1, y1, x2, y2) else {
            log::debug!("Empty crop on frame {}", frame.index());
            return;
        };
        let Some(face) = crop.resize(self.settings.resize_width, self.settings.resize_height)
        else {
            return;
        };
        let Some(hash) = PerceptualHash::compute(&face) else {
            return;
        };
        if self.dedup.is_duplicate(&hash) {
            log::debug!("Duplicate face {hash} on frame {}", frame.index());
            return;
        }

        let path = self.output_dir.join(face_file_name(self.saved.len()));
        if let Err(e) = self.writer.write(&path, &face) {
            log::warn!("Failed to write {}: {e}", path.display());
            return;
        }
        log::debug!(
            "Saved {} from frame {} (confidence {:.2}, hash {hash})",
            path.display(),
            frame.index(),
            detection.confidence
        );
        self.dedup.record(hash);
        self.saved.push(path);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::extraction::domain::perceptual_hash::tests::pattern;
    use crate::sampling::frame_sampler::tests::StubReader;
    use crate::video::domain::image_reader::ImageReader;
    use crate::video::infrastructure::image_file_reader::ImageFileReader;
    use crate::video::infrastructure::image_file_writer::ImageFileWriter;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    const SIDE: u32 = 64;

    /// Returns the same detections for every frame; fails on listed calls.
    pub(crate) struct StubDetector {
        pub(crate) detections: Vec<Detection>,
        pub(crate) calls: Arc<AtomicUsize>,
        pub(crate) fail_calls: Vec<usize>,
    }

    impl FaceDetector for StubDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_calls.contains(&call) {
                return Err("inference failed".into());
            }
            Ok(self.detections.clone())
        }
    }

    /// Records writes in memory; the first `failures` writes fail.
    struct MemoryWriter {
        written: Arc<Mutex<Vec<PathBuf>>>,
        failures: Mutex<usize>,
    }

    impl ImageWriter for MemoryWriter {
        fn write(&self, path: &Path, _frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err("disk full".into());
            }
            self.written.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }
    }

    /// A frame holding the test pattern on the left and its inverse on the
    /// right, so the two halves fingerprint far apart.
    pub(crate) fn two_face_frame(index: usize) -> Frame {
        let left = pattern(SIDE, SIDE, 0);
        let mut data = Vec::with_capacity((SIDE * 2 * SIDE * 3) as usize);
        for row in left.data().chunks_exact((SIDE * 3) as usize) {
            data.extend_from_slice(row);
            data.extend(row.iter().map(|v| 255 - v));
        }
        Frame::new(data, SIDE * 2, SIDE, 3, index)
    }

    pub(crate) fn left_face(confidence: f64) -> Detection {
        Detection::new(0.0, 0.0, SIDE as f64, SIDE as f64, confidence)
    }

    pub(crate) fn right_face(confidence: f64) -> Detection {
        Detection::new(SIDE as f64, 0.0, (SIDE * 2) as f64, SIDE as f64, confidence)
    }

    pub(crate) fn settings(max_faces: usize) -> ExtractionSettings {
        ExtractionSettings {
            max_faces,
            detection_confidence: 0.55,
            crop_padding: 0.0,
            resize_width: SIDE,
            resize_height: SIDE,
            dedup_distance: 12,
        }
    }

    struct Harness {
        use_case: ExtractFacesUseCase,
        calls: Arc<AtomicUsize>,
        written: Arc<Mutex<Vec<PathBuf>>>,
    }

    fn harness(
        reader: StubReader,
        detections: Vec<Detection>,
        fail_calls: Vec<usize>,
        write_failures: usize,
        max_faces: usize,
    ) -> Harness {
        let calls = Arc::new(AtomicUsize::new(0));
        let written = Arc::new(Mutex::new(Vec::new()));
        let use_case = ExtractFacesUseCase::new(
            FrameSampler::new(Box::new(reader), 2, true),
            Box::new(StubDetector {
                detections,
                calls: calls.clone(),
                fail_calls,
            }),
            Box::new(MemoryWriter {
                written: written.clone(),
                failures: Mutex::new(write_failures),
            }),
            settings(max_faces),
            None,
        );
        Harness {
            use_case,
            calls,
            written,
        }
    }

    pub(crate) fn frames(count: usize) -> StubReader {
        StubReader::new((0..count).map(two_face_frame).collect())
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_low_confidence_detections_write_nothing() {
        let tmp = TempDir::new().unwrap();
        let faint = vec![
            left_face(0.3),
            right_face(0.54),
            Detection::new(16.0, 0.0, 80.0, 64.0, 0.1),
        ];
        let mut h = harness(frames(20), faint, vec![], 0, 8);

        let saved = h.use_case.execute(Path::new("clip.mp4"), tmp.path()).unwrap();

        assert!(saved.is_empty());
        assert_eq!(h.calls.load(Ordering::SeqCst), 10);
        assert!(h.written.lock().unwrap().is_empty());
    }

    #[test]
    fn test_confidence_exactly_at_threshold_is_kept() {
        let tmp = TempDir::new().unwrap();
        let mut h = harness(frames(2), vec![left_face(0.55)], vec![], 0, 8);
        let saved = h.use_case.execute(Path::new("clip.mp4"), tmp.path()).unwrap();
        assert_eq!(names(&saved), vec!["face_0000.jpg"]);
    }

    #[test]
    fn test_repeated_face_is_saved_once() {
        let tmp = TempDir::new().unwrap();
        let mut h = harness(frames(10), vec![left_face(0.9)], vec![], 0, 8);

        let saved = h.use_case.execute(Path::new("clip.mp4"), tmp.path()).unwrap();

        assert_eq!(names(&saved), vec!["face_0000.jpg"]);
        assert_eq!(h.calls.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_distinct_faces_get_sequential_names() {
        let tmp = TempDir::new().unwrap();
        let mut h = harness(
            frames(6),
            vec![left_face(0.9), right_face(0.8)],
            vec![],
            0,
            8,
        );

        let saved = h.use_case.execute(Path::new("clip.mp4"), tmp.path()).unwrap();

        assert_eq!(names(&saved), vec!["face_0000.jpg", "face_0001.jpg"]);
        assert_eq!(saved[0].parent(), Some(tmp.path()));
        assert_eq!(*h.written.lock().unwrap(), saved);
    }

    #[test]
    fn test_cap_stops_mid_frame_and_skips_remaining_frames() {
        let tmp = TempDir::new().unwrap();
        let mut h = harness(
            frames(10),
            vec![left_face(0.9), right_face(0.9)],
            vec![],
            0,
            1,
        );

        let saved = h.use_case.execute(Path::new("clip.mp4"), tmp.path()).unwrap();

        assert_eq!(names(&saved), vec!["face_0000.jpg"]);
        assert_eq!(h.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_write_is_not_recorded() {
        let tmp = TempDir::new().unwrap();
        let mut h = harness(frames(4), vec![left_face(0.9)], vec![], 1, 8);

        let saved = h.use_case.execute(Path::new("clip.mp4"), tmp.path()).unwrap();

        // The first attempt fails; the same face on the next frame is saved
        // under the first index.
        assert_eq!(names(&saved), vec!["face_0000.jpg"]);
        assert_eq!(h.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_detector_error_skips_only_that_frame() {
        let tmp = TempDir::new().unwrap();
        let mut h = harness(frames(4), vec![left_face(0.9)], vec![0], 0, 8);

        let saved = h.use_case.execute(Path::new("clip.mp4"), tmp.path()).unwrap();

        assert_eq!(saved.len(), 1);
        assert_eq!(h.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_detection_outside_frame_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let outside = Detection::new(500.0, 500.0, 600.0, 600.0, 0.9);
        let mut h = harness(frames(2), vec![outside], vec![], 0, 8);
        assert!(h
            .use_case
            .execute(Path::new("clip.mp4"), tmp.path())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_unopenable_source_yields_no_faces() {
        let tmp = TempDir::new().unwrap();
        let mut h = harness(StubReader::unopenable(), vec![left_face(0.9)], vec![], 0, 8);

        let saved = h.use_case.execute(Path::new("missing.mp4"), tmp.path()).unwrap();

        assert!(saved.is_empty());
        assert_eq!(h.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_uncreatable_output_dir_is_error() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("file");
        fs::write(&blocker, b"").unwrap();
        let mut h = harness(frames(2), vec![left_face(0.9)], vec![], 0, 8);

        let result = h.use_case.execute(Path::new("clip.mp4"), &blocker.join("faces"));

        assert!(matches!(result, Err(ExtractError::OutputDir { .. })));
    }

    #[test]
    fn test_progress_callback_can_cancel() {
        let tmp = TempDir::new().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in_callback = seen.clone();
        let mut h = harness(frames(10), vec![left_face(0.3)], vec![], 0, 8);
        h.use_case.on_progress = Some(Box::new(move |done, total| {
            seen_in_callback.lock().unwrap().push((done, total));
            done < 2
        }));

        let result = h.use_case.execute(Path::new("clip.mp4"), tmp.path());

        assert!(matches!(result, Err(ExtractError::Cancelled)));
        assert_eq!(*seen.lock().unwrap(), vec![(1, 5), (2, 5)]);
    }

    #[test]
    fn test_writes_real_files_and_reruns_identically() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("faces");
        let run = || {
            let mut use_case = ExtractFacesUseCase::new(
                FrameSampler::new(Box::new(frames(4)), 2, true),
                Box::new(StubDetector {
                    detections: vec![left_face(0.9), right_face(0.9)],
                    calls: Arc::new(AtomicUsize::new(0)),
                    fail_calls: vec![],
                }),
                Box::new(ImageFileWriter::new()),
                settings(8),
                None,
            );
            use_case.execute(Path::new("clip.mp4"), &out).unwrap()
        };

        let first = run();
        let second = run();

        assert_eq!(first, second);
        assert_eq!(names(&first), vec!["face_0000.jpg", "face_0001.jpg"]);
        assert!(first.iter().all(|p| p.is_file()));
        assert_eq!(fs::read_dir(&out).unwrap().count(), 2);

        // The saved JPEG still fingerprints as the crop it came from.
        let stored = ImageFileReader::new().read(&first[0]).unwrap();
        let mut dedup = FaceDeduplicator::new(settings(8).dedup_distance);
        dedup.record(PerceptualHash::compute(&pattern(SIDE, SIDE, 0)).unwrap());
        assert!(dedup.is_duplicate(&PerceptualHash::compute(&stored).unwrap()));
    }
}
