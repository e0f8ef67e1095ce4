use std::path::PathBuf;

/// Stream properties reported when a video source is opened.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Container-reported frame count; 0 when unknown.
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    /// Number of frames a sampler keeping every `skip`-th frame will emit,
    /// or `None` when the container doesn't report a frame count.
    pub fn expected_samples(&self, skip: usize) -> Option<usize> {
        (self.total_frames > 0).then(|| self.total_frames / skip.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(total_frames: usize) -> VideoMetadata {
        VideoMetadata {
            width: 1920,
            height: 1080,
            fps: 30.0,
            total_frames,
            codec: "h264".to_string(),
            source_path: Some(PathBuf::from("/tmp/test.mp4")),
        }
    }

    #[test]
    fn test_expected_samples() {
        assert_eq!(metadata(20).expected_samples(2), Some(10));
        assert_eq!(metadata(21).expected_samples(2), Some(10));
        assert_eq!(metadata(5).expected_samples(1), Some(5));
    }

    #[test]
    fn test_expected_samples_zero_skip_treated_as_one() {
        assert_eq!(metadata(5).expected_samples(0), Some(5));
    }

    #[test]
    fn test_expected_samples_unknown_total() {
        assert_eq!(metadata(0).expected_samples(2), None);
    }
}
