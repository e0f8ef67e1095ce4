use super::perceptual_hash::PerceptualHash;

/// Default maximum fingerprint distance at which two crops count as the same face.
pub const DEFAULT_DEDUP_DISTANCE: u32 = 12;

/// Fingerprints of the crops already accepted in one extraction session.
///
/// A candidate is a duplicate when it lies within `max_distance` bits of
/// any accepted fingerprint, inclusive. Callers record a fingerprint only
/// once its crop has been persisted.
#[derive(Debug)]
pub struct FaceDeduplicator {
    max_distance: u32,
    accepted: Vec<PerceptualHash>,
}

impl FaceDeduplicator {
    pub fn new(max_distance: u32) -> Self {
        Self {
            max_distance,
            accepted: Vec::new(),
        }
    }

    pub fn is_duplicate(&self, hash: &PerceptualHash) -> bool {
        self.accepted
            .iter()
            .any(|seen| seen.distance(hash) <= self.max_distance)
    }

    pub fn record(&mut self, hash: PerceptualHash) {
        self.accepted.push(hash);
    }
}

impl Default for FaceDeduplicator {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_DISTANCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::domain::perceptual_hash::tests::pattern;
    use crate::shared::frame::Frame;
    use image::codecs::jpeg::JpegEncoder;
    use rstest::rstest;

    /// Hash with the lowest `n` bits set, i.e. `n` bits away from zero.
    fn bits_set(n: u32) -> PerceptualHash {
        PerceptualHash::from_bits(if n == 64 { u64::MAX } else { (1u64 << n) - 1 })
    }

    #[test]
    fn test_empty_session_accepts_anything() {
        let dedup = FaceDeduplicator::default();
        assert!(!dedup.is_duplicate(&bits_set(0)));
    }

    #[rstest]
    #[case(0, true)]
    #[case(11, true)]
    #[case(12, true)]
    #[case(13, false)]
    #[case(40, false)]
    fn test_threshold_boundary_is_inclusive(#[case] distance: u32, #[case] duplicate: bool) {
        let mut dedup = FaceDeduplicator::new(12);
        dedup.record(bits_set(0));
        assert_eq!(dedup.is_duplicate(&bits_set(distance)), duplicate);
    }

    #[test]
    fn test_compares_against_every_accepted_hash() {
        let mut dedup = FaceDeduplicator::new(12);
        dedup.record(bits_set(0));
        dedup.record(bits_set(40));
        assert!(dedup.is_duplicate(&bits_set(35)));
        assert!(!dedup.is_duplicate(&bits_set(20)));
    }

    #[test]
    fn test_zero_threshold_only_rejects_exact_matches() {
        let mut dedup = FaceDeduplicator::new(0);
        dedup.record(bits_set(5));
        assert!(dedup.is_duplicate(&bits_set(5)));
        assert!(!dedup.is_duplicate(&bits_set(6)));
    }

    #[rstest]
    #[case(95)]
    #[case(75)]
    fn test_jpeg_recompressed_crop_is_duplicate(#[case] quality: u8) {
        let crop = pattern(128, 128, 0);
        let mut jpeg = Vec::new();
        crop.to_rgb_image()
            .unwrap()
            .write_with_encoder(JpegEncoder::new_with_quality(&mut jpeg, quality))
            .unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap().to_rgb8();
        let recompressed = Frame::from_rgb_image(decoded, 0);

        let mut dedup = FaceDeduplicator::default();
        dedup.record(PerceptualHash::compute(&crop).unwrap());
        assert!(dedup.is_duplicate(&PerceptualHash::compute(&recompressed).unwrap()));
    }
}
