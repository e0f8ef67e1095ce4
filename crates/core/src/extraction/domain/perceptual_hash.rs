use std::f64::consts::PI;
use std::fmt;

use crate::shared::frame::Frame;

/// Side of the grayscale thumbnail the DCT runs on.
const SAMPLE_SIZE: usize = 32;
/// Side of the low-frequency block that becomes the hash.
const HASH_SIZE: usize = 8;

/// 64-bit DCT perceptual fingerprint of an image.
///
/// Visually similar images produce hashes with a small Hamming distance,
/// so re-encoded or slightly shifted copies of the same face crop land
/// within a few bits of each other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PerceptualHash(u64);

impl PerceptualHash {
    pub fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u64 {
        self.0
    }

    /// Fingerprints an RGB frame.
    ///
    /// The frame is reduced to BT.601 luma, Lanczos-resampled to 32x32 and
    /// transformed with a 2D DCT-II. Each coefficient of the top-left 8x8
    /// block sets its bit when it exceeds the block median. Returns `None`
    /// for frames that aren't RGB or have no pixels.
    pub fn compute(frame: &Frame) -> Option<Self> {
        if frame.channels() != 3 || frame.width() == 0 || frame.height() == 0 {
            return None;
        }
        let luma: Vec<u8> = frame
            .data()
            .chunks_exact(3)
            .map(|px| {
                let (r, g, b) = (px[0] as u32, px[1] as u32, px[2] as u32);
                ((r * 299 + g * 587 + b * 114) / 1000) as u8
            })
            .collect();
        let gray = image::GrayImage::from_raw(frame.width(), frame.height(), luma)?;
        let small = image::imageops::resize(
            &gray,
            SAMPLE_SIZE as u32,
            SAMPLE_SIZE as u32,
            image::imageops::FilterType::Lanczos3,
        );

        let pixels: Vec<f64> = small.as_raw().iter().map(|&v| v as f64).collect();
        let coeffs = dct_2d_low(&pixels);

        let mut sorted = coeffs.clone();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        let median = (sorted[mid - 1] + sorted[mid]) / 2.0;

        let bits = coeffs
            .iter()
            .fold(0u64, |acc, &c| (acc << 1) | u64::from(c > median));
        Some(Self(bits))
    }

    /// Number of differing bits.
    pub fn distance(&self, other: &PerceptualHash) -> u32 {
        (self.0 ^ other.0).count_ones()
    }
}

impl fmt::Display for PerceptualHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Separable DCT-II over a `SAMPLE_SIZE`² row-major block, returning only
/// the `HASH_SIZE`² lowest frequencies in row-major order.
fn dct_2d_low(pixels: &[f64]) -> Vec<f64> {
    let n = SAMPLE_SIZE;
    let cos_table: Vec<f64> = (0..HASH_SIZE)
        .flat_map(|k| {
            (0..n).map(move |i| (PI * k as f64 * (2 * i + 1) as f64 / (2 * n) as f64).cos())
        })
        .collect();
    let basis = |k: usize, i: usize| cos_table[k * n + i];

    // Along columns: rows[k][x] = sum_y pixels[y][x] * cos(k, y)
    let mut rows = vec![0.0; HASH_SIZE * n];
    for k in 0..HASH_SIZE {
        for x in 0..n {
            rows[k * n + x] = (0..n).map(|y| pixels[y * n + x] * basis(k, y)).sum();
        }
    }

    // Along rows: out[u][v] = sum_x rows[u][x] * cos(v, x)
    let mut out = Vec::<f64>::with_capacity(HASH_SIZE * HASH_SIZE);
    for u in 0..HASH_SIZE {
        for v in 0..HASH_SIZE {
            out.push((0..n).map(|x| rows[u * n + x] * basis(v, x)).sum());
        }
    }
    out
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Smooth diagonal gradient with a bright blob, so the low frequencies
    /// carry real structure.
    pub(crate) fn pattern(width: u32, height: u32, shift: u8) -> Frame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                let gradient = ((x + y) * 255 / (width + height)) as u8;
                let dx = x as i32 - width as i32 / 3;
                let dy = y as i32 - height as i32 / 3;
                let blob = if dx * dx + dy * dy < (width as i32 / 5).pow(2) { 90 } else { 0 };
                let v = gradient.saturating_add(blob).saturating_add(shift);
                data.extend_from_slice(&[v, v / 2, 255 - v]);
            }
        }
        Frame::new(data, width, height, 3, 0)
    }

    #[test]
    fn test_identical_frames_hash_identically() {
        let a = PerceptualHash::compute(&pattern(64, 64, 0)).unwrap();
        let b = PerceptualHash::compute(&pattern(64, 64, 0)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.distance(&b), 0);
    }

    #[test]
    fn test_small_brightness_change_stays_close() {
        let a = PerceptualHash::compute(&pattern(64, 64, 0)).unwrap();
        let b = PerceptualHash::compute(&pattern(64, 64, 3)).unwrap();
        assert!(a.distance(&b) <= 12, "distance {}", a.distance(&b));
    }

    #[test]
    fn test_rescaled_copy_stays_close() {
        let a = PerceptualHash::compute(&pattern(64, 64, 0)).unwrap();
        let b = PerceptualHash::compute(&pattern(64, 64, 0).resize(200, 200).unwrap()).unwrap();
        assert!(a.distance(&b) <= 12, "distance {}", a.distance(&b));
    }

    #[test]
    fn test_inverted_image_is_far_apart() {
        let frame = pattern(64, 64, 0);
        let inverted: Vec<u8> = frame.data().iter().map(|v| 255 - v).collect();
        let inverted = Frame::new(inverted, 64, 64, 3, 0);

        let a = PerceptualHash::compute(&frame).unwrap();
        let b = PerceptualHash::compute(&inverted).unwrap();
        assert!(a.distance(&b) > 40, "distance {}", a.distance(&b));
    }

    #[test]
    fn test_distance_counts_differing_bits() {
        let a = PerceptualHash::from_bits(0);
        assert_eq!(a.distance(&PerceptualHash::from_bits(0b1011)), 3);
        assert_eq!(a.distance(&PerceptualHash::from_bits(u64::MAX)), 64);
        let b = PerceptualHash::from_bits(0xF0F0);
        assert_eq!(b.distance(&a), a.distance(&b));
    }

    #[test]
    fn test_non_rgb_frame_has_no_hash() {
        let gray = Frame::new(vec![0u8; 16], 4, 4, 1, 0);
        assert!(PerceptualHash::compute(&gray).is_none());
    }

    #[test]
    fn test_display_is_fixed_width_hex() {
        assert_eq!(PerceptualHash::from_bits(0xab).to_string(), "00000000000000ab");
    }

    #[test]
    fn test_dct_of_flat_block_has_energy_only_in_dc() {
        let coeffs = dct_2d_low(&vec![10.0; SAMPLE_SIZE * SAMPLE_SIZE]);
        assert!((coeffs[0] - 10.0 * (SAMPLE_SIZE * SAMPLE_SIZE) as f64).abs() < 1e-6);
        assert!(coeffs[1..].iter().all(|c| c.abs() < 1e-6));
    }
}
