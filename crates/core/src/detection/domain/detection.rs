/// Default fraction of the box size added on each side before cropping.
pub const DEFAULT_CROP_PADDING: f64 = 0.20;

/// A face bounding box in frame pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub confidence: f64,
}

impl Detection {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64, confidence: f64) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            confidence,
        }
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    /// Grows the box by `padding` of its width/height on every side and
    /// clamps it to the frame, returning integer `(x1, y1, x2, y2)`.
    ///
    /// Coordinates are truncated, so the result may be empty for boxes that
    /// lie entirely outside the frame.
    pub fn padded_bounds(&self, padding: f64, frame_w: u32, frame_h: u32) -> (u32, u32, u32, u32) {
        let pad_x = self.width() * padding;
        let pad_y = self.height() * padding;
        let clamp = |v: f64, max: u32| (v as i64).clamp(0, max as i64) as u32;
        (
            clamp(self.x1 - pad_x, frame_w),
            clamp(self.y1 - pad_y, frame_h),
            clamp(self.x2 + pad_x, frame_w),
            clamp(self.y2 + pad_y, frame_h),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_dimensions() {
        let d = Detection::new(10.0, 20.0, 50.0, 100.0, 0.9);
        assert_relative_eq!(d.width(), 40.0);
        assert_relative_eq!(d.height(), 80.0);
    }

    #[test]
    fn test_padded_bounds_expands_twenty_percent() {
        // 100x50 box → 20px horizontal, 10px vertical padding
        let d = Detection::new(100.0, 100.0, 200.0, 150.0, 0.9);
        assert_eq!(
            d.padded_bounds(DEFAULT_CROP_PADDING, 640, 480),
            (80, 90, 220, 160)
        );
    }

    #[test]
    fn test_padded_bounds_clamps_to_frame() {
        let d = Detection::new(5.0, 2.0, 95.0, 98.0, 0.9);
        assert_eq!(d.padded_bounds(0.2, 100, 100), (0, 0, 100, 100));
    }

    #[test]
    fn test_padded_bounds_zero_padding_is_tight() {
        let d = Detection::new(10.7, 20.2, 30.9, 40.5, 0.9);
        assert_eq!(d.padded_bounds(0.0, 100, 100), (10, 20, 30, 40));
    }

    #[test]
    fn test_padded_bounds_outside_frame_is_empty() {
        let d = Detection::new(200.0, 200.0, 220.0, 220.0, 0.9);
        let (x1, _, x2, _) = d.padded_bounds(0.2, 100, 100);
        assert_eq!(x1, x2);
    }
}
