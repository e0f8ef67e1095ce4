use ndarray::ArrayView3;

/// A single video/image frame: contiguous pixel bytes in row-major order.
///
/// Pipeline stages expect 3-channel RGB; [`Frame::to_rgb`] coerces other
/// channel layouts at the sampling boundary.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    /// Wraps a decoded RGB image.
    pub fn from_rgb_image(img: image::RgbImage, index: usize) -> Self {
        let (width, height) = img.dimensions();
        Self::new(img.into_raw(), width, height, 3, index)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_portrait(&self) -> bool {
        self.height > self.width
    }

    /// Returns `None` unless the frame is 3-channel with consistent data.
    pub fn as_ndarray(&self) -> Option<ArrayView3<'_, u8>> {
        ArrayView3::from_shape(self.shape(), &self.data).ok()
    }

    /// Converts to an `image` buffer. Returns `None` for non-RGB frames.
    pub fn to_rgb_image(&self) -> Option<image::RgbImage> {
        if self.channels != 3 {
            return None;
        }
        image::RgbImage::from_raw(self.width, self.height, self.data.clone())
    }

    /// Coerces the frame to 3-channel RGB.
    ///
    /// Grayscale is replicated, gray+alpha and RGBA drop their alpha channel.
    /// Any other layout (or a buffer that doesn't match its dimensions)
    /// cannot be coerced and yields `None`.
    pub fn to_rgb(&self) -> Option<Frame> {
        let pixels = self.width as usize * self.height as usize;
        if self.data.len() != pixels * self.channels as usize {
            return None;
        }
        let data = match self.channels {
            3 => self.data.clone(),
            1 => self.data.iter().flat_map(|&v| [v, v, v]).collect(),
            2 => self
                .data
                .chunks_exact(2)
                .flat_map(|px| [px[0], px[0], px[0]])
                .collect(),
            4 => self
                .data
                .chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect(),
            _ => return None,
        };
        Some(Frame::new(data, self.width, self.height, 3, self.index))
    }

    /// Copies the pixels inside `[x1, x2) x [y1, y2)`, clamped to the frame.
    ///
    /// Returns `None` when the clamped rectangle is empty.
    pub fn crop(&self, x1: u32, y1: u32, x2: u32, y2: u32) -> Option<Frame> {
        let x2 = x2.min(self.width);
        let y2 = y2.min(self.height);
        if x1 >= x2 || y1 >= y2 {
            return None;
        }

        let channels = self.channels as usize;
        let row_len = self.width as usize * channels;
        let crop_w = (x2 - x1) as usize;
        let crop_h = (y2 - y1) as usize;
        let mut data = Vec::with_capacity(crop_w * crop_h * channels);
        for row in y1 as usize..y2 as usize {
            let start = row * row_len + x1 as usize * channels;
            data.extend_from_slice(&self.data[start..start + crop_w * channels]);
        }

        Some(Frame::new(
            data,
            crop_w as u32,
            crop_h as u32,
            self.channels,
            self.index,
        ))
    }

    /// Resizes with a triangle filter. Returns `None` for non-RGB frames.
    pub fn resize(&self, width: u32, height: u32) -> Option<Frame> {
        let img = self.to_rgb_image()?;
        let resized =
            image::imageops::resize(&img, width, height, image::imageops::FilterType::Triangle);
        Some(Frame::from_rgb_image(resized, self.index))
    }

    /// Rotates 90 degrees clockwise. Returns `None` for non-RGB frames.
    pub fn rotate_cw(&self) -> Option<Frame> {
        let img = self.to_rgb_image()?;
        Some(Frame::from_rgb_image(image::imageops::rotate90(&img), self.index))
    }

    /// Rotates 90 degrees counter-clockwise.
    pub fn rotate_ccw(&self) -> Option<Frame> {
        let img = self.to_rgb_image()?;
        Some(Frame::from_rgb_image(image::imageops::rotate270(&img), self.index))
    }

    pub fn rotate_180(&self) -> Option<Frame> {
        let img = self.to_rgb_image()?;
        Some(Frame::from_rgb_image(image::imageops::rotate180(&img), self.index))
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
