//! Pixel buffer shared by every pipeline stage

use crate::depth_fusion::common::error::{FusionError, Result};

/// Interleaved `f32` pixel buffer.
///
/// Samples keep the value range of the source encoding (0-255 for 8-bit
/// frames, 0-65535 for 16-bit ones); nothing is renormalized. Three and four
/// channel buffers are in capture order, which is BGR(A) for every decoded
/// frame except passthrough `rgb8`/`rgba8`.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    /// Width of the image in pixels
    pub width: usize,
    /// Height of the image in pixels
    pub height: usize,
    /// Interleaved samples per pixel
    pub channels: usize,
    /// Row-major samples, `width * height * channels` long
    pub data: Vec<f32>,
}

/// One logical camera view cropped out of a composite frame.
pub type SubImage = Image;

/// OpenCV `BGR2GRAY` weights, blue first.
const GRAY_WEIGHTS_BGR: [f32; 3] = [0.114, 0.587, 0.299];

impl Image {
    pub fn new(width: usize, height: usize, channels: usize, data: Vec<f32>) -> Result<Self> {
        if channels == 0 {
            return Err(FusionError::shape("image channels", "at least 1", 0));
        }
        let expected = width * height * channels;
        if data.len() != expected {
            return Err(FusionError::shape("image buffer length", expected, data.len()));
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    pub fn zeros(width: usize, height: usize, channels: usize) -> Self {
        Self {
            width,
            height,
            channels,
            data: vec![0.0; width * height * channels],
        }
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn pixel(&self, x: usize, y: usize) -> &[f32] {
        let start = (y * self.width + x) * self.channels;
        &self.data[start..start + self.channels]
    }

    fn row(&self, y: usize) -> &[f32] {
        let stride = self.width * self.channels;
        &self.data[y * stride..(y + 1) * stride]
    }

    /// Copies out the `width x height` region whose top-left corner is `(x0, y0)`.
    pub fn crop(&self, x0: usize, y0: usize, width: usize, height: usize) -> Result<Image> {
        if x0 + width > self.width || y0 + height > self.height {
            return Err(FusionError::shape(
                "crop region",
                format!("within {}x{}", self.width, self.height),
                format!("{}x{} at ({}, {})", width, height, x0, y0),
            ));
        }

        let mut data = Vec::with_capacity(width * height * self.channels);
        for y in y0..y0 + height {
            let row = self.row(y);
            data.extend_from_slice(&row[x0 * self.channels..(x0 + width) * self.channels]);
        }

        Ok(Image {
            width,
            height,
            channels: self.channels,
            data,
        })
    }

    /// Writes `src` into this image with its top-left corner at `(x0, y0)`.
    pub fn paste(&mut self, src: &Image, x0: usize, y0: usize) -> Result<()> {
        if src.channels != self.channels {
            return Err(FusionError::shape("paste channels", self.channels, src.channels));
        }
        if x0 + src.width > self.width || y0 + src.height > self.height {
            return Err(FusionError::shape(
                "paste region",
                format!("within {}x{}", self.width, self.height),
                format!("{}x{} at ({}, {})", src.width, src.height, x0, y0),
            ));
        }

        let stride = self.width * self.channels;
        for y in 0..src.height {
            let start = (y0 + y) * stride + x0 * self.channels;
            self.data[start..start + src.width * self.channels].copy_from_slice(src.row(y));
        }
        Ok(())
    }

    /// Single-channel luminance image.
    ///
    /// Three and four channel input is treated as BGR(A); alpha is ignored.
    /// Results are rounded so 8-bit sources stay on integer levels.
    pub fn to_gray(&self) -> Result<Image> {
        let data = match self.channels {
            1 => self.data.clone(),
            3 | 4 => self
                .data
                .chunks_exact(self.channels)
                .map(|px| {
                    (px[0] * GRAY_WEIGHTS_BGR[0]
                        + px[1] * GRAY_WEIGHTS_BGR[1]
                        + px[2] * GRAY_WEIGHTS_BGR[2])
                        .round()
                })
                .collect(),
            other => return Err(FusionError::shape("grayscale conversion channels", "1, 3 or 4", other)),
        };

        Ok(Image {
            width: self.width,
            height: self.height,
            channels: 1,
            data,
        })
    }
}
