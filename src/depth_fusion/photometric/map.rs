use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult};
use tracing::{debug, info};

use crate::depth_fusion::common::{FusionError, Image, Result};

/// Normalized per-pixel gain of one camera view, values in `[0, 1]`.
///
/// Loaded once at startup and shared read-only by every frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotometricMap {
    gain: Image,
}

impl PhotometricMap {
    /// Builds a map from row-major gain values; values are clamped to `[0, 1]`
    /// and NaN becomes 0.
    pub fn from_gain(width: usize, height: usize, gain: Vec<f32>) -> Result<Self> {
        let gain = gain
            .into_iter()
            .map(|g| if g.is_nan() { 0.0 } else { g.clamp(0.0, 1.0) })
            .collect();
        Ok(Self {
            gain: Image::new(width, height, 1, gain)?,
        })
    }

    pub fn uniform(width: usize, height: usize, value: f32) -> Self {
        Self {
            gain: Image {
                width,
                height,
                channels: 1,
                data: vec![value.clamp(0.0, 1.0); width * height],
            },
        }
    }

    /// Reads a grayscale calibration image.
    ///
    /// TIFF files go through the `tiff` decoder so 16-bit and float maps keep
    /// their precision (`u8 / 255`, `u16 / 65535`, floats as stored). Any other
    /// format is decoded to 8-bit luminance and scaled by `1 / 255`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let is_tiff = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "tif" | "tiff"))
            .unwrap_or(false);

        let map = if is_tiff {
            Self::load_tiff(path)?
        } else {
            Self::load_image(path)?
        };

        info!(
            path = %path.display(),
            width = map.width(),
            height = map.height(),
            "Loaded photometric map"
        );
        Ok(map)
    }

    fn load_tiff(path: &Path) -> Result<Self> {
        let config_err = |e: &dyn std::fmt::Display| {
            FusionError::ConfigError(format!("photometric map {}: {}", path.display(), e))
        };

        let file = File::open(path).map_err(|e| config_err(&e))?;
        let mut decoder = Decoder::new(BufReader::new(file)).map_err(|e| config_err(&e))?;
        let (width, height) = decoder.dimensions().map_err(|e| config_err(&e))?;
        let color_type = decoder.colortype().map_err(|e| config_err(&e))?;
        if !matches!(color_type, tiff::ColorType::Gray(_)) {
            return Err(config_err(&format!(
                "expected a single-channel image, got {:?}",
                color_type
            )));
        }

        debug!(width, height, ?color_type, "Decoding photometric TIFF");

        let gain: Vec<f32> = match decoder.read_image().map_err(|e| config_err(&e))? {
            DecodingResult::U8(values) => values.iter().map(|&v| f32::from(v) / 255.0).collect(),
            DecodingResult::U16(values) => {
                values.iter().map(|&v| f32::from(v) / 65535.0).collect()
            }
            DecodingResult::F32(values) => values,
            DecodingResult::F64(values) => values.iter().map(|&v| v as f32).collect(),
            _ => return Err(config_err(&"unsupported sample format")),
        };

        Self::from_gain(width as usize, height as usize, gain)
    }

    fn load_image(path: &Path) -> Result<Self> {
        let decoded = image::open(path).map_err(|e| {
            FusionError::ConfigError(format!("photometric map {}: {}", path.display(), e))
        })?;
        let luma = decoded.to_luma8();
        let (width, height) = (luma.width() as usize, luma.height() as usize);
        let gain = luma.as_raw().iter().map(|&v| f32::from(v) / 255.0).collect();
        Self::from_gain(width, height, gain)
    }

    pub fn width(&self) -> usize {
        self.gain.width
    }

    pub fn height(&self) -> usize {
        self.gain.height
    }

    pub fn dims(&self) -> (usize, usize) {
        self.gain.dims()
    }

    /// Row-major gain values.
    pub fn gain(&self) -> &[f32] {
        &self.gain.data
    }
}
