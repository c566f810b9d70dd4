use std::sync::Arc;

use tracing::debug;

use crate::depth_fusion::common::{FusionError, Result, SubImage};
use crate::depth_fusion::photometric::map::PhotometricMap;

/// Smallest gain a pixel is divided by. Dead or masked map pixels would
/// otherwise blow up to infinity.
pub const DEFAULT_GAIN_FLOOR: f32 = 1e-3;

/// Undoes vignetting using a shared [`PhotometricMap`].
#[derive(Debug, Clone)]
pub struct PhotometricCorrector {
    map: Option<Arc<PhotometricMap>>,
    floor: f32,
}

impl Default for PhotometricCorrector {
    fn default() -> Self {
        Self::new(None)
    }
}

impl PhotometricCorrector {
    pub fn new(map: Option<Arc<PhotometricMap>>) -> Self {
        Self {
            map,
            floor: DEFAULT_GAIN_FLOOR,
        }
    }

    pub fn with_floor(mut self, floor: f32) -> Self {
        self.floor = floor.max(f32::MIN_POSITIVE);
        self
    }

    /// Returns a corrected copy of `image`, see [`correct_with_floor`].
    pub fn correct(&self, image: &SubImage) -> Result<SubImage> {
        correct_with_floor(image, self.map.as_deref(), self.floor)
    }

    /// Corrects every view in order.
    pub fn correct_all(&self, images: &[SubImage]) -> Result<Vec<SubImage>> {
        images.iter().map(|image| self.correct(image)).collect()
    }
}

/// Corrects one view with the default gain floor.
pub fn correct(image: &SubImage, map: Option<&PhotometricMap>) -> Result<SubImage> {
    correct_with_floor(image, map, DEFAULT_GAIN_FLOOR)
}

/// Returns a corrected copy of `image`.
///
/// Without a map the copy is identical to the input. With a map the view is
/// reduced to grayscale and every pixel is divided by `max(gain, floor)`; no
/// upper clamp is applied.
pub fn correct_with_floor(
    image: &SubImage,
    map: Option<&PhotometricMap>,
    floor: f32,
) -> Result<SubImage> {
    let Some(map) = map else {
        return Ok(image.clone());
    };

    if map.dims() != image.dims() {
        return Err(FusionError::dims_mismatch(
            "photometric correction",
            map.dims(),
            image.dims(),
        ));
    }

    let mut gray = image.to_gray()?;
    for (value, &gain) in gray.data.iter_mut().zip(map.gain()) {
        *value /= gain.max(floor);
    }

    debug!(
        width = gray.width,
        height = gray.height,
        floor,
        "Applied photometric correction"
    );
    Ok(gray)
}
