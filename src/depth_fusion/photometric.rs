//! Photometric correction module
//!
//! Loads the per-pixel gain map produced by photometric calibration and
//! divides it out of each camera view before depth matching.

mod corrector;
mod map;

pub use corrector::{correct, correct_with_floor, PhotometricCorrector, DEFAULT_GAIN_FLOOR};
pub use map::PhotometricMap;
