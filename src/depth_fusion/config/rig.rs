//! Camera rig description

use std::path::PathBuf;

use crate::depth_fusion::common::{FusionError, Result};
use crate::depth_fusion::config::types::FusionConfig;
use crate::depth_fusion::depth::RESERVED_GENERATORS;

/// One overlapping camera pair of the rig.
#[derive(Debug, Clone, PartialEq)]
pub struct PairDescriptor {
    /// Position in the rig's pair list
    pub index: usize,
    /// View index of the first camera
    pub left: usize,
    /// View index of the second camera
    pub right: usize,
    /// Fisheye field of view, in degrees
    pub fov_deg: f32,
    /// Stereo calibration of the pair
    pub calibration: PathBuf,
}

/// Ordered camera pairs plus the image size the estimator works at.
///
/// Built once at startup and never modified afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct RigConfiguration {
    pub fisheye_config: PathBuf,
    pub pairs: Vec<PairDescriptor>,
    /// Number of camera views in a composite frame
    pub view_count: usize,
    pub width: usize,
    pub height: usize,
}

impl RigConfiguration {
    /// Derives one pair per stereo calibration path.
    ///
    /// Pair `i` joins view `(i + 1) % n` with view `i`, the ring of
    /// neighbouring fisheyes named by `stereo_calib_{i+1}_{i}`.
    pub fn from_config(config: &FusionConfig) -> Self {
        let view_count = config.layout.view_count();
        let pairs = config
            .stereo_paths
            .iter()
            .enumerate()
            .map(|(index, calibration)| PairDescriptor {
                index,
                left: (index + 1) % view_count.max(1),
                right: index % view_count.max(1),
                fov_deg: config.fov_deg,
                calibration: calibration.clone(),
            })
            .collect();

        Self {
            fisheye_config: config.fisheye_config.clone(),
            pairs,
            view_count,
            width: config.width,
            height: config.height,
        }
    }

    /// Pairs the estimator is actually invoked for; the first
    /// [`RESERVED_GENERATORS`] entries are skipped.
    pub fn active_pairs(&self) -> &[PairDescriptor] {
        &self.pairs[RESERVED_GENERATORS.min(self.pairs.len())..]
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(FusionError::ConfigError(format!(
                "estimator image size {}x{} must be non-zero",
                self.width, self.height
            )));
        }
        if self.view_count == 0 {
            return Err(FusionError::ConfigError("rig has no camera views".to_string()));
        }

        for pair in &self.pairs {
            if !(pair.fov_deg > 0.0 && pair.fov_deg <= 360.0) {
                return Err(FusionError::ConfigError(format!(
                    "pair {} field of view {} outside (0, 360]",
                    pair.index, pair.fov_deg
                )));
            }
            if pair.left >= self.view_count || pair.right >= self.view_count {
                return Err(FusionError::ConfigError(format!(
                    "pair {} references views {} and {}, rig has {}",
                    pair.index, pair.left, pair.right, self.view_count
                )));
            }
            if pair.left == pair.right {
                return Err(FusionError::ConfigError(format!(
                    "pair {} joins view {} with itself",
                    pair.index, pair.left
                )));
            }
        }

        if self.active_pairs().is_empty() {
            return Err(FusionError::ConfigError(format!(
                "rig has {} pair(s) but the first {} are reserved",
                self.pairs.len(),
                RESERVED_GENERATORS
            )));
        }
        Ok(())
    }
}
