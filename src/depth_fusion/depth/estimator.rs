use crate::depth_fusion::cloud::{Color, Point3};
use crate::depth_fusion::common::SubImage;
use crate::depth_fusion::config::RigConfiguration;

/// Stereo depth backend run once per camera pair.
///
/// `corrected` views drive matching, `raw` views supply color. Both slices
/// are indexed by view number. Returned points must already be expressed in
/// the shared output frame, one color per point.
pub trait DepthEstimator: Send + Sync {
    /// Per-pair calibration and model handle produced by a [`CalibrationLoader`].
    type Generator: Send + Sync;

    fn estimate(
        &self,
        generator: &Self::Generator,
        corrected: &[SubImage],
        raw: &[SubImage],
        verbose: bool,
    ) -> anyhow::Result<(Vec<Point3>, Vec<Color>)>;
}

/// Builds one generator per rig pair, in pair order.
pub trait CalibrationLoader {
    type Generator;

    fn load_config(&self, rig: &RigConfiguration) -> anyhow::Result<Vec<Self::Generator>>;
}
