//! Constant-range preview backend.
//!
//! Places the texture of each pair's first view on a sphere of fixed radius
//! around the rig instead of estimating depth. Useful for checking view
//! order, yaw layout and color alignment of a new rig before a stereo
//! backend is wired in.

use std::f32::consts::TAU;

use anyhow::{anyhow, bail};
use tracing::{debug, info};

use crate::depth_fusion::cloud::{Color, Point3};
use crate::depth_fusion::common::SubImage;
use crate::depth_fusion::config::RigConfiguration;
use crate::depth_fusion::depth::estimator::{CalibrationLoader, DepthEstimator};

/// Per-pair handle of the preview backend.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewGenerator {
    pub pair: usize,
    /// View whose pixels are back-projected
    pub view: usize,
    /// Heading of that view around the rig's vertical axis
    pub yaw_rad: f32,
    pub fov_deg: f32,
}

/// Builds preview generators straight from the rig description; calibration
/// files are not read.
#[derive(Debug, Clone, Copy, Default)]
pub struct RigDescriptorLoader;

impl CalibrationLoader for RigDescriptorLoader {
    type Generator = PreviewGenerator;

    fn load_config(&self, rig: &RigConfiguration) -> anyhow::Result<Vec<PreviewGenerator>> {
        if rig.view_count == 0 {
            bail!("rig has no camera views");
        }
        // Views are assumed evenly spread around the vertical axis.
        let step = TAU / rig.view_count as f32;
        Ok(rig
            .pairs
            .iter()
            .map(|pair| PreviewGenerator {
                pair: pair.index,
                view: pair.left,
                yaw_rad: pair.left as f32 * step,
                fov_deg: pair.fov_deg,
            })
            .collect())
    }
}

/// Back-projects a strided pixel grid through an equidistant fisheye model
/// (`r = f * theta`) onto a sphere of radius `range_m`.
#[derive(Debug, Clone, Copy)]
pub struct FixedRangeEstimator {
    pub range_m: f32,
    pub stride: usize,
}

impl Default for FixedRangeEstimator {
    fn default() -> Self {
        Self {
            range_m: 5.0,
            stride: 8,
        }
    }
}

impl FixedRangeEstimator {
    pub fn new(range_m: f32, stride: usize) -> Self {
        Self {
            range_m,
            stride: stride.max(1),
        }
    }
}

impl DepthEstimator for FixedRangeEstimator {
    type Generator = PreviewGenerator;

    fn estimate(
        &self,
        generator: &PreviewGenerator,
        corrected: &[SubImage],
        raw: &[SubImage],
        verbose: bool,
    ) -> anyhow::Result<(Vec<Point3>, Vec<Color>)> {
        let raw_view = raw
            .get(generator.view)
            .ok_or_else(|| anyhow!("view {} missing, frame has {}", generator.view, raw.len()))?;
        let corrected_view = corrected
            .get(generator.view)
            .ok_or_else(|| anyhow!("corrected view {} missing", generator.view))?;
        if raw_view.dims() != corrected_view.dims() {
            bail!(
                "corrected view is {:?}, raw view is {:?}",
                corrected_view.dims(),
                raw_view.dims()
            );
        }

        let (width, height) = raw_view.dims();
        let half_fov = generator.fov_deg.to_radians() / 2.0;
        let focal = (width as f32 / 2.0) / half_fov;
        let cx = (width as f32 - 1.0) / 2.0;
        let cy = (height as f32 - 1.0) / 2.0;
        let (sin_yaw, cos_yaw) = generator.yaw_rad.sin_cos();

        let mut points = Vec::new();
        let mut colors = Vec::new();
        for v in (0..height).step_by(self.stride) {
            for u in (0..width).step_by(self.stride) {
                // Black pixels lie outside the lens circle or under the mask.
                if corrected_view.pixel(u, v).iter().all(|&s| s <= 0.0) {
                    continue;
                }

                let dx = u as f32 - cx;
                let dy = v as f32 - cy;
                let radius = (dx * dx + dy * dy).sqrt();
                let theta = radius / focal;
                if theta > half_fov {
                    continue;
                }

                let (sin_t, cos_t) = theta.sin_cos();
                let (cam_x, cam_y, cam_z) = if radius > 0.0 {
                    (sin_t * dx / radius, sin_t * dy / radius, cos_t)
                } else {
                    (0.0, 0.0, 1.0)
                };

                // Camera axes (right, down, forward) to rig axes (forward, left, up).
                let (fwd, left, up) = (cam_z, -cam_x, -cam_y);
                let x = cos_yaw * fwd - sin_yaw * left;
                let y = sin_yaw * fwd + cos_yaw * left;

                points.push(Point3::new(x * self.range_m, y * self.range_m, up * self.range_m));
                colors.push(color_at(raw_view, u, v));
            }
        }

        if verbose {
            info!(
                pair = generator.pair,
                view = generator.view,
                points = points.len(),
                "Preview depth generated"
            );
        } else {
            debug!(pair = generator.pair, points = points.len(), "Preview depth generated");
        }
        Ok((points, colors))
    }
}

fn color_at(view: &SubImage, u: usize, v: usize) -> Color {
    let px = view.pixel(u, v);
    if px.len() >= 3 {
        Color::new(px[0], px[1], px[2])
    } else {
        Color::gray(px[0])
    }
}
