use tracing::{debug, warn};

use crate::depth_fusion::cloud::types::{FusedCloud, PairDepthResult};
use crate::depth_fusion::common::{FusionError, Result};
use crate::depth_fusion::frame::Stamp;

/// Frame label stamped on every fused cloud unless configured otherwise.
pub const DEFAULT_OUTPUT_FRAME: &str = "world";

/// Concatenates per-pair results into one cloud labelled with a fixed frame.
#[derive(Debug, Clone)]
pub struct CloudFuser {
    frame_id: String,
}

impl Default for CloudFuser {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_FRAME)
    }
}

impl CloudFuser {
    pub fn new(frame_id: impl Into<String>) -> Self {
        Self {
            frame_id: frame_id.into(),
        }
    }

    /// Joins `results` in the order given; rows are never reordered.
    ///
    /// An empty `results` fails with `EmptyFusionError`. Results that are
    /// present but hold no points still fuse, into a cloud with zero rows.
    pub fn merge(&self, results: Vec<PairDepthResult>, stamp: Stamp) -> Result<FusedCloud> {
        if results.is_empty() {
            return Err(FusionError::EmptyFusionError);
        }

        let total: usize = results.iter().map(PairDepthResult::len).sum();
        let pairs = results.len();
        let mut points = Vec::with_capacity(total);
        let mut colors = Vec::with_capacity(total);
        for result in results {
            let (pair_points, pair_colors) = result.into_parts();
            points.extend(pair_points);
            colors.extend(pair_colors);
        }

        if total == 0 {
            warn!(pairs, "All pairs returned empty results");
        }
        debug!(pairs, points = total, "Fused pair results");

        Ok(FusedCloud::from_parts(stamp, self.frame_id.clone(), points, colors))
    }
}

/// Merges with the default `world` frame label.
pub fn merge(results: Vec<PairDepthResult>, stamp: Stamp) -> Result<FusedCloud> {
    CloudFuser::default().merge(results, stamp)
}
