use rayon::prelude::*;
use tracing::{debug, debug_span};

use crate::depth_fusion::cloud::PairDepthResult;
use crate::depth_fusion::common::{FusionError, Result, SubImage};
use crate::depth_fusion::depth::estimator::DepthEstimator;

/// Leading generators that are loaded but never invoked.
///
/// The deployed rig keeps its first stereo calibration out of depth
/// generation; only `generators[RESERVED_GENERATORS..]` produce points.
pub const RESERVED_GENERATORS: usize = 1;

/// Runs the depth estimator for every active camera pair of a frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct PairDepthInvoker {
    verbose: bool,
    parallel: bool,
}

impl PairDepthInvoker {
    pub fn new(verbose: bool, parallel: bool) -> Self {
        Self { verbose, parallel }
    }

    /// Returns one result per active generator, in generator order.
    ///
    /// The first failing pair aborts the whole call with a
    /// `DepthEstimationError` carrying that pair's index in `generators`;
    /// results of pairs that succeeded are discarded. In parallel mode every
    /// pair still runs and the lowest failing index is reported.
    pub fn run<E: DepthEstimator>(
        &self,
        estimator: &E,
        generators: &[E::Generator],
        corrected: &[SubImage],
        raw: &[SubImage],
    ) -> Result<Vec<PairDepthResult>> {
        if corrected.len() != raw.len() {
            return Err(FusionError::shape(
                "corrected view count",
                raw.len(),
                corrected.len(),
            ));
        }

        let active = generators.get(RESERVED_GENERATORS..).unwrap_or(&[]);
        let invoke = |offset: usize, generator: &E::Generator| -> Result<PairDepthResult> {
            let pair = RESERVED_GENERATORS + offset;
            let _span = debug_span!("estimate_pair", pair).entered();

            let (points, colors) = estimator
                .estimate(generator, corrected, raw, self.verbose)
                .map_err(|e| FusionError::depth(pair, format!("{:#}", e)))?;
            let result = PairDepthResult::new(points, colors)
                .map_err(|e| FusionError::depth(pair, e))?;

            debug!(pair, points = result.len(), "Pair estimated");
            Ok(result)
        };

        if self.parallel {
            let results: Vec<Result<PairDepthResult>> = active
                .par_iter()
                .enumerate()
                .map(|(offset, generator)| invoke(offset, generator))
                .collect();
            results.into_iter().collect()
        } else {
            active
                .iter()
                .enumerate()
                .map(|(offset, generator)| invoke(offset, generator))
                .collect()
        }
    }
}
