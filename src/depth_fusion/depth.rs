//! Depth estimation module
//!
//! Interfaces to the per-pair depth estimator and calibration loader, the
//! invoker that drives them for every camera pair of a frame, and a preview
//! backend for checking rig layout without a stereo matcher.

mod estimator;
mod invoker;
mod preview;

pub use estimator::{CalibrationLoader, DepthEstimator};
pub use invoker::{PairDepthInvoker, RESERVED_GENERATORS};
pub use preview::{FixedRangeEstimator, PreviewGenerator, RigDescriptorLoader};
