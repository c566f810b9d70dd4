//! Common utilities module
//!
//! Error taxonomy, the shared pixel buffer and stage timing helpers.

pub mod error;
pub mod image;
pub mod timing;

pub use error::{DropReason, FusionError, Result};
pub use image::{Image, SubImage};
pub use timing::{StageTimings, StepTiming, Timer};
