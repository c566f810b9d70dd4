//! Configuration module
//!
//! Startup settings of the fusion node and the camera rig derived from them.

pub mod rig;
pub mod types;

pub use rig::{PairDescriptor, RigConfiguration};
pub use types::{FusionConfig, FusionConfigBuilder};
