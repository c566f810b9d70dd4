//! Multi-camera depth fusion module
//!
//! Takes composite frames from a fisheye camera rig, corrects each view
//! photometrically, runs a depth estimator per overlapping camera pair and
//! publishes the union of the per-pair clouds.

pub mod cloud;
pub mod common;
pub mod config;
pub mod depth;
pub mod frame;
pub mod node;
pub mod photometric;

pub use common::{DropReason, FusionError, Image, Result, StageTimings, SubImage};

pub use config::{FusionConfig, FusionConfigBuilder, PairDescriptor, RigConfiguration};

pub use frame::{decode_frame, split, CompositeFrame, FrameLayout, FrameMessage, Header, Stamp};

pub use photometric::{PhotometricCorrector, PhotometricMap};

pub use depth::{
    CalibrationLoader, DepthEstimator, FixedRangeEstimator, PairDepthInvoker, RigDescriptorLoader,
};

pub use cloud::{merge, CloudFuser, Color, FusedCloud, PairDepthResult, Point3, PointCloud2};

pub use node::{
    ChannelPublisher, CloudPublisher, Delivery, DropSnapshot, FusionPipelineNode, PipelineStage, PlyPublisher,
};
