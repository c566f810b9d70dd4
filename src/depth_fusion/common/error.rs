use std::fmt;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FusionError {
    #[error("Shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeError {
        context: &'static str,
        expected: String,
        actual: String,
    },

    #[error("Depth estimation failed for pair {pair}: {reason}")]
    DepthEstimationError { pair: usize, reason: String },

    #[error("No pair produced a depth result")]
    EmptyFusionError,

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Failed to decode frame: {0}")]
    DecodeError(String),

    #[error("Failed to publish point cloud: {0}")]
    PublishError(String),

    #[error("Pipeline busy, frame dropped")]
    PipelineBusy,

    #[error("Pipeline received a frame before configure()")]
    NotConfigured,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl FusionError {
    /// Shape mismatch between two `width x height` resolutions.
    pub fn dims_mismatch(context: &'static str, expected: (usize, usize), actual: (usize, usize)) -> Self {
        Self::ShapeError {
            context,
            expected: format!("{}x{}", expected.0, expected.1),
            actual: format!("{}x{}", actual.0, actual.1),
        }
    }

    pub fn shape(context: &'static str, expected: impl fmt::Display, actual: impl fmt::Display) -> Self {
        Self::ShapeError {
            context,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub fn depth(pair: usize, reason: impl fmt::Display) -> Self {
        Self::DepthEstimationError {
            pair,
            reason: reason.to_string(),
        }
    }

    /// Why a frame carrying this error was dropped.
    pub fn drop_reason(&self) -> DropReason {
        match self {
            Self::ShapeError { .. } => DropReason::Shape,
            Self::DepthEstimationError { .. } => DropReason::DepthEstimation,
            Self::EmptyFusionError => DropReason::EmptyFusion,
            Self::DecodeError(_) => DropReason::Decode,
            Self::PublishError(_) => DropReason::Publish,
            Self::PipelineBusy => DropReason::Busy,
            Self::NotConfigured => DropReason::NotConfigured,
            Self::ConfigError(_) | Self::IoError(_) => DropReason::Other,
        }
    }
}

/// Reason a frame never made it to the publisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    Busy,
    NotConfigured,
    Decode,
    Shape,
    DepthEstimation,
    EmptyFusion,
    Publish,
    /// Published, then replaced unread by a newer cloud
    Superseded,
    Other,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Busy => "busy",
            Self::NotConfigured => "not_configured",
            Self::Decode => "decode",
            Self::Shape => "shape",
            Self::DepthEstimation => "depth_estimation",
            Self::EmptyFusion => "empty_fusion",
            Self::Publish => "publish",
            Self::Superseded => "superseded",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

pub type Result<T> = std::result::Result<T, FusionError>;
