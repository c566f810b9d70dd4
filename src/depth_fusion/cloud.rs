//! Point cloud module
//!
//! Per-pair depth results, their fusion into one cloud, and the wire and
//! file formats the fused cloud leaves the pipeline in.

mod fuser;
mod ply;
mod point_cloud2;
pub mod types;

pub use fuser::{merge, CloudFuser, DEFAULT_OUTPUT_FRAME};
pub use ply::write_ply;
pub use point_cloud2::{PointCloud2, PointField, FIELD_NAMES, FLOAT32, POINT_STEP};
pub use types::{Color, FusedCloud, PairDepthResult, Point3};
