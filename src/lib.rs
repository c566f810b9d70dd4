pub mod depth_fusion;
pub mod logger;
