//! Fusion node
//!
//! Drives split, correction, per-pair depth and fusion for every incoming
//! frame, and hands the result to a publisher.

mod debug_dump;
mod pipeline;
mod publisher;
mod stage;
mod stats;

#[cfg(test)]
mod tests;

pub use debug_dump::dump_corrected;
pub use pipeline::FusionPipelineNode;
pub use publisher::{ChannelPublisher, CloudPublisher, Delivery, PlyPublisher};
pub use stage::PipelineStage;
pub use stats::{DropSnapshot, DropStats};
