//! Frame intake module
//!
//! Message types for incoming camera frames, the decode step that turns raw
//! or compressed payloads into a pixel buffer, and the splitter that cuts a
//! composite frame into per-camera views.

mod decode;
mod splitter;
pub mod types;

pub use decode::{decode_frame, BayerPattern, ImageEncoding};
pub use splitter::{compose, split, FrameLayout};
pub use types::{
    CompositeFrame, CompressedImage, FrameMessage, FramePayload, Header, RawImage, Stamp,
};
