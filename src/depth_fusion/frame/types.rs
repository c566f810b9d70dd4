//! Frame message types

use std::time::{SystemTime, UNIX_EPOCH};

use crate::depth_fusion::common::Image;

/// Capture time, seconds plus nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Stamp {
    pub sec: u32,
    pub nsec: u32,
}

impl Stamp {
    pub fn new(sec: u32, nsec: u32) -> Self {
        Self { sec, nsec }
    }

    pub fn now() -> Self {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self {
            sec: elapsed.as_secs() as u32,
            nsec: elapsed.subsec_nanos(),
        }
    }
}

/// Message header: capture stamp and coordinate frame label.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Header {
    pub stamp: Stamp,
    pub frame_id: String,
}

impl Header {
    pub fn new(stamp: Stamp, frame_id: impl Into<String>) -> Self {
        Self {
            stamp,
            frame_id: frame_id.into(),
        }
    }
}

/// Uncompressed image payload as it arrives from the camera driver.
#[derive(Debug, Clone)]
pub struct RawImage {
    pub width: u32,
    pub height: u32,
    /// Pixel encoding name, e.g. `bgr8`, `mono16`, `bayer_rggb8`
    pub encoding: String,
    pub is_bigendian: bool,
    /// Bytes per row, including any padding
    pub step: u32,
    pub data: Vec<u8>,
}

/// Encoded (JPEG, PNG, ...) image payload.
#[derive(Debug, Clone)]
pub struct CompressedImage {
    pub format: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub enum FramePayload {
    Raw(RawImage),
    Compressed(CompressedImage),
}

/// One incoming camera message, before decoding.
#[derive(Debug, Clone)]
pub struct FrameMessage {
    pub header: Header,
    pub payload: FramePayload,
}

impl FrameMessage {
    pub fn raw(header: Header, image: RawImage) -> Self {
        Self {
            header,
            payload: FramePayload::Raw(image),
        }
    }

    pub fn compressed(header: Header, format: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            header,
            payload: FramePayload::Compressed(CompressedImage {
                format: format.into(),
                data,
            }),
        }
    }
}

/// A decoded frame holding every camera view of the rig.
#[derive(Debug, Clone)]
pub struct CompositeFrame {
    pub header: Header,
    pub image: Image,
}

impl CompositeFrame {
    pub fn new(header: Header, image: Image) -> Self {
        Self { header, image }
    }
}
