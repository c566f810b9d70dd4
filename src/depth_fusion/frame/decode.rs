//! Decoding of raw and compressed frame payloads into a common pixel buffer.
//!
//! Raw frames keep their channel order (`rgb8` stays RGB), compressed frames
//! come out as BGR(A) and Bayer mosaics are demosaiced to BGR, so downstream
//! stages can assume BGR for everything produced by the camera driver.

use std::io::Cursor;

use bayer::{BayerDepth, CFA, Demosaic, RasterDepth, RasterMut};
use image::DynamicImage;
use tracing::debug;

use crate::depth_fusion::common::{FusionError, Image, Result};
use crate::depth_fusion::frame::types::{
    CompositeFrame, CompressedImage, FrameMessage, FramePayload, RawImage,
};

/// Bayer color filter layout, named by the top-left 2x2 tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BayerPattern {
    Rggb,
    Bggr,
    Gbrg,
    Grbg,
}

impl BayerPattern {
    fn cfa(self) -> CFA {
        match self {
            Self::Rggb => CFA::RGGB,
            Self::Bggr => CFA::BGGR,
            Self::Gbrg => CFA::GBRG,
            Self::Grbg => CFA::GRBG,
        }
    }
}

/// Pixel encodings accepted in raw frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageEncoding {
    Mono8,
    Mono16,
    Bgr8,
    Rgb8,
    Bgra8,
    Rgba8,
    Bayer8(BayerPattern),
    Bayer16(BayerPattern),
}

impl ImageEncoding {
    /// Parses a driver encoding name (`bgr8`, `mono16`, `8UC3`, `bayer_rggb8`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        let encoding = match name {
            "mono8" | "8UC1" => Self::Mono8,
            "mono16" | "16UC1" => Self::Mono16,
            "bgr8" | "8UC3" => Self::Bgr8,
            "rgb8" => Self::Rgb8,
            "bgra8" | "8UC4" => Self::Bgra8,
            "rgba8" => Self::Rgba8,
            "bayer_rggb8" => Self::Bayer8(BayerPattern::Rggb),
            "bayer_bggr8" => Self::Bayer8(BayerPattern::Bggr),
            "bayer_gbrg8" => Self::Bayer8(BayerPattern::Gbrg),
            "bayer_grbg8" => Self::Bayer8(BayerPattern::Grbg),
            "bayer_rggb16" => Self::Bayer16(BayerPattern::Rggb),
            "bayer_bggr16" => Self::Bayer16(BayerPattern::Bggr),
            "bayer_gbrg16" => Self::Bayer16(BayerPattern::Gbrg),
            "bayer_grbg16" => Self::Bayer16(BayerPattern::Grbg),
            _ => return None,
        };
        Some(encoding)
    }

    /// Bytes per pixel in the incoming buffer.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::Mono8 | Self::Bayer8(_) => 1,
            Self::Mono16 | Self::Bayer16(_) => 2,
            Self::Bgr8 | Self::Rgb8 => 3,
            Self::Bgra8 | Self::Rgba8 => 4,
        }
    }
}

/// Resolves a frame message into a composite frame ready for splitting.
pub fn decode_frame(message: FrameMessage) -> Result<CompositeFrame> {
    let image = match &message.payload {
        FramePayload::Raw(raw) => decode_raw(raw)?,
        FramePayload::Compressed(compressed) => decode_compressed(compressed)?,
    };
    debug!(
        width = image.width,
        height = image.height,
        channels = image.channels,
        "Decoded frame"
    );
    Ok(CompositeFrame::new(message.header, image))
}

fn decode_raw(raw: &RawImage) -> Result<Image> {
    let encoding = ImageEncoding::from_name(&raw.encoding)
        .ok_or_else(|| FusionError::DecodeError(format!("unsupported encoding '{}'", raw.encoding)))?;

    let width = raw.width as usize;
    let height = raw.height as usize;
    if width == 0 || height == 0 {
        return Err(FusionError::DecodeError(format!(
            "empty raw image {}x{}",
            width, height
        )));
    }

    let row_bytes = width * encoding.bytes_per_pixel();
    let step = raw.step as usize;
    if step < row_bytes {
        return Err(FusionError::DecodeError(format!(
            "row step {} shorter than {} bytes per row",
            step, row_bytes
        )));
    }
    // The last row may come without its padding.
    let required = step * (height - 1) + row_bytes;
    if raw.data.len() < required {
        return Err(FusionError::DecodeError(format!(
            "raw buffer holds {} bytes, {}x{} {} needs {}",
            raw.data.len(),
            width,
            height,
            raw.encoding,
            required
        )));
    }

    let packed: Vec<u8> = (0..height)
        .flat_map(|y| raw.data[y * step..y * step + row_bytes].iter().copied())
        .collect();

    match encoding {
        ImageEncoding::Mono8 => Image::new(width, height, 1, widen_u8(&packed)),
        ImageEncoding::Bgr8 | ImageEncoding::Rgb8 => Image::new(width, height, 3, widen_u8(&packed)),
        ImageEncoding::Bgra8 | ImageEncoding::Rgba8 => Image::new(width, height, 4, widen_u8(&packed)),
        ImageEncoding::Mono16 => Image::new(width, height, 1, widen_u16(&packed, raw.is_bigendian)),
        ImageEncoding::Bayer8(pattern) => {
            demosaic(&packed, width, height, BayerDepth::Depth8, pattern)
        }
        ImageEncoding::Bayer16(pattern) => {
            let depth = if raw.is_bigendian {
                BayerDepth::Depth16BE
            } else {
                BayerDepth::Depth16LE
            };
            demosaic(&packed, width, height, depth, pattern)
        }
    }
}

fn widen_u8(bytes: &[u8]) -> Vec<f32> {
    bytes.iter().map(|&v| f32::from(v)).collect()
}

fn widen_u16(bytes: &[u8], big_endian: bool) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|pair| {
            let value = if big_endian {
                u16::from_be_bytes([pair[0], pair[1]])
            } else {
                u16::from_le_bytes([pair[0], pair[1]])
            };
            f32::from(value)
        })
        .collect()
}

/// Demosaics a packed Bayer buffer into a 3-channel BGR image.
fn demosaic(
    packed: &[u8],
    width: usize,
    height: usize,
    depth: BayerDepth,
    pattern: BayerPattern,
) -> Result<Image> {
    let (raster_depth, bytes_per_sample) = match depth {
        BayerDepth::Depth8 => (RasterDepth::Depth8, 1),
        _ => (RasterDepth::Depth16, 2),
    };

    let mut output_buf = vec![0u8; width * height * 3 * bytes_per_sample];
    {
        let mut output_raster = RasterMut::new(width, height, raster_depth, &mut output_buf);
        let mut cursor = Cursor::new(packed);
        bayer::run_demosaic(
            &mut cursor,
            depth,
            pattern.cfa(),
            Demosaic::Linear,
            &mut output_raster,
        )
        .map_err(|e| FusionError::DecodeError(format!("demosaic failed: {:?}", e)))?;
    }

    // The raster is RGB; flip to BGR to match the rest of the pipeline.
    let data: Vec<f32> = output_buf
        .chunks_exact(bytes_per_sample * 3)
        .flat_map(|px| {
            let sample = |i: usize| -> f32 {
                if bytes_per_sample == 1 {
                    f32::from(px[i])
                } else {
                    f32::from(u16::from_le_bytes([px[2 * i], px[2 * i + 1]]))
                }
            };
            [sample(2), sample(1), sample(0)]
        })
        .collect();

    Image::new(width, height, 3, data)
}

fn decode_compressed(compressed: &CompressedImage) -> Result<Image> {
    debug!(
        format = %compressed.format,
        bytes = compressed.data.len(),
        "Decoding compressed frame"
    );

    let decoded = image::load_from_memory(&compressed.data)
        .map_err(|e| FusionError::DecodeError(format!("{} payload: {}", compressed.format, e)))?;

    match decoded {
        DynamicImage::ImageLuma8(buf) => {
            let (width, height) = (buf.width() as usize, buf.height() as usize);
            Image::new(width, height, 1, widen_u8(buf.as_raw()))
        }
        DynamicImage::ImageLuma16(buf) => {
            let (width, height) = (buf.width() as usize, buf.height() as usize);
            Image::new(width, height, 1, buf.as_raw().iter().map(|&v| f32::from(v)).collect())
        }
        DynamicImage::ImageRgba8(buf) => {
            let (width, height) = (buf.width() as usize, buf.height() as usize);
            Image::new(width, height, 4, swap_red_blue(buf.as_raw(), 4))
        }
        other => {
            let rgb = other.to_rgb8();
            let (width, height) = (rgb.width() as usize, rgb.height() as usize);
            Image::new(width, height, 3, swap_red_blue(rgb.as_raw(), 3))
        }
    }
}

fn swap_red_blue(samples: &[u8], channels: usize) -> Vec<f32> {
    samples
        .chunks_exact(channels)
        .flat_map(|px| {
            let mut out = [0.0f32; 4];
            out[0] = f32::from(px[2]);
            out[1] = f32::from(px[1]);
            out[2] = f32::from(px[0]);
            if channels == 4 {
                out[3] = f32::from(px[3]);
            }
            out.into_iter().take(channels)
        })
        .collect()
}
