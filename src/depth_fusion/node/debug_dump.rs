use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use tiff::encoder::{colortype, compression::DeflateLevel, Compression, TiffEncoder};
use tracing::debug;

use crate::depth_fusion::common::{FusionError, Result, SubImage};
use crate::depth_fusion::frame::{compose, FrameLayout, Stamp};

/// Writes the corrected views of one frame, reassembled into a composite,
/// to `<dir>/corrected_<sec>_<nsec>.tif` as 32-bit float samples.
///
/// Three-channel views are stored as RGB.
pub fn dump_corrected(
    dir: &Path,
    stamp: Stamp,
    views: &[SubImage],
    layout: &FrameLayout,
) -> Result<PathBuf> {
    let composite = compose(views, layout)?;
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("corrected_{}_{:09}.tif", stamp.sec, stamp.nsec));

    let encode_err = |e: tiff::TiffError| FusionError::PublishError(format!("{}: {}", path.display(), e));
    let file = File::create(&path)?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file))
        .map_err(encode_err)?
        .with_compression(Compression::Deflate(DeflateLevel::Fast));

    let (width, height) = (composite.width as u32, composite.height as u32);
    match composite.channels {
        1 => encoder
            .write_image::<colortype::Gray32Float>(width, height, &composite.data)
            .map_err(encode_err)?,
        3 => {
            let mut rgb = composite.data;
            for px in rgb.chunks_exact_mut(3) {
                px.swap(0, 2);
            }
            encoder
                .write_image::<colortype::RGB32Float>(width, height, &rgb)
                .map_err(encode_err)?
        }
        channels => {
            return Err(FusionError::shape("debug dump channels", "1 or 3", channels));
        }
    }

    debug!(path = %path.display(), width, height, "Dumped corrected views");
    Ok(path)
}
