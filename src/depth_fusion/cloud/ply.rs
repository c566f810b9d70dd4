use std::io::Write;

use crate::depth_fusion::cloud::types::FusedCloud;
use crate::depth_fusion::common::Result;

/// Writes `cloud` as a binary little-endian PLY.
///
/// Vertex properties mirror the point cloud message: float `x y z` followed
/// by float `blue green red`, values copied without rescaling. Stamp and
/// frame label go into header comments.
pub fn write_ply(output: &mut dyn Write, cloud: &FusedCloud) -> Result<()> {
    let mut header = String::new();
    header.push_str("ply\n");
    header.push_str("format binary_little_endian 1.0\n");
    header.push_str(&format!("comment frame_id {}\n", cloud.frame_id));
    header.push_str(&format!("comment stamp {}.{:09}\n", cloud.stamp.sec, cloud.stamp.nsec));
    header.push_str(&format!("element vertex {}\n", cloud.len()));
    for name in ["x", "y", "z", "blue", "green", "red"] {
        header.push_str(&format!("property float {}\n", name));
    }
    header.push_str("end_header\n");
    output.write_all(header.as_bytes())?;

    let mut body = Vec::with_capacity(cloud.len() * 24);
    for (point, color) in cloud.rows() {
        for value in [point.x, point.y, point.z, color.b, color.g, color.r] {
            body.extend_from_slice(&value.to_le_bytes());
        }
    }
    output.write_all(&body)?;
    Ok(())
}
