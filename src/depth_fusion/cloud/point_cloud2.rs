//! `sensor_msgs/PointCloud2` packaging of a fused cloud.
//!
//! Each row is six little-endian `f32`s: `x, y, z, b, g, r`. The layout
//! matches what downstream ROS consumers of the depth node already parse.

use crate::depth_fusion::cloud::types::{Color, FusedCloud, Point3};
use crate::depth_fusion::common::{FusionError, Result};
use crate::depth_fusion::frame::Header;

/// `sensor_msgs/PointField` datatype code for 32-bit floats.
pub const FLOAT32: u8 = 7;

/// Field names in row order.
pub const FIELD_NAMES: [&str; 6] = ["x", "y", "z", "b", "g", "r"];

/// Bytes per row.
pub const POINT_STEP: u32 = (FIELD_NAMES.len() * 4) as u32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointField {
    pub name: String,
    pub offset: u32,
    pub datatype: u8,
    pub count: u32,
}

impl PointField {
    pub fn float32(name: &str, offset: u32) -> Self {
        Self {
            name: name.to_string(),
            offset,
            datatype: FLOAT32,
            count: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointCloud2 {
    pub header: Header,
    pub height: u32,
    pub width: u32,
    pub fields: Vec<PointField>,
    pub is_bigendian: bool,
    pub point_step: u32,
    pub row_step: u32,
    pub data: Vec<u8>,
    pub is_dense: bool,
}

impl PointCloud2 {
    /// Packs `cloud` as an unordered (`height = 1`) cloud. `is_dense` stays
    /// false since estimators may emit invalid points.
    pub fn from_fused(cloud: &FusedCloud) -> Self {
        let fields = FIELD_NAMES
            .iter()
            .enumerate()
            .map(|(i, name)| PointField::float32(name, (i * 4) as u32))
            .collect();

        let mut data = Vec::with_capacity(cloud.len() * POINT_STEP as usize);
        for (point, color) in cloud.rows() {
            for value in [point.x, point.y, point.z, color.b, color.g, color.r] {
                data.extend_from_slice(&value.to_le_bytes());
            }
        }

        let width = cloud.len() as u32;
        Self {
            header: Header::new(cloud.stamp, cloud.frame_id.clone()),
            height: 1,
            width,
            fields,
            is_bigendian: false,
            point_step: POINT_STEP,
            row_step: POINT_STEP * width,
            data,
            is_dense: false,
        }
    }

    pub fn len(&self) -> usize {
        (self.width * self.height) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decodes rows back into points and colors.
    ///
    /// Only the `x,y,z,b,g,r` float layout produced by [`PointCloud2::from_fused`]
    /// is understood.
    pub fn read_points(&self) -> Result<Vec<(Point3, Color)>> {
        let layout_ok = self.point_step == POINT_STEP
            && !self.is_bigendian
            && self.fields.len() == FIELD_NAMES.len()
            && self
                .fields
                .iter()
                .zip(FIELD_NAMES)
                .enumerate()
                .all(|(i, (field, name))| {
                    field.name == name
                        && field.offset == (i * 4) as u32
                        && field.datatype == FLOAT32
                        && field.count == 1
                });
        if !layout_ok {
            return Err(FusionError::shape(
                "point cloud fields",
                FIELD_NAMES.join(","),
                self.fields
                    .iter()
                    .map(|f| f.name.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
            ));
        }

        let expected = self.len() * POINT_STEP as usize;
        if self.data.len() != expected {
            return Err(FusionError::shape("point cloud data length", expected, self.data.len()));
        }

        Ok(self
            .data
            .chunks_exact(POINT_STEP as usize)
            .map(|row| {
                let v = |i: usize| {
                    f32::from_le_bytes([row[4 * i], row[4 * i + 1], row[4 * i + 2], row[4 * i + 3]])
                };
                (Point3::new(v(0), v(1), v(2)), Color::new(v(3), v(4), v(5)))
            })
            .collect())
    }
}
