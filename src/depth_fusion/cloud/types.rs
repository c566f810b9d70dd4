//! Point and color types

use crate::depth_fusion::common::{FusionError, Result};
use crate::depth_fusion::frame::Stamp;

/// 3D point in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Color sample in the source image's channel order and value range.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    pub b: f32,
    pub g: f32,
    pub r: f32,
}

impl Color {
    pub fn new(b: f32, g: f32, r: f32) -> Self {
        Self { b, g, r }
    }

    pub fn gray(value: f32) -> Self {
        Self::new(value, value, value)
    }
}

/// Points and colors produced by one camera pair, row `i` of each belonging
/// to the same sample.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PairDepthResult {
    points: Vec<Point3>,
    colors: Vec<Color>,
}

impl PairDepthResult {
    /// Fails with `ShapeError` unless both sequences have the same length.
    pub fn new(points: Vec<Point3>, colors: Vec<Color>) -> Result<Self> {
        if points.len() != colors.len() {
            return Err(FusionError::shape(
                "pair result colors",
                points.len(),
                colors.len(),
            ));
        }
        Ok(Self { points, colors })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn into_parts(self) -> (Vec<Point3>, Vec<Color>) {
        (self.points, self.colors)
    }
}

/// All pair results of one frame, concatenated in pair order.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedCloud {
    pub stamp: Stamp,
    pub frame_id: String,
    points: Vec<Point3>,
    colors: Vec<Color>,
}

impl FusedCloud {
    pub(crate) fn from_parts(
        stamp: Stamp,
        frame_id: String,
        points: Vec<Point3>,
        colors: Vec<Color>,
    ) -> Self {
        debug_assert_eq!(points.len(), colors.len());
        Self {
            stamp,
            frame_id,
            points,
            colors,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    /// Rows as `(point, color)` pairs.
    pub fn rows(&self) -> impl Iterator<Item = (&Point3, &Color)> {
        self.points.iter().zip(&self.colors)
    }
}
