use tracing::debug;

use crate::depth_fusion::common::{FusionError, Image, Result, SubImage};
use crate::depth_fusion::frame::types::CompositeFrame;

/// Geometric layout of the camera views inside a composite frame.
///
/// Views form a `columns x rows` grid of equally sized tiles, numbered
/// row-major from the top-left tile. The number of a tile is the view index
/// that rig calibration refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub columns: usize,
    pub rows: usize,
    pub view_width: usize,
    pub view_height: usize,
}

impl Default for FrameLayout {
    /// Four 1280x800 fisheye views packed side by side.
    fn default() -> Self {
        Self::side_by_side(4, 1280, 800)
    }
}

impl FrameLayout {
    pub fn side_by_side(views: usize, view_width: usize, view_height: usize) -> Self {
        Self::grid(views, 1, view_width, view_height)
    }

    pub fn grid(columns: usize, rows: usize, view_width: usize, view_height: usize) -> Self {
        Self {
            columns,
            rows,
            view_width,
            view_height,
        }
    }

    pub fn view_count(&self) -> usize {
        self.columns * self.rows
    }

    pub fn view_dims(&self) -> (usize, usize) {
        (self.view_width, self.view_height)
    }

    /// Resolution a frame must have to match this layout.
    pub fn composite_dims(&self) -> (usize, usize) {
        (self.columns * self.view_width, self.rows * self.view_height)
    }

    /// Top-left pixel of view `index` in the composite frame.
    pub fn view_origin(&self, index: usize) -> (usize, usize) {
        let column = index % self.columns;
        let row = index / self.columns;
        (column * self.view_width, row * self.view_height)
    }
}

/// Cuts a composite frame into its camera views, in view-index order.
///
/// Views are pixel-exact crops; nothing is resampled.
pub fn split(frame: &CompositeFrame, layout: &FrameLayout) -> Result<Vec<SubImage>> {
    let expected = layout.composite_dims();
    if frame.image.dims() != expected || layout.view_count() == 0 {
        return Err(FusionError::dims_mismatch("frame split", expected, frame.image.dims()));
    }

    let views = (0..layout.view_count())
        .map(|index| {
            let (x0, y0) = layout.view_origin(index);
            frame
                .image
                .crop(x0, y0, layout.view_width, layout.view_height)
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(
        views = views.len(),
        view_width = layout.view_width,
        view_height = layout.view_height,
        "Split composite frame"
    );
    Ok(views)
}

/// Reassembles views into one composite image; the inverse of [`split`].
pub fn compose(views: &[SubImage], layout: &FrameLayout) -> Result<Image> {
    if views.len() != layout.view_count() {
        return Err(FusionError::shape("compose view count", layout.view_count(), views.len()));
    }
    let channels = views.first().map(|v| v.channels).unwrap_or(1);
    let (width, height) = layout.composite_dims();
    let mut canvas = Image::zeros(width, height, channels);

    for (index, view) in views.iter().enumerate() {
        if view.dims() != layout.view_dims() {
            return Err(FusionError::dims_mismatch("compose view", layout.view_dims(), view.dims()));
        }
        let (x0, y0) = layout.view_origin(index);
        canvas.paste(view, x0, y0)?;
    }
    Ok(canvas)
}
