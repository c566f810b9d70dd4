//! Fusion node configuration types

use std::path::PathBuf;

use crate::depth_fusion::cloud::DEFAULT_OUTPUT_FRAME;
use crate::depth_fusion::frame::FrameLayout;
use crate::depth_fusion::photometric::DEFAULT_GAIN_FLOOR;

/// Stereo calibration files of the four overlapping pairs, in pair order.
/// `stereo_calib_{a}_{b}` pairs view `a` with view `b`.
pub const DEFAULT_STEREO_PATHS: [&str; 4] = [
    "stereo_calib_1_0.yaml",
    "stereo_calib_2_1.yaml",
    "stereo_calib_3_2.yaml",
    "stereo_calib_0_3.yaml",
];

/// Configuration for the depth fusion node
#[derive(Debug, Clone)]
pub struct FusionConfig {
    /// Horizontal field of view of each fisheye view, in degrees
    pub fov_deg: f32,
    /// Width of the undistorted images handed to the estimator
    pub width: usize,
    /// Height of the undistorted images handed to the estimator
    pub height: usize,
    /// Fisheye intrinsics file shared by all views
    pub fisheye_config: PathBuf,
    /// Stereo calibration file of each camera pair, in pair order
    pub stereo_paths: Vec<PathBuf>,
    /// Grayscale photometric calibration image; no correction when absent
    pub photometric_path: Option<PathBuf>,
    /// Forwarded to the depth estimator
    pub verbose: bool,
    /// Placement of the camera views inside a composite frame
    pub layout: FrameLayout,
    /// Smallest gain used when dividing out the photometric map
    pub photometric_floor: f32,
    /// Frame label of published clouds
    pub output_frame_id: String,
    /// Run camera pairs concurrently instead of one after another
    pub parallel_pairs: bool,
    /// Directory receiving corrected views of every frame, for inspection
    pub debug_dump_dir: Option<PathBuf>,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            fov_deg: 190.0,
            width: 600,
            height: 300,
            fisheye_config: PathBuf::new(),
            stereo_paths: DEFAULT_STEREO_PATHS.iter().map(PathBuf::from).collect(),
            photometric_path: None,
            verbose: false,
            layout: FrameLayout::default(),
            photometric_floor: DEFAULT_GAIN_FLOOR,
            output_frame_id: DEFAULT_OUTPUT_FRAME.to_string(),
            parallel_pairs: false,
            debug_dump_dir: None,
        }
    }
}

impl FusionConfig {
    pub fn builder() -> FusionConfigBuilder {
        FusionConfigBuilder::default()
    }
}

/// Builder for FusionConfig
#[derive(Default)]
pub struct FusionConfigBuilder {
    fov_deg: Option<f32>,
    width: Option<usize>,
    height: Option<usize>,
    fisheye_config: Option<PathBuf>,
    stereo_paths: Option<Vec<PathBuf>>,
    photometric_path: Option<Option<PathBuf>>,
    verbose: Option<bool>,
    layout: Option<FrameLayout>,
    photometric_floor: Option<f32>,
    output_frame_id: Option<String>,
    parallel_pairs: Option<bool>,
    debug_dump_dir: Option<Option<PathBuf>>,
}

impl FusionConfigBuilder {
    pub fn fov_deg(mut self, fov_deg: f32) -> Self {
        self.fov_deg = Some(fov_deg);
        self
    }

    pub fn image_size(mut self, width: usize, height: usize) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn fisheye_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.fisheye_config = Some(path.into());
        self
    }

    pub fn stereo_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.stereo_paths = Some(paths.into_iter().map(Into::into).collect());
        self
    }

    pub fn photometric_path(mut self, path: Option<PathBuf>) -> Self {
        self.photometric_path = Some(path);
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    pub fn layout(mut self, layout: FrameLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn photometric_floor(mut self, floor: f32) -> Self {
        self.photometric_floor = Some(floor);
        self
    }

    pub fn output_frame_id(mut self, frame_id: impl Into<String>) -> Self {
        self.output_frame_id = Some(frame_id.into());
        self
    }

    pub fn parallel_pairs(mut self, enable: bool) -> Self {
        self.parallel_pairs = Some(enable);
        self
    }

    pub fn debug_dump_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.debug_dump_dir = Some(dir);
        self
    }

    pub fn build(self) -> FusionConfig {
        let default = FusionConfig::default();
        FusionConfig {
            fov_deg: self.fov_deg.unwrap_or(default.fov_deg),
            width: self.width.unwrap_or(default.width),
            height: self.height.unwrap_or(default.height),
            fisheye_config: self.fisheye_config.unwrap_or(default.fisheye_config),
            stereo_paths: self.stereo_paths.unwrap_or(default.stereo_paths),
            photometric_path: self.photometric_path.unwrap_or(default.photometric_path),
            verbose: self.verbose.unwrap_or(default.verbose),
            layout: self.layout.unwrap_or(default.layout),
            photometric_floor: self.photometric_floor.unwrap_or(default.photometric_floor),
            output_frame_id: self.output_frame_id.unwrap_or(default.output_frame_id),
            parallel_pairs: self.parallel_pairs.unwrap_or(default.parallel_pairs),
            debug_dump_dir: self.debug_dump_dir.unwrap_or(default.debug_dump_dir),
        }
    }
}
