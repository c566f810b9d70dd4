use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use quadcam_fusion::depth_fusion::{
    FixedRangeEstimator, FrameMessage, FusionConfig, FusionPipelineNode, Header, PlyPublisher,
    RigDescriptorLoader, Stamp,
};
use quadcam_fusion::logger;

use tracing::{debug, error, info};

/// Replays camera rig frames through the depth fusion pipeline.
#[derive(Debug, Parser)]
#[command(author, version, about = "Fuse quad fisheye frames into point clouds")]
struct Args {
    /// Encoded composite frames (PNG, JPEG, TIFF), processed in order
    #[arg(required = true)]
    frames: Vec<PathBuf>,

    /// Horizontal field of view of each fisheye, in degrees
    #[arg(short = 'f', long = "fov", default_value_t = 190.0)]
    fov: f32,

    /// Fisheye intrinsics file shared by all views
    #[arg(short = 'c', long = "config")]
    fisheye_config: Option<PathBuf>,

    /// Stereo calibration files in pair order, comma separated
    #[arg(short = 's', long = "stereo", value_delimiter = ',')]
    stereo: Vec<PathBuf>,

    /// Grayscale photometric calibration image
    #[arg(short = 'p', long = "photometric")]
    photometric: Option<PathBuf>,

    /// Verbose depth estimation output
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Width of the images handed to the depth estimator
    #[arg(long, default_value_t = 600)]
    width: usize,

    /// Height of the images handed to the depth estimator
    #[arg(long, default_value_t = 300)]
    height: usize,

    /// Run camera pairs concurrently
    #[arg(long)]
    parallel_pairs: bool,

    /// Write corrected views of every frame to this directory
    #[arg(long)]
    debug_dump: Option<PathBuf>,

    /// Directory receiving one PLY file per fused frame
    #[arg(short = 'o', long = "output-dir", default_value = "clouds")]
    output_dir: PathBuf,
}

impl Args {
    fn fusion_config(&self) -> FusionConfig {
        let mut builder = FusionConfig::builder()
            .fov_deg(self.fov)
            .image_size(self.width, self.height)
            .photometric_path(self.photometric.clone())
            .verbose(self.verbose)
            .parallel_pairs(self.parallel_pairs)
            .debug_dump_dir(self.debug_dump.clone());
        if let Some(path) = &self.fisheye_config {
            builder = builder.fisheye_config(path);
        }
        if !self.stereo.is_empty() {
            builder = builder.stereo_paths(self.stereo.iter().cloned());
        }
        builder.build()
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init();

    info!("Starting quadcam-fusion...");

    let publisher = PlyPublisher::new(&args.output_dir)?;
    let node = FusionPipelineNode::new(FixedRangeEstimator::default(), publisher, args.fusion_config());
    node.configure_from_config(&RigDescriptorLoader)
        .context("configuring fusion pipeline")?;

    info!("Fusion pipeline initialized");
    info!("Layout: {:?}", node.config().layout);
    info!(
        "Photometric correction: {}",
        match &node.config().photometric_path {
            Some(path) => path.display().to_string(),
            None => "disabled".to_string(),
        }
    );
    info!("Writing clouds to {}", args.output_dir.display());

    for input in &args.frames {
        let message = match read_frame(input) {
            Ok(message) => message,
            Err(e) => {
                error!("Skipping {}: {:#}", input.display(), e);
                continue;
            }
        };
        match node.on_message_with_timings(message) {
            Ok((cloud, timings)) => {
                info!("{}: {} points", input.display(), cloud.len());
                debug!("Stage timings for {}:\n{}", input.display(), timings.summary());
            }
            Err(e) => error!("{}: {}", input.display(), e),
        }
    }

    let stats = node.stats();
    info!(
        "Done: {} processed, {} dropped",
        stats.processed,
        stats.total_dropped()
    );
    Ok(())
}

/// Wraps an encoded image file as a compressed frame message.
fn read_frame(path: &Path) -> anyhow::Result<FrameMessage> {
    let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let format = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("png")
        .to_ascii_lowercase();
    Ok(FrameMessage::compressed(
        Header::new(Stamp::now(), "quadcam"),
        format,
        data,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_library_config() {
        let args = Args::try_parse_from(["quadcam-fusion", "frame.png"]).unwrap();
        let config = args.fusion_config();
        let default = FusionConfig::default();

        assert_eq!(args.frames, vec![PathBuf::from("frame.png")]);
        assert_eq!(config.fov_deg, 190.0);
        assert_eq!((config.width, config.height), (600, 300));
        assert_eq!(config.stereo_paths, default.stereo_paths);
        assert_eq!(config.fisheye_config, default.fisheye_config);
        assert!(config.photometric_path.is_none());
        assert!(!config.verbose);
        assert_eq!(args.output_dir, PathBuf::from("clouds"));
    }

    #[test]
    fn test_flags_reach_fusion_config() {
        let args = Args::try_parse_from([
            "quadcam-fusion",
            "-f",
            "185",
            "-c",
            "fisheye.yaml",
            "-s",
            "a.yaml,b.yaml",
            "-p",
            "photometric.png",
            "-v",
            "--width",
            "640",
            "--height",
            "360",
            "--parallel-pairs",
            "--debug-dump",
            "dump",
            "-o",
            "out",
            "f1.png",
            "f2.png",
        ])
        .unwrap();
        let config = args.fusion_config();

        assert_eq!(args.frames.len(), 2);
        assert_eq!(config.fov_deg, 185.0);
        assert_eq!(config.fisheye_config, PathBuf::from("fisheye.yaml"));
        assert_eq!(config.stereo_paths, vec![PathBuf::from("a.yaml"), PathBuf::from("b.yaml")]);
        assert_eq!(config.photometric_path, Some(PathBuf::from("photometric.png")));
        assert!(config.verbose);
        assert_eq!((config.width, config.height), (640, 360));
        assert!(config.parallel_pairs);
        assert_eq!(config.debug_dump_dir, Some(PathBuf::from("dump")));
        assert_eq!(args.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_frames_are_required() {
        assert!(Args::try_parse_from(["quadcam-fusion"]).is_err());
    }
}
