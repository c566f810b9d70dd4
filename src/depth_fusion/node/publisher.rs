use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};
use tracing::debug;

use crate::depth_fusion::cloud::{write_ply, FusedCloud, PointCloud2};
use crate::depth_fusion::common::{FusionError, Result};
use crate::depth_fusion::frame::Stamp;

/// What happened to the previous cloud when a new one was handed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// An unread cloud with this stamp was discarded to make room.
    Replaced(Stamp),
}

/// Output boundary of the fusion node.
///
/// Receives the wire message and the fused cloud it was packed from.
pub trait CloudPublisher: Send + Sync {
    fn publish(&self, message: &PointCloud2, cloud: &FusedCloud) -> Result<Delivery>;
}

/// Hands messages to an in-process consumer through a one-slot channel.
///
/// The slot always holds the newest cloud: an unread one is taken back out
/// and replaced, so a lagging consumer skips ahead instead of reading stale
/// data.
pub struct ChannelPublisher {
    sender: Sender<PointCloud2>,
    evict: Receiver<PointCloud2>,
}

impl ChannelPublisher {
    pub fn new() -> (Self, Receiver<PointCloud2>) {
        let (sender, receiver) = bounded(1);
        let publisher = Self {
            sender,
            evict: receiver.clone(),
        };
        (publisher, receiver)
    }
}

impl CloudPublisher for ChannelPublisher {
    fn publish(&self, message: &PointCloud2, _cloud: &FusedCloud) -> Result<Delivery> {
        let mut pending = message.clone();
        let mut replaced = None;
        loop {
            match self.sender.try_send(pending) {
                Ok(()) => {
                    return Ok(replaced.map_or(Delivery::Delivered, Delivery::Replaced));
                }
                Err(TrySendError::Full(returned)) => {
                    pending = returned;
                    // The consumer may have emptied the slot in between.
                    if let Ok(stale) = self.evict.try_recv() {
                        debug!(
                            sec = stale.header.stamp.sec,
                            nsec = stale.header.stamp.nsec,
                            "Evicted unread point cloud"
                        );
                        replaced = Some(stale.header.stamp);
                    }
                }
                Err(TrySendError::Disconnected(_)) => {
                    return Err(FusionError::PublishError(
                        "point cloud channel closed".to_string(),
                    ));
                }
            }
        }
    }
}

/// Writes each cloud to `<dir>/cloud_<sec>_<nsec>.ply`.
pub struct PlyPublisher {
    dir: PathBuf,
}

impl PlyPublisher {
    /// Creates `dir` if needed.
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| {
            FusionError::ConfigError(format!("output directory {}: {}", dir.display(), e))
        })?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, cloud: &FusedCloud) -> PathBuf {
        self.dir.join(format!(
            "cloud_{}_{:09}.ply",
            cloud.stamp.sec, cloud.stamp.nsec
        ))
    }
}

impl CloudPublisher for PlyPublisher {
    fn publish(&self, _message: &PointCloud2, cloud: &FusedCloud) -> Result<Delivery> {
        let path = self.path_for(cloud);
        let file = File::create(&path).map_err(|e| {
            FusionError::PublishError(format!("{}: {}", path.display(), e))
        })?;
        let mut writer = BufWriter::new(file);
        write_ply(&mut writer, cloud)?;
        debug!(path = %path.display(), points = cloud.len(), "Wrote PLY");
        Ok(Delivery::Delivered)
    }
}
