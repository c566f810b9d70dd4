use std::sync::atomic::{AtomicU64, Ordering};

use crate::depth_fusion::common::DropReason;

/// Frame counters of one pipeline instance.
#[derive(Debug, Default)]
pub struct DropStats {
    processed: AtomicU64,
    busy: AtomicU64,
    not_configured: AtomicU64,
    decode: AtomicU64,
    shape: AtomicU64,
    depth_estimation: AtomicU64,
    empty_fusion: AtomicU64,
    publish: AtomicU64,
    superseded: AtomicU64,
    other: AtomicU64,
}

impl DropStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self, reason: DropReason) -> &AtomicU64 {
        match reason {
            DropReason::Busy => &self.busy,
            DropReason::NotConfigured => &self.not_configured,
            DropReason::Decode => &self.decode,
            DropReason::Shape => &self.shape,
            DropReason::DepthEstimation => &self.depth_estimation,
            DropReason::EmptyFusion => &self.empty_fusion,
            DropReason::Publish => &self.publish,
            DropReason::Superseded => &self.superseded,
            DropReason::Other => &self.other,
        }
    }

    /// Counts one dropped frame and returns the new count for `reason`.
    pub fn record_drop(&self, reason: DropReason) -> u64 {
        self.counter(reason).fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Counts one published frame and returns the new total.
    pub fn record_processed(&self) -> u64 {
        self.processed.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn dropped(&self, reason: DropReason) -> u64 {
        self.counter(reason).load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> DropSnapshot {
        DropSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            busy: self.dropped(DropReason::Busy),
            not_configured: self.dropped(DropReason::NotConfigured),
            decode: self.dropped(DropReason::Decode),
            shape: self.dropped(DropReason::Shape),
            depth_estimation: self.dropped(DropReason::DepthEstimation),
            empty_fusion: self.dropped(DropReason::EmptyFusion),
            publish: self.dropped(DropReason::Publish),
            superseded: self.dropped(DropReason::Superseded),
            other: self.dropped(DropReason::Other),
        }
    }
}

/// Point-in-time copy of [`DropStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DropSnapshot {
    pub processed: u64,
    pub busy: u64,
    pub not_configured: u64,
    pub decode: u64,
    pub shape: u64,
    pub depth_estimation: u64,
    pub empty_fusion: u64,
    pub publish: u64,
    /// Clouds published but replaced before the consumer read them
    pub superseded: u64,
    pub other: u64,
}

impl DropSnapshot {
    pub fn total_dropped(&self) -> u64 {
        self.busy
            + self.not_configured
            + self.decode
            + self.shape
            + self.depth_estimation
            + self.empty_fusion
            + self.publish
            + self.superseded
            + self.other
    }
}
