use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{info, info_span, instrument, warn};

use crate::depth_fusion::cloud::{CloudFuser, FusedCloud, PointCloud2};
use crate::depth_fusion::common::{DropReason, FusionError, Result, StageTimings, Timer};
use crate::depth_fusion::config::{FusionConfig, RigConfiguration};
use crate::depth_fusion::depth::{CalibrationLoader, DepthEstimator, PairDepthInvoker};
use crate::depth_fusion::frame::{decode_frame, split, CompositeFrame, FrameMessage, Stamp};
use crate::depth_fusion::node::debug_dump::dump_corrected;
use crate::depth_fusion::node::publisher::{CloudPublisher, Delivery};
use crate::depth_fusion::node::stage::PipelineStage;
use crate::depth_fusion::node::stats::{DropSnapshot, DropStats};
use crate::depth_fusion::photometric::{PhotometricCorrector, PhotometricMap};

/// State installed by `configure`, swapped whole on reconfiguration.
struct ActiveConfig<G> {
    rig: RigConfiguration,
    generators: Vec<G>,
    corrector: PhotometricCorrector,
}

/// Clears the busy flag and returns the stage to `Idle` when a frame ends,
/// however it ends.
struct FrameGuard<'a> {
    busy: &'a AtomicBool,
    stage: &'a AtomicU8,
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        self.stage.store(PipelineStage::Idle as u8, Ordering::Release);
        self.busy.store(false, Ordering::Release);
    }
}

/// Turns composite rig frames into fused, published point clouds.
///
/// One frame is processed at a time. A frame arriving while another is in
/// flight is dropped, never queued.
pub struct FusionPipelineNode<E: DepthEstimator, P: CloudPublisher> {
    estimator: E,
    publisher: P,
    config: FusionConfig,
    invoker: PairDepthInvoker,
    fuser: CloudFuser,
    active: RwLock<Option<Arc<ActiveConfig<E::Generator>>>>,
    busy: AtomicBool,
    stage: AtomicU8,
    stats: DropStats,
}

impl<E: DepthEstimator, P: CloudPublisher> FusionPipelineNode<E, P> {
    pub fn new(estimator: E, publisher: P, config: FusionConfig) -> Self {
        Self {
            invoker: PairDepthInvoker::new(config.verbose, config.parallel_pairs),
            fuser: CloudFuser::new(config.output_frame_id.clone()),
            estimator,
            publisher,
            config,
            active: RwLock::new(None),
            busy: AtomicBool::new(false),
            stage: AtomicU8::new(PipelineStage::Idle as u8),
            stats: DropStats::new(),
        }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    pub fn is_configured(&self) -> bool {
        self.active_config().is_some()
    }

    /// Validates `rig`, loads one generator per pair and installs them with
    /// the photometric map, replacing any previous configuration.
    ///
    /// A map whose size differs from the views is accepted here; every
    /// frame will then fail photometric correction with a `ShapeError`.
    pub fn configure<L>(
        &self,
        loader: &L,
        rig: RigConfiguration,
        photometric_map: Option<PhotometricMap>,
    ) -> Result<()>
    where
        L: CalibrationLoader<Generator = E::Generator>,
    {
        let _span = info_span!("configure").entered();
        rig.validate()?;

        let layout_views = self.config.layout.view_count();
        if rig.view_count != layout_views {
            return Err(FusionError::ConfigError(format!(
                "rig has {} views, frame layout has {}",
                rig.view_count, layout_views
            )));
        }

        let generators = loader
            .load_config(&rig)
            .map_err(|e| FusionError::ConfigError(format!("loading calibration: {:#}", e)))?;
        if generators.len() != rig.pairs.len() {
            return Err(FusionError::ConfigError(format!(
                "calibration loader returned {} generators for {} pairs",
                generators.len(),
                rig.pairs.len()
            )));
        }

        if let Some(map) = &photometric_map {
            let view_dims = self.config.layout.view_dims();
            if map.dims() != view_dims {
                warn!(
                    map = ?map.dims(),
                    view = ?view_dims,
                    "Photometric map size differs from camera views, frames will be dropped"
                );
            }
        }

        info!(
            pairs = rig.pairs.len(),
            active = rig.active_pairs().len(),
            photometric = photometric_map.is_some(),
            "Pipeline configured"
        );

        let corrector = PhotometricCorrector::new(photometric_map.map(Arc::new))
            .with_floor(self.config.photometric_floor);
        let active = ActiveConfig {
            rig,
            generators,
            corrector,
        };
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(active));
        Ok(())
    }

    /// Configures from the node's own [`FusionConfig`], loading the
    /// photometric map from `photometric_path` when set.
    pub fn configure_from_config<L>(&self, loader: &L) -> Result<()>
    where
        L: CalibrationLoader<Generator = E::Generator>,
    {
        let rig = RigConfiguration::from_config(&self.config);
        let map = self
            .config
            .photometric_path
            .as_ref()
            .map(PhotometricMap::load)
            .transpose()?;
        self.configure(loader, rig, map)
    }

    /// Rig of the current configuration.
    pub fn rig(&self) -> Option<RigConfiguration> {
        self.active_config().map(|active| active.rig.clone())
    }

    pub fn current_stage(&self) -> PipelineStage {
        PipelineStage::from_u8(self.stage.load(Ordering::Acquire))
    }

    pub fn stats(&self) -> DropSnapshot {
        self.stats.snapshot()
    }

    /// Processes one frame and publishes its cloud.
    #[instrument(skip_all, fields(sec = frame.header.stamp.sec, nsec = frame.header.stamp.nsec))]
    pub fn on_frame(&self, frame: &CompositeFrame) -> Result<FusedCloud> {
        let mut timings = StageTimings::new();
        self.run_frame(frame, &mut timings)
    }

    /// Like [`on_frame`](Self::on_frame), also returning how long each stage
    /// took.
    #[instrument(skip_all, fields(sec = frame.header.stamp.sec, nsec = frame.header.stamp.nsec))]
    pub fn on_frame_with_timings(&self, frame: &CompositeFrame) -> Result<(FusedCloud, StageTimings)> {
        let mut timings = StageTimings::new();
        let cloud = self.run_frame(frame, &mut timings)?;
        Ok((cloud, timings))
    }

    /// Decodes a transport message and processes it.
    pub fn on_message(&self, message: FrameMessage) -> Result<FusedCloud> {
        let frame = decode_frame(message).map_err(|e| self.report_drop(e))?;
        self.on_frame(&frame)
    }

    /// Like [`on_message`](Self::on_message), also returning stage timings.
    pub fn on_message_with_timings(&self, message: FrameMessage) -> Result<(FusedCloud, StageTimings)> {
        let frame = decode_frame(message).map_err(|e| self.report_drop(e))?;
        self.on_frame_with_timings(&frame)
    }

    fn active_config(&self) -> Option<Arc<ActiveConfig<E::Generator>>> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn enter(&self, stage: PipelineStage) {
        self.stage.store(stage as u8, Ordering::Release);
    }

    fn report_drop(&self, err: FusionError) -> FusionError {
        let reason = err.drop_reason();
        let count = self.stats.record_drop(reason);
        warn!(
            %reason,
            count,
            total_dropped = self.stats.snapshot().total_dropped(),
            error = %err,
            "Frame dropped"
        );
        err
    }

    fn report_superseded(&self, stale: Stamp) {
        let reason = DropReason::Superseded;
        let count = self.stats.record_drop(reason);
        warn!(
            %reason,
            count,
            total_dropped = self.stats.snapshot().total_dropped(),
            stale_sec = stale.sec,
            stale_nsec = stale.nsec,
            "Unread point cloud replaced by a newer one"
        );
    }

    fn run_frame(&self, frame: &CompositeFrame, timings: &mut StageTimings) -> Result<FusedCloud> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(self.report_drop(FusionError::PipelineBusy));
        }
        let _guard = FrameGuard {
            busy: &self.busy,
            stage: &self.stage,
        };

        match self.process(frame, timings) {
            Ok(cloud) => {
                let processed = self.stats.record_processed();
                info!(
                    points = cloud.len(),
                    processed,
                    elapsed_ms = timings.total_duration().as_secs_f64() * 1000.0,
                    "Published fused cloud"
                );
                Ok(cloud)
            }
            Err(e) => Err(self.report_drop(e)),
        }
    }

    fn process(&self, frame: &CompositeFrame, timings: &mut StageTimings) -> Result<FusedCloud> {
        let active = self.active_config().ok_or(FusionError::NotConfigured)?;

        self.enter(PipelineStage::Splitting);
        let timer = Timer::start("split_frame");
        let views = {
            let _span = info_span!("split_frame").entered();
            split(frame, &self.config.layout)?
        };
        let (name, duration) = timer.stop();
        timings.add_step(name, duration);

        self.enter(PipelineStage::Correcting);
        let timer = Timer::start("photometric_correct");
        let corrected = {
            let _span = info_span!("photometric_correct").entered();
            active.corrector.correct_all(&views)?
        };
        let (name, duration) = timer.stop();
        timings.add_step(name, duration);

        if let Some(dir) = &self.config.debug_dump_dir {
            if let Err(e) = dump_corrected(dir, frame.header.stamp, &corrected, &self.config.layout) {
                warn!(error = %e, "Debug dump failed");
            }
        }

        self.enter(PipelineStage::Estimating);
        let timer = Timer::start("estimate_pairs");
        let results = {
            let _span = info_span!("estimate_pairs", pairs = active.rig.active_pairs().len()).entered();
            self.invoker
                .run(&self.estimator, &active.generators, &corrected, &views)?
        };
        let (name, duration) = timer.stop();
        timings.add_step(name, duration);

        self.enter(PipelineStage::Fusing);
        let timer = Timer::start("fuse_clouds");
        let cloud = {
            let _span = info_span!("fuse_clouds").entered();
            self.fuser.merge(results, frame.header.stamp)?
        };
        let (name, duration) = timer.stop();
        timings.add_step(name, duration);

        self.enter(PipelineStage::Publishing);
        let timer = Timer::start("publish_cloud");
        let delivery = {
            let _span = info_span!("publish_cloud", points = cloud.len()).entered();
            let message = PointCloud2::from_fused(&cloud);
            self.publisher.publish(&message, &cloud)?
        };
        let (name, duration) = timer.stop();
        timings.add_step(name, duration);

        if let Delivery::Replaced(stale) = delivery {
            self.report_superseded(stale);
        }

        Ok(cloud)
    }
}
