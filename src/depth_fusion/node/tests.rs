#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Barrier, Mutex};
    use std::thread;

    use crate::depth_fusion::cloud::{Color, PointCloud2, Point3};
    use crate::depth_fusion::common::{FusionError, Image, Result, SubImage};
    use crate::depth_fusion::config::{FusionConfig, RigConfiguration};
    use crate::depth_fusion::depth::{CalibrationLoader, DepthEstimator};
    use crate::depth_fusion::frame::{
        split, CompositeFrame, FrameLayout, FrameMessage, Header, RawImage, Stamp,
    };
    use crate::depth_fusion::node::{
        ChannelPublisher, CloudPublisher, Delivery, FusionPipelineNode, PipelineStage,
    };
    use crate::depth_fusion::photometric::PhotometricMap;
    use crate::depth_fusion::cloud::FusedCloud;

    struct Gate {
        armed: AtomicBool,
        entered: Barrier,
        release: Barrier,
    }

    struct MockEstimator {
        points_per_pair: usize,
        fail_on: Option<usize>,
        calls: Arc<Mutex<Vec<usize>>>,
        seen_views: Arc<Mutex<Vec<(Vec<SubImage>, Vec<SubImage>)>>>,
        gate: Option<Arc<Gate>>,
    }

    impl MockEstimator {
        fn new(points_per_pair: usize) -> Self {
            Self {
                points_per_pair,
                fail_on: None,
                calls: Arc::new(Mutex::new(Vec::new())),
                seen_views: Arc::new(Mutex::new(Vec::new())),
                gate: None,
            }
        }
    }

    impl DepthEstimator for MockEstimator {
        type Generator = usize;

        fn estimate(
            &self,
            generator: &usize,
            corrected: &[SubImage],
            raw: &[SubImage],
            _verbose: bool,
        ) -> anyhow::Result<(Vec<Point3>, Vec<Color>)> {
            assert_eq!(corrected.len(), raw.len());
            self.calls.lock().unwrap().push(*generator);
            self.seen_views
                .lock()
                .unwrap()
                .push((corrected.to_vec(), raw.to_vec()));
            if let Some(gate) = &self.gate {
                if gate.armed.swap(false, Ordering::SeqCst) {
                    gate.entered.wait();
                    gate.release.wait();
                }
            }
            if self.fail_on == Some(*generator) {
                anyhow::bail!("mock estimator failure");
            }
            let points = (0..self.points_per_pair)
                .map(|i| Point3::new(*generator as f32, i as f32, 0.0))
                .collect();
            let colors = vec![Color::gray(*generator as f32); self.points_per_pair];
            Ok((points, colors))
        }
    }

    struct MockLoader {
        should_fail: bool,
        drop_last: bool,
    }

    impl CalibrationLoader for MockLoader {
        type Generator = usize;

        fn load_config(&self, rig: &RigConfiguration) -> anyhow::Result<Vec<usize>> {
            if self.should_fail {
                anyhow::bail!("stereo_calib_1_0.yaml: no such file");
            }
            let mut generators: Vec<usize> = rig.pairs.iter().map(|p| p.index).collect();
            if self.drop_last {
                generators.pop();
            }
            Ok(generators)
        }
    }

    const LOADER: MockLoader = MockLoader {
        should_fail: false,
        drop_last: false,
    };

    #[derive(Clone)]
    struct MockPublisher {
        should_fail: bool,
        published: Arc<Mutex<Vec<PointCloud2>>>,
    }

    impl MockPublisher {
        fn new() -> Self {
            Self {
                should_fail: false,
                published: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl CloudPublisher for MockPublisher {
        fn publish(&self, message: &PointCloud2, _cloud: &FusedCloud) -> Result<Delivery> {
            if self.should_fail {
                return Err(FusionError::PublishError("Mock publish error".to_string()));
            }
            self.published.lock().unwrap().push(message.clone());
            Ok(Delivery::Delivered)
        }
    }

    fn small_config() -> FusionConfig {
        FusionConfig::builder()
            .layout(FrameLayout::side_by_side(4, 8, 4))
            .build()
    }

    fn frame_for(layout: &FrameLayout, channels: usize, stamp: Stamp) -> CompositeFrame {
        let (width, height) = layout.composite_dims();
        let data = (0..width * height * channels)
            .map(|v| (v % 200) as f32 + 1.0)
            .collect();
        CompositeFrame::new(
            Header::new(stamp, "quadcam"),
            Image::new(width, height, channels, data).unwrap(),
        )
    }

    fn configured_node(
        estimator: MockEstimator,
        publisher: MockPublisher,
        config: FusionConfig,
    ) -> FusionPipelineNode<MockEstimator, MockPublisher> {
        let node = FusionPipelineNode::new(estimator, publisher, config);
        node.configure_from_config(&LOADER).unwrap();
        node
    }

    #[test]
    fn test_four_pair_rig_publishes_three_pairs() {
        let estimator = MockEstimator::new(100);
        let calls = estimator.calls.clone();
        let publisher = MockPublisher::new();
        let published = publisher.published.clone();
        let config = small_config();
        let frame = frame_for(&config.layout, 3, Stamp::new(12, 500));
        let node = configured_node(estimator, publisher, config);

        let cloud = node.on_frame(&frame).unwrap();

        assert_eq!(cloud.len(), 300);
        assert_eq!(cloud.stamp, Stamp::new(12, 500));
        assert_eq!(cloud.frame_id, "world");
        assert_eq!(*calls.lock().unwrap(), vec![1, 2, 3]);
        // Pair order is kept: rows 0..100 come from pair 1.
        assert_eq!(cloud.points()[0].x, 1.0);
        assert_eq!(cloud.points()[299].x, 3.0);

        let published = published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].width, 300);
        assert_eq!(published[0].header.stamp, Stamp::new(12, 500));
        assert_eq!(node.stats().processed, 1);
        assert_eq!(node.current_stage(), PipelineStage::Idle);
    }

    #[test]
    fn test_photometric_size_mismatch_drops_frame() {
        let estimator = MockEstimator::new(10);
        let calls = estimator.calls.clone();
        let publisher = MockPublisher::new();
        let published = publisher.published.clone();
        let config = FusionConfig::builder()
            .layout(FrameLayout::side_by_side(4, 640, 360))
            .build();
        let frame = frame_for(&config.layout, 1, Stamp::new(1, 0));
        let node = FusionPipelineNode::new(estimator, publisher, config.clone());

        node.configure(
            &LOADER,
            RigConfiguration::from_config(&config),
            Some(PhotometricMap::uniform(600, 300, 0.5)),
        )
        .unwrap();
        let result = node.on_frame(&frame);

        assert!(matches!(result, Err(FusionError::ShapeError { .. })));
        assert!(calls.lock().unwrap().is_empty());
        assert!(published.lock().unwrap().is_empty());
        assert_eq!(node.stats().shape, 1);
        assert_eq!(node.current_stage(), PipelineStage::Idle);
    }

    #[test]
    fn test_failing_pair_drops_whole_frame() {
        let mut estimator = MockEstimator::new(10);
        estimator.fail_on = Some(2);
        let publisher = MockPublisher::new();
        let published = publisher.published.clone();
        let config = small_config();
        let frame = frame_for(&config.layout, 3, Stamp::new(2, 0));
        let node = configured_node(estimator, publisher, config);

        match node.on_frame(&frame) {
            Err(FusionError::DepthEstimationError { pair, reason }) => {
                assert_eq!(pair, 2);
                assert!(reason.contains("mock estimator failure"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(published.lock().unwrap().is_empty());
        assert_eq!(node.stats().depth_estimation, 1);
        assert_eq!(node.current_stage(), PipelineStage::Idle);
    }

    #[test]
    fn test_frame_before_configure() {
        let config = small_config();
        let frame = frame_for(&config.layout, 3, Stamp::default());
        let node = FusionPipelineNode::new(MockEstimator::new(1), MockPublisher::new(), config);

        assert!(!node.is_configured());
        assert!(matches!(node.on_frame(&frame), Err(FusionError::NotConfigured)));
        assert_eq!(node.stats().not_configured, 1);
    }

    #[test]
    fn test_frame_during_estimation_is_dropped() {
        let gate = Arc::new(Gate {
            armed: AtomicBool::new(true),
            entered: Barrier::new(2),
            release: Barrier::new(2),
        });
        let mut estimator = MockEstimator::new(10);
        estimator.gate = Some(gate.clone());
        let publisher = MockPublisher::new();
        let published = publisher.published.clone();
        let config = small_config();
        let frame = frame_for(&config.layout, 3, Stamp::new(3, 0));
        let node = configured_node(estimator, publisher, config);

        let (stage_seen, second, first) = thread::scope(|s| {
            let worker = s.spawn(|| node.on_frame(&frame));
            gate.entered.wait();
            let stage_seen = node.current_stage();
            let second = node.on_frame(&frame);
            gate.release.wait();
            (stage_seen, second, worker.join().unwrap())
        });

        assert_eq!(stage_seen, PipelineStage::Estimating);
        assert!(matches!(second, Err(FusionError::PipelineBusy)));
        assert_eq!(first.unwrap().len(), 30);
        assert_eq!(published.lock().unwrap().len(), 1);

        let stats = node.stats();
        assert_eq!(stats.busy, 1);
        assert_eq!(stats.processed, 1);
        assert_eq!(stats.total_dropped(), 1);
    }

    #[test]
    fn test_reconfigure_replaces_rig() {
        let config = small_config();
        let frame = frame_for(&config.layout, 3, Stamp::new(4, 0));
        let node = configured_node(MockEstimator::new(100), MockPublisher::new(), config.clone());
        assert_eq!(node.on_frame(&frame).unwrap().len(), 300);

        let three_pairs = FusionConfig::builder()
            .layout(config.layout)
            .stereo_paths(["stereo_calib_1_0.yaml", "stereo_calib_2_1.yaml", "stereo_calib_3_2.yaml"])
            .build();
        node.configure(&LOADER, RigConfiguration::from_config(&three_pairs), None)
            .unwrap();

        assert_eq!(node.rig().unwrap().pairs.len(), 3);
        assert_eq!(node.on_frame(&frame).unwrap().len(), 200);
    }

    #[test]
    fn test_configure_rejects_bad_rigs() {
        let config = small_config();
        let node = FusionPipelineNode::new(MockEstimator::new(1), MockPublisher::new(), config.clone());

        let failing = MockLoader {
            should_fail: true,
            drop_last: false,
        };
        let result = node.configure(&failing, RigConfiguration::from_config(&config), None);
        assert!(matches!(result, Err(FusionError::ConfigError(msg)) if msg.contains("stereo_calib_1_0")));

        let short = MockLoader {
            should_fail: false,
            drop_last: true,
        };
        let result = node.configure(&short, RigConfiguration::from_config(&config), None);
        assert!(matches!(result, Err(FusionError::ConfigError(_))));

        let two_views = FusionConfig::builder()
            .layout(FrameLayout::side_by_side(2, 8, 4))
            .stereo_paths(["a.yaml", "b.yaml"])
            .build();
        let result = node.configure(&LOADER, RigConfiguration::from_config(&two_views), None);
        assert!(matches!(result, Err(FusionError::ConfigError(_))));

        assert!(!node.is_configured());
    }

    #[test]
    fn test_timings_cover_every_stage() {
        let config = small_config();
        let frame = frame_for(&config.layout, 3, Stamp::new(5, 0));
        let node = configured_node(MockEstimator::new(5), MockPublisher::new(), config);

        let (cloud, timings) = node.on_frame_with_timings(&frame).unwrap();

        assert_eq!(cloud.len(), 15);
        let names: Vec<_> = timings.steps().iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec!["split_frame", "photometric_correct", "estimate_pairs", "fuse_clouds", "publish_cloud"]
        );
    }

    #[test]
    fn test_parallel_pairs_keep_pair_order() {
        let config = FusionConfig::builder()
            .layout(FrameLayout::side_by_side(4, 8, 4))
            .parallel_pairs(true)
            .build();
        let frame = frame_for(&config.layout, 3, Stamp::new(6, 0));
        let node = configured_node(MockEstimator::new(50), MockPublisher::new(), config);

        let cloud = node.on_frame(&frame).unwrap();
        let pair_of_row: Vec<f32> = cloud.points().iter().step_by(50).map(|p| p.x).collect();
        assert_eq!(pair_of_row, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_publish_failure_is_counted() {
        let config = small_config();
        let frame = frame_for(&config.layout, 3, Stamp::new(7, 0));
        let mut publisher = MockPublisher::new();
        publisher.should_fail = true;
        let node = configured_node(MockEstimator::new(5), publisher, config);

        assert!(matches!(node.on_frame(&frame), Err(FusionError::PublishError(_))));
        assert_eq!(node.stats().publish, 1);
        assert_eq!(node.stats().processed, 0);
    }

    #[test]
    fn test_estimator_gets_gray_corrected_and_raw_color_views() {
        let estimator = MockEstimator::new(1);
        let seen_views = estimator.seen_views.clone();
        let config = small_config();
        let layout = config.layout;
        let frame = frame_for(&layout, 3, Stamp::new(8, 0));
        let node = FusionPipelineNode::new(estimator, MockPublisher::new(), config.clone());
        node.configure(
            &LOADER,
            RigConfiguration::from_config(&config),
            Some(PhotometricMap::uniform(8, 4, 0.5)),
        )
        .unwrap();

        assert_eq!(node.on_frame(&frame).unwrap().len(), 3);

        let split_views = split(&frame, &layout).unwrap();
        let seen_views = seen_views.lock().unwrap();
        assert_eq!(seen_views.len(), 3);
        let (corrected, raw) = &seen_views[0];
        assert_eq!(corrected.len(), 4);
        assert_eq!(raw.len(), 4);

        for (view, split_view) in split_views.iter().enumerate() {
            assert_eq!(raw[view], *split_view);
            assert_eq!(raw[view].channels, 3);

            let corrected_view = &corrected[view];
            assert_eq!(corrected_view.channels, 1);
            assert_eq!(corrected_view.dims(), split_view.dims());
            for (k, px) in split_view.data.chunks_exact(3).enumerate() {
                let gray = (px[0] * 0.114 + px[1] * 0.587 + px[2] * 0.299).round();
                assert!(
                    (corrected_view.data[k] - gray / 0.5).abs() < 1e-3,
                    "view {} pixel {}: {} vs {}",
                    view,
                    k,
                    corrected_view.data[k],
                    gray / 0.5
                );
            }
        }
    }

    #[test]
    fn test_without_map_estimator_gets_untouched_views() {
        let estimator = MockEstimator::new(1);
        let seen_views = estimator.seen_views.clone();
        let config = small_config();
        let frame = frame_for(&config.layout, 3, Stamp::new(8, 1));
        let split_views = split(&frame, &config.layout).unwrap();
        let node = configured_node(estimator, MockPublisher::new(), config);

        node.on_frame(&frame).unwrap();

        let seen_views = seen_views.lock().unwrap();
        let (corrected, raw) = &seen_views[0];
        assert_eq!(*corrected, split_views);
        assert_eq!(*raw, split_views);
    }

    #[test]
    fn test_debug_dump_writes_corrected_views() {
        let dir = tempfile::tempdir().unwrap();
        let config = FusionConfig::builder()
            .layout(FrameLayout::side_by_side(4, 8, 4))
            .debug_dump_dir(Some(dir.path().to_path_buf()))
            .build();
        let frame = frame_for(&config.layout, 3, Stamp::new(9, 0));
        let node = configured_node(MockEstimator::new(1), MockPublisher::new(), config);

        node.on_frame(&frame).unwrap();
        assert!(dir.path().join("corrected_9_000000000.tif").exists());
    }

    #[test]
    fn test_on_message_decodes_raw_frame() {
        let config = small_config();
        let (width, height) = config.layout.composite_dims();
        let node = configured_node(MockEstimator::new(4), MockPublisher::new(), config);

        let image = RawImage {
            width: width as u32,
            height: height as u32,
            encoding: "bgr8".to_string(),
            is_bigendian: false,
            step: (width * 3) as u32,
            data: vec![128; width * height * 3],
        };
        let cloud = node
            .on_message(FrameMessage::raw(Header::new(Stamp::new(10, 0), "quadcam"), image))
            .unwrap();
        assert_eq!(cloud.len(), 12);

        let broken = RawImage {
            width: 2,
            height: 2,
            encoding: "yuv422".to_string(),
            is_bigendian: false,
            step: 4,
            data: vec![0; 8],
        };
        let result = node.on_message(FrameMessage::raw(Header::default(), broken));
        assert!(matches!(result, Err(FusionError::DecodeError(_))));
        assert_eq!(node.stats().decode, 1);
    }

    #[test]
    fn test_channel_publisher_end_to_end() {
        let config = small_config();
        let frame = frame_for(&config.layout, 3, Stamp::new(11, 0));
        let (publisher, receiver) = ChannelPublisher::new();
        let node = FusionPipelineNode::new(MockEstimator::new(2), publisher, config);
        node.configure_from_config(&LOADER).unwrap();

        node.on_frame(&frame).unwrap();
        let message = receiver.try_recv().unwrap();
        let rows = message.read_points().unwrap();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].1, Color::gray(1.0));
        assert_eq!(node.stats().superseded, 0);
    }

    #[test]
    fn test_lagging_consumer_sees_newest_cloud() {
        let config = small_config();
        let layout = config.layout;
        let (publisher, receiver) = ChannelPublisher::new();
        let node = FusionPipelineNode::new(MockEstimator::new(2), publisher, config);
        node.configure_from_config(&LOADER).unwrap();

        for sec in 1..=3 {
            node.on_frame(&frame_for(&layout, 3, Stamp::new(sec, 0))).unwrap();
        }

        let message = receiver.try_recv().unwrap();
        assert_eq!(message.header.stamp, Stamp::new(3, 0));
        assert!(receiver.try_recv().is_err());

        let stats = node.stats();
        assert_eq!(stats.processed, 3);
        assert_eq!(stats.superseded, 2);
        assert_eq!(stats.total_dropped(), 2);
    }

    #[test]
    fn test_on_message_with_timings() {
        let config = small_config();
        let (width, height) = config.layout.composite_dims();
        let node = configured_node(MockEstimator::new(1), MockPublisher::new(), config);

        let image = RawImage {
            width: width as u32,
            height: height as u32,
            encoding: "mono8".to_string(),
            is_bigendian: false,
            step: width as u32,
            data: vec![64; width * height],
        };
        let (cloud, timings) = node
            .on_message_with_timings(FrameMessage::raw(Header::new(Stamp::new(12, 0), "quadcam"), image))
            .unwrap();

        assert_eq!(cloud.len(), 3);
        assert_eq!(timings.steps().len(), 5);
        assert!(timings.summary().contains("estimate_pairs"));
    }
}
