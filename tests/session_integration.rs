//! End-to-end session tests through the public API.
//!
//! A scripted engine stands in for the external particle filter; the
//! tests drive the pipeline with synthetic scans and verify the
//! published maps, corrections and broadcast transforms.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use nalgebra::{Isometry3, Translation3, UnitQuaternion};

use naksha_slam::{
    create_session, EngineParticle, EngineSetup, GridSlamEngine, LaserScan, Pose2D, RangeReading,
    ScanOutcome, ScanPipeline, SlamConfig, SlamOutputs, StaticTransformSource, TrajectoryNode,
    TrajectoryTree, TransformThread, FREE, OCCUPIED, UNKNOWN,
};

/// Engine stand-in: tracks odometry exactly and keeps one particle whose
/// trajectory records every accepted reading.
struct TrackingEngine {
    particles: Vec<EngineParticle>,
    tree: TrajectoryTree,
}

impl TrackingEngine {
    fn new() -> Self {
        Self {
            particles: Vec::new(),
            tree: TrajectoryTree::new(),
        }
    }
}

impl GridSlamEngine for TrackingEngine {
    fn initialize(&mut self, setup: EngineSetup) {
        let node = self.tree.push(TrajectoryNode {
            pose: setup.initial_pose,
            reading: None,
            parent: None,
        });
        self.particles = vec![EngineParticle {
            pose: setup.initial_pose,
            weight: 1.0,
            node,
        }];
    }

    fn process_scan(&mut self, reading: &RangeReading) -> bool {
        let parent = self.particles[0].node;
        let node = self.tree.push(TrajectoryNode {
            pose: reading.odom_pose,
            reading: Some(reading.ranges.clone()),
            parent: Some(parent),
        });
        self.particles[0] = EngineParticle {
            pose: reading.odom_pose,
            weight: 1.0,
            node,
        };
        true
    }

    fn particles(&self) -> &[EngineParticle] {
        &self.particles
    }

    fn best_particle_index(&self) -> usize {
        0
    }

    fn trajectory(&self) -> &TrajectoryTree {
        &self.tree
    }
}

fn scan_at(timestamp_us: u64, range: f32) -> LaserScan {
    let beams = 21;
    let span = 1.0_f32;
    LaserScan {
        frame_id: "laser".to_string(),
        timestamp_us,
        angle_min: -span / 2.0,
        angle_max: span / 2.0,
        angle_increment: span / (beams - 1) as f32,
        range_min: 0.1,
        range_max: 10.0,
        ranges: vec![range; beams],
    }
}

fn mounted_tf() -> StaticTransformSource {
    let tf = StaticTransformSource::new();
    tf.set("base_link", "laser", Isometry3::identity());
    tf.set("odom", "laser", Isometry3::identity());
    tf
}

fn place_robot(tf: &StaticTransformSource, x: f32, y: f32, theta: f32) {
    tf.set(
        "odom",
        "laser",
        Isometry3::from_parts(
            Translation3::new(x, y, 0.0),
            UnitQuaternion::from_euler_angles(0.0, 0.0, theta),
        ),
    );
}

fn test_config() -> SlamConfig {
    let mut config = SlamConfig::default();
    config.bounds.xmin = -8.0;
    config.bounds.ymin = -8.0;
    config.bounds.xmax = 8.0;
    config.bounds.ymax = 8.0;
    config.bounds.delta = 0.1;
    config.map_update_interval_s = 5.0;
    config
}

#[test]
fn test_session_produces_map_and_correction() {
    let tf = mounted_tf();
    let shared = create_session();
    let (outputs, _entropy_rx, map_rx, meta_rx) = SlamOutputs::channels();
    let mut pipeline = ScanPipeline::new(
        test_config(),
        Box::new(tf.clone()),
        Box::new(TrackingEngine::new()),
        shared.clone(),
        outputs,
    );

    let outcome = pipeline.handle_scan(&scan_at(0, 3.0));
    assert_eq!(
        outcome,
        ScanOutcome::Processed {
            accepted: true,
            map_updated: true
        },
        "first accepted scan must produce a map"
    );

    let map = map_rx.try_recv().expect("map published on first scan");
    let meta = meta_rx.try_recv().expect("metadata published with the map");
    assert_eq!(map.info.width, meta.width);
    assert!(map.data.iter().any(|&c| c == OCCUPIED));
    assert!(map.data.iter().any(|&c| c == FREE));
    assert!(map.data.iter().any(|&c| c == UNKNOWN));

    // Estimate tracks odometry, so the correction stays identity.
    let correction = shared.correction();
    assert!(correction.x.abs() < 1e-5);
    assert!(correction.y.abs() < 1e-5);
    assert!(correction.theta.abs() < 1e-5);
}

#[test]
fn test_map_dimensions_never_shrink() {
    let tf = mounted_tf();
    let shared = create_session();
    let (outputs, _entropy_rx, map_rx, _meta_rx) = SlamOutputs::channels();
    let mut pipeline = ScanPipeline::new(
        test_config(),
        Box::new(tf.clone()),
        Box::new(TrackingEngine::new()),
        shared,
        outputs,
    );

    // First map from near the origin.
    pipeline.handle_scan(&scan_at(0, 3.0));
    let first = map_rx.try_recv().expect("first map");

    // The robot wanders out near the edge of the initial bounds and sees
    // far obstacles, forcing the grid to grow.
    place_robot(&tf, 7.0, 0.0, 0.0);
    pipeline.handle_scan(&scan_at(5_000_000, 9.5));
    let second = map_rx.try_recv().expect("second map");
    assert!(
        second.info.width > first.info.width,
        "grid must grow to cover beams past the initial bounds"
    );

    // Back near the origin: the grid keeps its grown size.
    place_robot(&tf, 0.0, 0.0, 0.0);
    pipeline.handle_scan(&scan_at(10_000_000, 3.0));
    let third = map_rx.try_recv().expect("third map");
    assert!(third.info.width >= second.info.width);
    assert!(third.info.height >= second.info.height);
}

#[test]
fn test_rejected_scan_leaves_published_map_untouched() {
    let tf = mounted_tf();
    let shared = create_session();
    let (outputs, _entropy_rx, map_rx, _meta_rx) = SlamOutputs::channels();
    let mut pipeline = ScanPipeline::new(
        test_config(),
        Box::new(tf.clone()),
        Box::new(TrackingEngine::new()),
        shared.clone(),
        outputs,
    );

    pipeline.handle_scan(&scan_at(0, 3.0));
    let _ = map_rx.try_recv();
    let before = shared.latest_map().expect("map exists after first scan");

    // A reconfigured sensor (different beam count) arrives past the
    // update interval; it must be dropped without a synthesis pass.
    let mut bad = scan_at(10_000_000, 3.0);
    bad.ranges.truncate(7);
    let outcome = pipeline.handle_scan(&bad);
    assert!(matches!(outcome, ScanOutcome::Dropped(_)));
    assert!(map_rx.try_recv().is_err(), "no map published for a drop");

    let after = shared.latest_map().expect("map still queryable");
    assert_eq!(before.info.stamp_us, after.info.stamp_us);
    assert_eq!(before.data, after.data);
}

#[test]
fn test_map_query_reflects_latest_synthesis() {
    let tf = mounted_tf();
    let shared = create_session();
    let (outputs, _entropy_rx, _map_rx, _meta_rx) = SlamOutputs::channels();
    let mut pipeline = ScanPipeline::new(
        test_config(),
        Box::new(tf.clone()),
        Box::new(TrackingEngine::new()),
        shared.clone(),
        outputs,
    );

    assert!(
        shared.latest_map().is_none(),
        "query before the first synthesis reports no map"
    );

    pipeline.handle_scan(&scan_at(0, 3.0));
    let first = shared.latest_map().expect("map after first synthesis");

    pipeline.handle_scan(&scan_at(5_000_000, 3.0));
    let second = shared.latest_map().expect("map after second synthesis");
    assert!(second.info.stamp_us > first.info.stamp_us);
}

#[test]
fn test_transform_thread_tracks_correction_updates() {
    let shared = create_session();
    let (tx, rx) = crossbeam_channel::unbounded();
    let running = Arc::new(AtomicBool::new(true));
    let thread = TransformThread::spawn(
        shared.clone(),
        Default::default(),
        Duration::from_millis(2),
        Duration::from_millis(2),
        tx,
        running.clone(),
    )
    .expect("nonzero period spawns the thread");

    // Initial broadcasts carry the identity correction.
    let first = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert!(first.transform.x.abs() < 1e-6);

    // After an update, broadcasts follow.
    shared.set_correction(Pose2D::new(0.5, 0.0, 0.1));
    let updated = loop {
        let stamped = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        if stamped.transform.x.abs() > 1e-6 {
            break stamped;
        }
    };
    assert!((updated.transform.x - 0.5).abs() < 1e-6);
    assert_eq!(updated.parent_frame, "map");
    assert_eq!(updated.child_frame, "odom");

    running.store(false, Ordering::Relaxed);
    drop(rx);
    thread.join().unwrap();
}
