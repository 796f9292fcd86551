//! End-to-end runs: synthetic detections → estimator → gate → PoseFusion.

use std::sync::Arc;

use fieldpose_hal::CameraMount;
use fieldpose_hal::sim::{SimCamera, SimGyro, SyntheticDetector};
use fieldpose_kernel::watchdog::CameraHealth;
use fieldpose_perception::{FieldLandmark, LandmarkRegistry, Pose2d, PoseFusion};
use fieldpose_runtime::{EstimatorConfig, PoseEstimator, TickOutcome, VisionSystem};
use fieldpose_types::Pipeline;

const PERIOD: f64 = 0.02;

fn registry() -> LandmarkRegistry {
    LandmarkRegistry::new(FieldLandmark::default())
        .with_tag(1, Pose2d::from_xy_degrees(8.0, 4.0, 180.0))
        .with_tag(2, Pose2d::from_xy_degrees(7.0, 5.5, 180.0))
        .with_tag(3, Pose2d::from_xy_degrees(0.0, 2.0, 0.0))
}

fn assert_near(actual: Pose2d, expected: Pose2d, tol: f64) {
    let dx = actual.translation.x - expected.translation.x;
    let dy = actual.translation.y - expected.translation.y;
    assert!(
        dx.hypot(dy) < tol,
        "estimate {:?} not within {tol} of {:?}",
        actual,
        expected
    );
}

#[test]
fn tag_detections_pull_fused_estimate_onto_truth() {
    let truth = Pose2d::from_xy_degrees(3.0, 4.0, 0.0);
    let mount = CameraMount::new("front");
    let detector = SyntheticDetector::new(registry(), mount.clone());
    let camera = SimCamera::new("front");
    let feed = camera.handle();
    let gyro = SimGyro::new(0.0);

    let estimator = PoseEstimator::new(
        Box::new(camera),
        mount,
        Arc::new(registry()),
        Arc::new(gyro),
        &EstimatorConfig::default(),
    );
    let mut system = VisionSystem::default();
    system.add_camera(estimator, 0.0);

    let mut fusion = PoseFusion::new(0.5);
    fusion.reset_to(Pose2d::from_xy_degrees(2.0, 3.5, 0.0));

    let mut fused = 0;
    for k in 0..60 {
        let t = k as f64 * PERIOD;
        // Stationary robot: odometry does not move.
        fusion.update_odometry(t, Pose2d::identity());
        feed.push_result(detector.detect_tags(truth, t));
        let reports = system.tick(t, &mut fusion);
        assert_eq!(reports[0].health, CameraHealth::Healthy);
        if reports[0].outcome.is_fused() {
            fused += 1;
        }
    }

    assert_eq!(fused, 60);
    assert_near(fusion.estimate(), truth, 1e-6);
}

#[test]
fn landmark_mode_tracks_a_driving_robot() {
    let mount = CameraMount::new("shooter").with_elevation(30.0, 0.6, 2.64);
    let detector = SyntheticDetector::new(registry(), mount.clone());
    let camera = SimCamera::new("shooter");
    let feed = camera.handle();
    let gyro = SimGyro::new(0.0);

    let mut estimator = PoseEstimator::new(
        Box::new(camera),
        mount,
        Arc::new(registry()),
        Arc::new(gyro),
        &EstimatorConfig {
            pipeline: Pipeline::Green,
            ..EstimatorConfig::default()
        },
    );

    let mut fusion = PoseFusion::new(0.5);
    fusion.reset_to(Pose2d::from_xy_degrees(2.0, 4.6, 0.0));

    let truth_at = |t: f64| Pose2d::from_xy_degrees(3.0 + t, 4.1148, 0.0);
    for k in 0..50 {
        let t = k as f64 * PERIOD;
        let truth = truth_at(t);
        // Odometry frame starts at the origin but tracks motion exactly.
        fusion.update_odometry(t, Pose2d::from_xy_degrees(t, 0.0, 0.0));
        feed.push_result(detector.detect_landmark(truth, t));
        let outcome = estimator.update(&mut fusion);
        assert!(outcome.is_fused(), "tick {k}: {outcome:?}");
    }

    assert_near(fusion.estimate(), truth_at(49.0 * PERIOD), 1e-6);
    assert!(estimator.landmark_distance().is_ok());
}

#[test]
fn confident_tags_never_reach_fusion_under_default_policy() {
    let truth = Pose2d::from_xy_degrees(3.0, 4.0, 0.0);
    let mount = CameraMount::new("front");
    let mut detector = SyntheticDetector::new(registry(), mount.clone());
    detector.ambiguity = 0.05;
    let camera = SimCamera::new("front");
    let feed = camera.handle();

    let mut estimator = PoseEstimator::new(
        Box::new(camera),
        mount,
        Arc::new(registry()),
        Arc::new(SimGyro::new(0.0)),
        &EstimatorConfig::default(),
    );

    let start = Pose2d::from_xy_degrees(2.0, 3.5, 0.0);
    let mut fusion = PoseFusion::new(0.5);
    fusion.reset_to(start);

    for k in 0..10 {
        let t = k as f64 * PERIOD;
        fusion.update_odometry(t, Pose2d::identity());
        feed.push_result(detector.detect_tags(truth, t));
        assert!(matches!(estimator.update(&mut fusion), TickOutcome::Rejected(_)));
    }
    assert_eq!(fusion.estimate(), start);
}

#[test]
fn frozen_camera_is_flagged_while_healthy_one_keeps_fusing() {
    let truth = Pose2d::from_xy_degrees(3.0, 4.0, 0.0);
    let mount_a = CameraMount::new("front");
    let mount_b = CameraMount::new("rear");
    let detector = SyntheticDetector::new(registry(), mount_a.clone());

    let cam_a = SimCamera::new("front");
    let feed_a = cam_a.handle();
    let cam_b = SimCamera::new("rear");
    let feed_b = cam_b.handle();

    let mut system = VisionSystem::new(0.1);
    for (cam, mount) in [(cam_a, mount_a), (cam_b, mount_b)] {
        system.add_camera(
            PoseEstimator::new(
                Box::new(cam),
                mount,
                Arc::new(registry()),
                Arc::new(SimGyro::new(0.0)),
                &EstimatorConfig::default(),
            ),
            0.0,
        );
    }

    let mut fusion = PoseFusion::new(0.5);
    // Rear camera delivers exactly one frame, then freezes.
    feed_b.push_result(detector.detect_tags(truth, 0.0));
    for k in 0..20 {
        let t = k as f64 * PERIOD;
        fusion.update_odometry(t, Pose2d::identity());
        feed_a.push_result(detector.detect_tags(truth, t));
        system.tick(t, &mut fusion);
    }

    let now = 19.0 * PERIOD;
    assert_eq!(system.stale_cameras(now), vec!["rear".to_string()]);
}
