//! `fieldpose sim` – closed-loop synthetic run.
//!
//! A robot drives a circle around the field centre while facing it.  Every
//! configured camera sees synthetic detections rendered from the true pose;
//! wheel odometry over-reads distance slightly, and the vision updates pull
//! the fused estimate back onto the truth.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use colored::Colorize;
use fieldpose_hal::sim::{SimActuator, SimCamera, SimCameraHandle, SimGyro, SyntheticDetector};
use fieldpose_hal::Actuator;
use fieldpose_perception::{FieldDimensions, Pose2d, PoseFusion, Rotation2d, Translation2d};
use fieldpose_runtime::{CommandScheduler, PoseEstimator, StopActuator, VisionSystem};
use fieldpose_types::Pipeline;
use tracing::{info, warn};

use crate::config::Config;

const CIRCLE_RADIUS_M: f64 = 2.0;
const ANGULAR_RATE_RAD_S: f64 = 0.5;
/// Odometry reads this much more distance than was travelled.
const ODOMETRY_SCALE: f64 = 1.02;
const DRIVE_OUTPUT: f64 = 0.6;
const REPORT_EVERY_TICKS: u64 = 50;

/// True robot pose at `t` seconds.
pub fn circle_pose(field: &FieldDimensions, t: f64) -> Pose2d {
    let phase = ANGULAR_RATE_RAD_S * t;
    let center = field.center();
    Pose2d::new(
        center.plus(Translation2d::new(phase.cos(), phase.sin()).scale(CIRCLE_RADIUS_M)),
        Rotation2d::from_radians(phase + std::f64::consts::PI),
    )
}

/// Odometry-frame pose: starts at the origin and over-reads translation.
fn odometry_pose(start: Pose2d, truth: Pose2d) -> Pose2d {
    let rel = truth.relative_to(start);
    Pose2d::new(rel.translation.scale(ODOMETRY_SCALE), rel.rotation)
}

struct SimFeed {
    handle: SimCameraHandle,
    detector: SyntheticDetector,
}

/// Per-run counters.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SimStats {
    pub ticks: u64,
    pub fused: u64,
    pub final_error_m: f64,
}

/// Run the loop until `ticks` elapse or `shutdown` is raised.  `period`
/// is slept between ticks.
pub fn simulate(
    cfg: &Config,
    ticks: Option<u64>,
    period: Duration,
    shutdown: &AtomicBool,
) -> Result<SimStats, String> {
    if cfg.cameras.is_empty() {
        return Err("config lists no cameras".to_string());
    }
    let dt = cfg.loop_period_ms as f64 / 1000.0;
    let field = cfg.estimator.gate.field;
    let registry = cfg.registry();
    let fiducial = cfg.estimator.pipeline == Pipeline::AprilTag;

    let start = circle_pose(&field, 0.0);
    let gyro = SimGyro::new(start.rotation.degrees());
    let mut system = VisionSystem::new(cfg.frame_timeout_seconds);
    let mut feeds = Vec::with_capacity(cfg.cameras.len());
    for mount in &cfg.cameras {
        let camera = SimCamera::new(mount.hostname.clone());
        let mut detector = SyntheticDetector::new(registry.clone(), mount.clone());
        detector.max_range_m = 12.0;
        feeds.push(SimFeed {
            handle: camera.handle(),
            detector,
        });
        system.add_camera(
            PoseEstimator::new(
                Box::new(camera),
                mount.clone(),
                Arc::new(registry.clone()),
                Arc::new(gyro.clone()),
                &cfg.estimator,
            ),
            0.0,
        );
    }

    let mut fusion = PoseFusion::new(cfg.vision_trust);
    fusion.reset_to(start);

    let mut stats = SimStats::default();
    while ticks.is_none_or(|n| stats.ticks < n) && !shutdown.load(Ordering::SeqCst) {
        let t = stats.ticks as f64 * dt;
        let truth = circle_pose(&field, t);
        gyro.set_heading_degrees(truth.rotation.degrees());
        fusion.update_odometry(t, odometry_pose(start, truth));

        for feed in &feeds {
            let result = if fiducial {
                feed.detector.detect_tags(truth, t)
            } else {
                feed.detector.detect_landmark(truth, t)
            };
            feed.handle.push_result(result);
        }
        let reports = system.tick(t, &mut fusion);
        stats.fused += reports.iter().filter(|r| r.outcome.is_fused()).count() as u64;
        stats.ticks += 1;
        stats.final_error_m = fusion.estimate().translation.distance(truth.translation);

        if stats.ticks % REPORT_EVERY_TICKS == 0 {
            let est = fusion.estimate();
            println!(
                "  t={:>7.2}s  truth=({:>6.2}, {:>6.2})  est=({:>6.2}, {:>6.2})  err={}  fused={}",
                t,
                truth.translation.x,
                truth.translation.y,
                est.translation.x,
                est.translation.y,
                format!("{:.3} m", stats.final_error_m).cyan(),
                stats.fused
            );
        }
        if !period.is_zero() {
            thread::sleep(period);
        }
    }
    Ok(stats)
}

pub fn run(cfg: &Config, ticks: Option<u64>) -> Result<(), String> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping simulation …".yellow().bold());
        flag.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; stop with --ticks instead");
    }

    let drivetrain = SimActuator::shared("drivetrain");
    drivetrain
        .lock()
        .map_err(|_| "drivetrain lock poisoned".to_string())?
        .set_output(DRIVE_OUTPUT)
        .map_err(|e| e.to_string())?;

    info!(pipeline = %cfg.estimator.pipeline, cameras = cfg.cameras.len(), "simulation started");
    let stats = simulate(
        cfg,
        ticks,
        Duration::from_millis(cfg.loop_period_ms),
        &shutdown,
    )?;

    let mut scheduler = CommandScheduler::new();
    scheduler
        .schedule(Box::new(StopActuator::new(drivetrain.clone())))
        .map_err(|e| e.to_string())?;
    scheduler.run();
    let output = drivetrain
        .lock()
        .map_err(|_| "drivetrain lock poisoned".to_string())?
        .output();

    println!();
    println!(
        "  {} {} ticks, {} fused measurements, final error {:.3} m, drivetrain output {}",
        "✓".green().bold(),
        stats.ticks,
        stats.fused,
        stats.final_error_m,
        output
    );
    Ok(())
}
