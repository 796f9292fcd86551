//! In-process simulation backends for headless tests and the `sim` CLI.
//!
//! - [`SimCamera`] replays scripted [`DetectionResult`]s and records every
//!   pipeline/illuminator command.  Keep a [`SimCameraHandle`] to push new
//!   results and inspect commands after the camera has been moved into an
//!   estimator.
//! - [`SyntheticDetector`] renders what a mounted camera would report for a
//!   known robot pose: visible fiducials with camera-relative transforms, or
//!   the colored landmark as yaw/pitch angles.
//! - [`SimGyro`] and [`SimActuator`] record state and always succeed.
//!
//! # Example
//!
//! ```rust
//! use fieldpose_hal::camera::VisionCamera;
//! use fieldpose_hal::sim::SimCamera;
//! use fieldpose_perception::DetectionResult;
//!
//! let mut camera = SimCamera::new("front");
//! let handle = camera.handle();
//!
//! handle.push_result(DetectionResult::empty(1.0));
//! assert_eq!(camera.latest_result().timestamp_seconds, 1.0);
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fieldpose_perception::{
    DetectionResult, LandmarkRegistry, Pose2d, Rotation3d, TrackedTarget, Transform3d,
    Translation3d,
};
use fieldpose_types::{LedMode, VisionError};
use tracing::debug;

use crate::actuator::Actuator;
use crate::camera::{CameraMount, VisionCamera};
use crate::gyro::HeadingSource;

fn lock<T: ?Sized>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ────────────────────────────────────────────────────────────────────────────
// Scripted camera
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct SimCameraState {
    queued: VecDeque<DetectionResult>,
    current: DetectionResult,
    pipeline_index: Option<u8>,
    led: Option<LedMode>,
    led_commands: usize,
    fail_commands: bool,
}

/// A simulated camera.  Each read consumes the next queued result; when the
/// queue is empty the previous result is returned again, as a real
/// coprocessor keeps serving its last frame.
pub struct SimCamera {
    id: String,
    state: Arc<Mutex<SimCameraState>>,
}

/// Shared view of a [`SimCamera`]'s state.
#[derive(Clone)]
pub struct SimCameraHandle {
    state: Arc<Mutex<SimCameraState>>,
}

impl SimCamera {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: Arc::new(Mutex::new(SimCameraState::default())),
        }
    }

    pub fn handle(&self) -> SimCameraHandle {
        SimCameraHandle {
            state: Arc::clone(&self.state),
        }
    }

    fn command_fault(&self, what: &str) -> VisionError {
        VisionError::HardwareFault {
            component: self.id.clone(),
            details: format!("simulated {what} failure"),
        }
    }
}

impl VisionCamera for SimCamera {
    fn id(&self) -> &str {
        &self.id
    }

    fn latest_result(&mut self) -> DetectionResult {
        let mut state = lock(&self.state);
        if let Some(next) = state.queued.pop_front() {
            state.current = next;
        }
        state.current.clone()
    }

    fn set_pipeline_index(&mut self, index: u8) -> Result<(), VisionError> {
        let mut state = lock(&self.state);
        if state.fail_commands {
            return Err(self.command_fault("pipeline select"));
        }
        state.pipeline_index = Some(index);
        debug!(camera = %self.id, index, "sim pipeline selected");
        Ok(())
    }

    fn set_led(&mut self, mode: LedMode) -> Result<(), VisionError> {
        let mut state = lock(&self.state);
        if state.fail_commands {
            return Err(self.command_fault("illuminator"));
        }
        state.led = Some(mode);
        state.led_commands += 1;
        Ok(())
    }
}

impl SimCameraHandle {
    /// Queue a result for a future read.
    pub fn push_result(&self, result: DetectionResult) {
        lock(&self.state).queued.push_back(result);
    }

    /// Last pipeline index commanded, if any.
    pub fn pipeline_index(&self) -> Option<u8> {
        lock(&self.state).pipeline_index
    }

    /// Last illuminator mode commanded, if any.
    pub fn led(&self) -> Option<LedMode> {
        lock(&self.state).led
    }

    /// Number of illuminator commands that reached the camera.
    pub fn led_commands(&self) -> usize {
        lock(&self.state).led_commands
    }

    /// Make every subsequent command fail with a hardware fault.
    pub fn set_fail_commands(&self, fail: bool) {
        lock(&self.state).fail_commands = fail;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Synthetic detections
// ────────────────────────────────────────────────────────────────────────────

/// Renders ideal detections for a camera on a robot at a known pose.
#[derive(Debug, Clone)]
pub struct SyntheticDetector {
    registry: LandmarkRegistry,
    mount: CameraMount,
    /// Half the horizontal field of view (degrees).
    pub half_fov_deg: f64,
    /// Targets further than this are not reported (metres).
    pub max_range_m: f64,
    /// Ambiguity reported on every fiducial.
    pub ambiguity: f64,
    /// Pipeline latency stamped on every result (milliseconds).
    pub latency_millis: f64,
}

impl SyntheticDetector {
    pub fn new(registry: LandmarkRegistry, mount: CameraMount) -> Self {
        Self {
            registry,
            mount,
            half_fov_deg: 35.0,
            max_range_m: 6.0,
            ambiguity: 0.3,
            latency_millis: 20.0,
        }
    }

    fn camera_pose(&self, robot: Pose2d) -> Pose2d {
        robot.transform_by(self.mount.offset)
    }

    fn result(&self, targets: Vec<TrackedTarget>, capture_seconds: f64) -> DetectionResult {
        DetectionResult::new(
            targets,
            capture_seconds + self.latency_millis / 1000.0,
            self.latency_millis,
        )
    }

    /// Fiducials visible from `robot`, nearest first.
    pub fn detect_tags(&self, robot: Pose2d, capture_seconds: f64) -> DetectionResult {
        let camera = self.camera_pose(robot);
        let mut visible: Vec<(f64, TrackedTarget)> = self
            .registry
            .tags()
            .filter_map(|(id, tag)| {
                let rel = tag.relative_to(camera);
                let range = rel.translation.norm();
                let bearing = rel.translation.y.atan2(rel.translation.x).to_degrees();
                if range <= 0.0 || range > self.max_range_m || bearing.abs() > self.half_fov_deg {
                    return None;
                }
                let camera_to_target = Transform3d::new(
                    Translation3d::new(rel.translation.x, rel.translation.y, 0.0),
                    Rotation3d::from_yaw(rel.rotation.radians()),
                );
                Some((range, TrackedTarget::fiducial(id, camera_to_target, self.ambiguity)))
            })
            .collect();
        visible.sort_by(|a, b| a.0.total_cmp(&b.0));
        self.result(visible.into_iter().map(|(_, t)| t).collect(), capture_seconds)
    }

    /// The colored landmark as seen from `robot`, if it is in view.
    pub fn detect_landmark(&self, robot: Pose2d, capture_seconds: f64) -> DetectionResult {
        let camera = self.camera_pose(robot);
        let landmark = self.registry.landmark();
        let rel = landmark.pose.relative_to(camera);
        let bearing = rel.translation.y.atan2(rel.translation.x).to_degrees();
        let ring_distance = rel.translation.norm() - landmark.radius_meters;
        if ring_distance <= 0.0 || ring_distance > self.max_range_m || bearing.abs() > self.half_fov_deg {
            return self.result(Vec::new(), capture_seconds);
        }

        let yaw = -bearing;
        let rise = (self.mount.target_height_m - self.mount.mount_height_m).abs();
        let elevation = (rise / (ring_distance * yaw.to_radians().cos())).atan().to_degrees();
        let pitch = elevation - self.mount.mount_angle_deg;
        let area = 100.0 / (ring_distance * ring_distance).max(1.0);
        self.result(vec![TrackedTarget::landmark(yaw, pitch, area)], capture_seconds)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Gyro and actuator stubs
// ────────────────────────────────────────────────────────────────────────────

/// A settable heading shared between clones.
#[derive(Debug, Clone, Default)]
pub struct SimGyro {
    heading: Arc<Mutex<f64>>,
}

impl SimGyro {
    pub fn new(heading_degrees: f64) -> Self {
        Self {
            heading: Arc::new(Mutex::new(heading_degrees)),
        }
    }

    pub fn set_heading_degrees(&self, heading_degrees: f64) {
        *lock(&self.heading) = heading_degrees;
    }
}

impl HeadingSource for SimGyro {
    fn heading_degrees(&self) -> f64 {
        *lock(&self.heading)
    }
}

/// A simulated actuator that records the most recent output.  Always
/// succeeds.
pub struct SimActuator {
    id: String,
    output: f64,
}

impl SimActuator {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            output: 0.0,
        }
    }

    /// Wrap in the shared form commands expect.
    pub fn shared(id: impl Into<String>) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self::new(id)))
    }
}

impl Actuator for SimActuator {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_output(&mut self, output: f64) -> Result<(), VisionError> {
        self.output = output;
        Ok(())
    }

    fn output(&self) -> f64 {
        self.output
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
