//! [`PoseEstimator`] – one camera's detection-to-field-pose pipeline.
//!
//! Each control-loop tick [`PoseEstimator::update`] reads the camera's latest
//! [`DetectionResult`], takes the producer's best target, back-projects it
//! into a field-relative robot pose for the active [`Pipeline`], runs the
//! [`ValidityGate`], and on a pass forwards `(pose, capture time)` to the
//! [`FusionSink`].  Anything else degrades to "no vision update this tick".
//!
//! Two back-projections are supported:
//!
//! - **Fiducial** – the tag's registered field pose composed with the
//!   inverse of the detector's camera-to-target transform gives the camera
//!   pose; the inverse mount offset then gives the robot pose.
//! - **Landmark** – elevation trigonometry gives the range to the landmark
//!   ring; the reference heading plus the target yaw give the field bearing
//!   to it; stepping back `range + radius` along that bearing from the
//!   landmark centre gives the camera position.

use std::sync::Arc;

use fieldpose_hal::{CameraMount, HeadingSource, VisionCamera};
use fieldpose_kernel::validity::{GateConfig, GateInput, ValidityGate};
use fieldpose_perception::{
    DetectionResult, FusionSink, LandmarkRegistry, Pose2d, Rotation2d, TargetCorner,
    TrackedTarget, Transform3d, Translation2d,
};
use fieldpose_types::{LedMode, Pipeline, VisionError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Below this `|tan θ · cos φ|` the landmark range is treated as singular.
const MIN_RANGE_DENOMINATOR: f64 = 1e-9;

// ────────────────────────────────────────────────────────────────────────────
// Configuration and outcomes
// ────────────────────────────────────────────────────────────────────────────

/// Per-estimator settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EstimatorConfig {
    /// Pipeline selected at construction.
    pub pipeline: Pipeline,
    #[serde(flatten)]
    pub gate: GateConfig,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            pipeline: Pipeline::AprilTag,
            gate: GateConfig::default(),
        }
    }
}

/// A gated field pose stamped at light-capture time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseEstimate {
    pub pose: Pose2d,
    pub timestamp_seconds: f64,
    pub pipeline: Pipeline,
    /// Camera-to-target range the pose was derived from (metres).
    pub distance_meters: f64,
}

/// What one [`PoseEstimator::update`] call did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The latest result carried no target.
    NoTarget,
    /// The camera is still serving the frame processed last tick.
    RepeatedFrame,
    /// A target was seen but no pose reached the sink.
    Rejected(VisionError),
    /// The estimate was forwarded to the sink.
    Fused(PoseEstimate),
}

impl TickOutcome {
    pub fn is_fused(&self) -> bool {
        matches!(self, TickOutcome::Fused(_))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// PoseEstimator
// ────────────────────────────────────────────────────────────────────────────

/// Turns one camera's detections into gated field poses.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use fieldpose_hal::{CameraMount, FixedHeading, sim::SimCamera};
/// use fieldpose_perception::{
///     DetectionResult, FieldLandmark, LandmarkRegistry, Pose2d, Rotation3d, TrackedTarget,
///     Transform3d, Translation3d, VisionMeasurement,
/// };
/// use fieldpose_runtime::estimator::{EstimatorConfig, PoseEstimator};
///
/// let camera = SimCamera::new("limelight");
/// let feed = camera.handle();
/// let registry = LandmarkRegistry::new(FieldLandmark::default())
///     .with_tag(7, Pose2d::from_xy_degrees(5.0, 3.0, 0.0));
/// let mut estimator = PoseEstimator::new(
///     Box::new(camera),
///     CameraMount::new("limelight"),
///     Arc::new(registry),
///     Arc::new(FixedHeading(0.0)),
///     &EstimatorConfig::default(),
/// );
///
/// let to_tag = Transform3d::new(Translation3d::new(1.0, 0.0, 0.0), Rotation3d::identity());
/// feed.push_result(DetectionResult::new(
///     vec![TrackedTarget::fiducial(7, to_tag, 0.5)],
///     100.0,
///     20.0,
/// ));
///
/// let mut sink: Vec<VisionMeasurement> = Vec::new();
/// assert!(estimator.update(&mut sink).is_fused());
/// assert!((sink[0].pose.translation.x - 4.0).abs() < 1e-9);
/// ```
pub struct PoseEstimator {
    camera: Box<dyn VisionCamera>,
    mount: CameraMount,
    registry: Arc<LandmarkRegistry>,
    heading: Arc<dyn HeadingSource>,
    gate: ValidityGate,
    pipeline: Pipeline,
    last_result: DetectionResult,
    last_processed_timestamp: Option<f64>,
}

impl PoseEstimator {
    /// Build an estimator and command the camera onto `config.pipeline`.
    /// A failed pipeline command is logged; the estimator still starts.
    pub fn new(
        camera: Box<dyn VisionCamera>,
        mount: CameraMount,
        registry: Arc<LandmarkRegistry>,
        heading: Arc<dyn HeadingSource>,
        config: &EstimatorConfig,
    ) -> Self {
        let mut estimator = Self {
            camera,
            mount,
            registry,
            heading,
            gate: ValidityGate::standard(&config.gate),
            pipeline: config.pipeline,
            last_result: DetectionResult::default(),
            last_processed_timestamp: None,
        };
        if let Err(e) = estimator.camera.set_pipeline_index(config.pipeline.index()) {
            warn!(camera = %estimator.mount.hostname, error = %e, "initial pipeline select failed");
        }
        estimator
    }

    /// Replace the standard gate, e.g. with extra rules.
    pub fn with_gate(mut self, gate: ValidityGate) -> Self {
        self.gate = gate;
        self
    }

    /// Camera host name.
    pub fn name(&self) -> &str {
        &self.mount.hostname
    }

    pub fn mount(&self) -> &CameraMount {
        &self.mount
    }

    pub fn pipeline(&self) -> Pipeline {
        self.pipeline
    }

    /// The result read on the most recent tick.
    pub fn last_result(&self) -> &DetectionResult {
        &self.last_result
    }

    // ── tick ────────────────────────────────────────────────────────────────

    /// Read the camera once and forward a gated pose to `sink` if there is
    /// one.
    pub fn update(&mut self, sink: &mut dyn FusionSink) -> TickOutcome {
        self.last_result = self.camera.latest_result();
        let frame = self.last_result.timestamp_seconds;
        if self.last_processed_timestamp == Some(frame) {
            return TickOutcome::RepeatedFrame;
        }
        self.last_processed_timestamp = Some(frame);

        let Some(target) = self.last_result.best_target() else {
            return TickOutcome::NoTarget;
        };

        let checked = self.estimate().and_then(|pose| {
            let input = GateInput {
                pipeline: self.pipeline,
                target,
                estimate: pose,
                reference_heading_deg: self.heading.heading_degrees(),
            };
            self.gate.verify(&input)?;
            Ok(pose)
        });
        let pose = match checked {
            Ok(pose) => pose,
            Err(e) => {
                debug!(camera = %self.mount.hostname, error = %e, "vision update skipped");
                return TickOutcome::Rejected(e);
            }
        };

        let estimate = PoseEstimate {
            pose,
            timestamp_seconds: self.last_result.capture_timestamp_seconds(),
            pipeline: self.pipeline,
            distance_meters: self.distance().unwrap_or(f64::NAN),
        };
        sink.add_vision_measurement(estimate.pose, estimate.timestamp_seconds);
        debug!(
            camera = %self.mount.hostname,
            x = pose.translation.x,
            y = pose.translation.y,
            heading = pose.rotation.degrees(),
            t = estimate.timestamp_seconds,
            "vision measurement fused"
        );
        TickOutcome::Fused(estimate)
    }

    // ── pose math ───────────────────────────────────────────────────────────

    /// Field-relative robot pose from the last result's best target, in the
    /// active pipeline.
    pub fn estimate(&self) -> Result<Pose2d, VisionError> {
        let target = self.best_target().ok_or(VisionError::NoTarget)?;
        if self.pipeline.is_fiducial() {
            self.fiducial_pose(target)
        } else {
            self.landmark_pose(target)
        }
    }

    /// Camera-to-target range in the active pipeline (metres).
    pub fn distance(&self) -> Result<f64, VisionError> {
        if self.pipeline.is_fiducial() {
            self.april_distance()
        } else {
            self.landmark_distance()
        }
    }

    /// Horizontal range to the best fiducial, straight from the detector's
    /// transform.
    pub fn april_distance(&self) -> Result<f64, VisionError> {
        let target = self.best_target().ok_or(VisionError::NoTarget)?;
        let t = target.camera_to_target.translation;
        Ok(t.x.hypot(t.y))
    }

    /// Range to the colored landmark from its elevation angle.
    pub fn landmark_distance(&self) -> Result<f64, VisionError> {
        let target = self.best_target().ok_or(VisionError::NoTarget)?;
        self.range_from_elevation(target)
    }

    fn range_from_elevation(&self, target: &TrackedTarget) -> Result<f64, VisionError> {
        let theta = (target.pitch + self.mount.mount_angle_deg).to_radians();
        let phi = target.yaw.to_radians();
        let denominator = theta.tan() * phi.cos();
        if !denominator.is_finite() || denominator.abs() < MIN_RANGE_DENOMINATOR {
            return Err(VisionError::DegenerateGeometry {
                details: format!(
                    "elevation {:.3}° yaw {:.3}° gives no usable range",
                    theta.to_degrees(),
                    target.yaw
                ),
            });
        }
        let rise = (self.mount.target_height_m - self.mount.mount_height_m).abs();
        let distance = rise / denominator;
        if !distance.is_finite() || distance <= 0.0 {
            return Err(VisionError::DegenerateGeometry {
                details: format!("landmark range {distance} is not positive"),
            });
        }
        Ok(distance)
    }

    fn fiducial_pose(&self, target: &TrackedTarget) -> Result<Pose2d, VisionError> {
        let id = target.fiducial_id.ok_or(VisionError::MissingTagId)?;
        let tag = self
            .registry
            .tag_pose(id)
            .ok_or(VisionError::UnknownTag(id))?;
        let camera = tag.transform_by(target.camera_to_target.to_transform2d().inverse());
        Ok(camera.transform_by(self.mount.offset.inverse()))
    }

    fn landmark_pose(&self, target: &TrackedTarget) -> Result<Pose2d, VisionError> {
        let landmark = self.registry.landmark();
        let range = self.range_from_elevation(target)? + landmark.radius_meters;

        let camera_heading = Rotation2d::from_degrees(self.heading.heading_degrees())
            .plus(self.mount.offset.rotation);
        // Detector yaw is positive to the right, field angles counter-clockwise.
        let bearing = camera_heading.minus(Rotation2d::from_degrees(target.yaw));
        let camera_position = landmark
            .pose
            .translation
            .minus(Translation2d::new(bearing.cos(), bearing.sin()).scale(range));

        let camera = Pose2d::new(camera_position, camera_heading);
        Ok(camera.transform_by(self.mount.offset.inverse()))
    }

    // ── auxiliary queries ───────────────────────────────────────────────────

    fn best_target(&self) -> Option<&TrackedTarget> {
        self.last_result.best_target()
    }

    pub fn has_valid_target(&self) -> bool {
        self.last_result.has_targets()
    }

    /// Degrees; `0.0` without a target.
    pub fn yaw(&self) -> f64 {
        self.best_target().map_or(0.0, |t| t.yaw)
    }

    /// Degrees; `0.0` without a target.
    pub fn pitch(&self) -> f64 {
        self.best_target().map_or(0.0, |t| t.pitch)
    }

    pub fn area(&self) -> f64 {
        self.best_target().map_or(0.0, |t| t.area)
    }

    pub fn skew(&self) -> f64 {
        self.best_target().map_or(0.0, |t| t.skew)
    }

    /// `-1` without a target or for an unidentified target.
    pub fn fiducial_id(&self) -> i64 {
        self.best_target()
            .and_then(|t| t.fiducial_id)
            .map_or(-1, i64::from)
    }

    /// `-1.0` without a target.
    pub fn pose_ambiguity(&self) -> f64 {
        self.best_target().map_or(-1.0, |t| t.pose_ambiguity)
    }

    /// Identity without a target.
    pub fn camera_to_target(&self) -> Transform3d {
        self.best_target()
            .map_or_else(Transform3d::identity, |t| t.camera_to_target)
    }

    /// Empty without a target.
    pub fn corners(&self) -> &[TargetCorner] {
        self.best_target()
            .map(|t| t.corners.as_slice())
            .unwrap_or_default()
    }

    // ── commands ────────────────────────────────────────────────────────────

    /// Drive the illuminator.  No-op on cameras mounted without one.
    pub fn set_led(&mut self, on: bool) -> Result<(), VisionError> {
        if !self.mount.has_led {
            return Ok(());
        }
        self.camera.set_led(LedMode::from(on)).inspect_err(|e| {
            warn!(camera = %self.mount.hostname, error = %e, "illuminator command failed");
        })
    }

    /// Switch the detector pipeline.  The estimator only adopts the new
    /// pipeline once the camera accepted the command.
    pub fn set_pipeline(&mut self, pipeline: Pipeline) -> Result<(), VisionError> {
        if let Err(e) = self.camera.set_pipeline_index(pipeline.index()) {
            warn!(camera = %self.mount.hostname, %pipeline, error = %e, "pipeline select failed");
            return Err(e);
        }
        info!(camera = %self.mount.hostname, from = %self.pipeline, to = %pipeline, "pipeline switched");
        self.pipeline = pipeline;
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use fieldpose_hal::FixedHeading;
    use fieldpose_hal::sim::{SimCamera, SimCameraHandle, SimGyro};
    use fieldpose_perception::{
        FieldLandmark, Rotation3d, Transform2d, Translation3d, VisionMeasurement,
    };

    const EPS: f64 = 1e-9;

    fn registry() -> Arc<LandmarkRegistry> {
        Arc::new(
            LandmarkRegistry::new(FieldLandmark::default())
                .with_tag(7, Pose2d::from_xy_degrees(5.0, 3.0, 0.0))
                .with_tag(3, Pose2d::from_xy_degrees(0.0, 4.0, 0.0)),
        )
    }

    fn estimator_with(
        mount: CameraMount,
        heading: Arc<dyn HeadingSource>,
        config: EstimatorConfig,
    ) -> (PoseEstimator, SimCameraHandle) {
        let camera = SimCamera::new(mount.hostname.clone());
        let handle = camera.handle();
        let est = PoseEstimator::new(Box::new(camera), mount, registry(), heading, &config);
        (est, handle)
    }

    fn tag_estimator() -> (PoseEstimator, SimCameraHandle) {
        estimator_with(
            CameraMount::new("front"),
            Arc::new(FixedHeading(0.0)),
            EstimatorConfig::default(),
        )
    }

    fn landmark_estimator(heading: f64) -> (PoseEstimator, SimCameraHandle) {
        estimator_with(
            CameraMount::new("shooter").with_elevation(20.0, 0.5, 2.5),
            Arc::new(FixedHeading(heading)),
            EstimatorConfig {
                pipeline: Pipeline::Green,
                ..EstimatorConfig::default()
            },
        )
    }

    fn straight_ahead(dx: f64) -> Transform3d {
        Transform3d::new(Translation3d::new(dx, 0.0, 0.0), Rotation3d::identity())
    }

    fn tag_result(id: u32, to_tag: Transform3d, ambiguity: f64, ts: f64) -> DetectionResult {
        DetectionResult::new(vec![TrackedTarget::fiducial(id, to_tag, ambiguity)], ts, 20.0)
    }

    fn rejected_by(outcome: TickOutcome) -> String {
        match outcome {
            TickOutcome::Rejected(VisionError::GateRejected { rule, .. }) => rule,
            other => panic!("expected gate rejection, got {other:?}"),
        }
    }

    // ── construction and commands ───────────────────────────────────────────

    #[test]
    fn config_deserialises_flat_with_defaults() {
        let config: EstimatorConfig =
            serde_json::from_str(r#"{"pipeline":"green","ambiguity_policy":"reject_above"}"#)
                .unwrap();
        assert_eq!(config.pipeline, Pipeline::Green);
        assert_eq!(config.gate.ambiguity_policy, fieldpose_types::AmbiguityPolicy::RejectAbove);
        assert_eq!(config.gate.ambiguity_threshold, 0.2);
        assert_eq!(config.gate.angle_threshold_deg, 5.0);
    }


    #[test]
    fn new_selects_configured_pipeline() {
        let (est, handle) = landmark_estimator(0.0);
        assert_eq!(handle.pipeline_index(), Some(Pipeline::Green.index()));
        assert_eq!(est.pipeline(), Pipeline::Green);
        assert_eq!(est.name(), "shooter");
    }

    #[test]
    fn set_pipeline_issues_command() {
        let (mut est, handle) = tag_estimator();
        est.set_pipeline(Pipeline::Red).unwrap();
        assert_eq!(est.pipeline(), Pipeline::Red);
        assert_eq!(handle.pipeline_index(), Some(2));
    }

    #[test]
    fn failed_pipeline_switch_keeps_old_pipeline() {
        let (mut est, handle) = tag_estimator();
        handle.set_fail_commands(true);
        let err = est.set_pipeline(Pipeline::Blue).unwrap_err();
        assert!(matches!(err, VisionError::HardwareFault { .. }));
        assert_eq!(est.pipeline(), Pipeline::AprilTag);
    }

    #[test]
    fn set_led_is_noop_without_illuminator() {
        let (mut est, handle) = tag_estimator();
        est.set_led(true).unwrap();
        assert_eq!(handle.led_commands(), 0);
        assert_eq!(handle.led(), None);
    }

    #[test]
    fn set_led_forwards_when_illuminator_present() {
        let (mut est, handle) = estimator_with(
            CameraMount::new("front").with_led(true),
            Arc::new(FixedHeading(0.0)),
            EstimatorConfig::default(),
        );
        est.set_led(true).unwrap();
        est.set_led(false).unwrap();
        assert_eq!(handle.led_commands(), 2);
        assert_eq!(handle.led(), Some(LedMode::Off));
    }

    // ── no target ───────────────────────────────────────────────────────────

    #[test]
    fn no_target_returns_sentinels_and_never_fuses() {
        let (mut est, handle) = tag_estimator();
        handle.push_result(DetectionResult::empty(12.0));
        let mut sink: Vec<VisionMeasurement> = Vec::new();

        assert_eq!(est.update(&mut sink), TickOutcome::NoTarget);
        assert!(sink.is_empty());
        assert!(!est.has_valid_target());
        assert_eq!(est.yaw(), 0.0);
        assert_eq!(est.pitch(), 0.0);
        assert_eq!(est.area(), 0.0);
        assert_eq!(est.skew(), 0.0);
        assert_eq!(est.fiducial_id(), -1);
        assert_eq!(est.pose_ambiguity(), -1.0);
        assert_eq!(est.camera_to_target(), Transform3d::identity());
        assert!(est.corners().is_empty());
        assert_eq!(est.estimate(), Err(VisionError::NoTarget));
        assert_eq!(est.distance(), Err(VisionError::NoTarget));
    }

    // ── fiducial mode ───────────────────────────────────────────────────────

    #[test]
    fn confident_tag_is_rejected_by_default_ambiguity_policy() {
        let (mut est, handle) = tag_estimator();
        handle.push_result(tag_result(7, straight_ahead(1.0), 0.05, 100.0));
        let mut sink: Vec<VisionMeasurement> = Vec::new();

        let outcome = est.update(&mut sink);
        assert_eq!(rejected_by(outcome), "ambiguity");
        assert!(sink.is_empty());
        // The pose itself is still computable.
        let pose = est.estimate().unwrap();
        assert!((pose.translation.x - 4.0).abs() < EPS);
        assert!((pose.translation.y - 3.0).abs() < EPS);
    }

    #[test]
    fn accepted_tag_forwards_capture_timestamp() {
        let (mut est, handle) = tag_estimator();
        handle.push_result(tag_result(7, straight_ahead(1.0), 0.5, 100.0));
        let mut sink: Vec<VisionMeasurement> = Vec::new();

        let TickOutcome::Fused(estimate) = est.update(&mut sink) else {
            panic!("expected fusion");
        };
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].timestamp_seconds, 100.0 - 20.0 / 1000.0);
        assert!((sink[0].timestamp_seconds - 99.98).abs() < 1e-12);
        assert_eq!(estimate.pose, sink[0].pose);
        assert!((estimate.distance_meters - 1.0).abs() < EPS);
    }

    #[test]
    fn unknown_tag_fails_closed() {
        let (mut est, handle) = tag_estimator();
        handle.push_result(tag_result(42, straight_ahead(1.0), 0.5, 1.0));
        let mut sink: Vec<VisionMeasurement> = Vec::new();
        assert_eq!(
            est.update(&mut sink),
            TickOutcome::Rejected(VisionError::UnknownTag(42))
        );
        assert!(sink.is_empty());
        assert_eq!(est.fiducial_id(), 42);
    }

    #[test]
    fn unidentified_target_in_fiducial_mode_fails_closed() {
        let (mut est, handle) = tag_estimator();
        handle.push_result(DetectionResult::new(
            vec![TrackedTarget::landmark(0.0, 5.0, 1.0)],
            1.0,
            0.0,
        ));
        let mut sink: Vec<VisionMeasurement> = Vec::new();
        assert_eq!(
            est.update(&mut sink),
            TickOutcome::Rejected(VisionError::MissingTagId)
        );
    }

    #[test]
    fn out_of_bounds_estimate_rejected() {
        let (mut est, handle) = tag_estimator();
        // Tag 3 sits on the x = 0 wall; 1 m in front of the camera puts the
        // robot outside the field.
        handle.push_result(tag_result(3, straight_ahead(1.0), 0.5, 1.0));
        let mut sink: Vec<VisionMeasurement> = Vec::new();
        assert_eq!(rejected_by(est.update(&mut sink)), "field_bounds");
        assert!(sink.is_empty());
    }

    #[test]
    fn heading_disagreement_rejected() {
        let (mut est, handle) = estimator_with(
            CameraMount::new("front"),
            Arc::new(FixedHeading(20.0)),
            EstimatorConfig::default(),
        );
        handle.push_result(tag_result(7, straight_ahead(1.0), 0.5, 1.0));
        let mut sink: Vec<VisionMeasurement> = Vec::new();
        assert_eq!(rejected_by(est.update(&mut sink)), "heading_agreement");
    }

    #[test]
    fn mount_offset_round_trip() {
        let offset = Transform2d::new(Translation2d::new(0.3, -0.2), Rotation2d::from_degrees(15.0));
        let (mut est, handle) = estimator_with(
            CameraMount::new("side").with_offset(offset),
            Arc::new(FixedHeading(0.0)),
            EstimatorConfig::default(),
        );
        let to_tag = Transform3d::new(
            Translation3d::new(1.0, 0.5, 0.1),
            Rotation3d::from_yaw(10f64.to_radians()),
        );
        handle.push_result(tag_result(7, to_tag, 0.5, 1.0));
        let mut sink: Vec<VisionMeasurement> = Vec::new();
        est.update(&mut sink);

        let tag = Pose2d::from_xy_degrees(5.0, 3.0, 0.0);
        let camera = tag.transform_by(to_tag.to_transform2d().inverse());
        let back = est.estimate().unwrap().transform_by(offset);
        assert!((back.translation.x - camera.translation.x).abs() < EPS);
        assert!((back.translation.y - camera.translation.y).abs() < EPS);
        assert!((back.rotation.degrees() - camera.rotation.degrees()).abs() < EPS);
    }

    // ── repeated frames ─────────────────────────────────────────────────────

    #[test]
    fn repeated_frame_is_fused_once() {
        let (mut est, handle) = tag_estimator();
        handle.push_result(tag_result(7, straight_ahead(1.0), 0.5, 5.0));
        let mut sink: Vec<VisionMeasurement> = Vec::new();

        assert!(est.update(&mut sink).is_fused());
        assert_eq!(est.update(&mut sink), TickOutcome::RepeatedFrame);
        assert_eq!(sink.len(), 1);
        // Aux queries still answer from the held frame.
        assert_eq!(est.fiducial_id(), 7);

        handle.push_result(tag_result(7, straight_ahead(1.0), 0.5, 5.02));
        assert!(est.update(&mut sink).is_fused());
        assert_eq!(sink.len(), 2);
    }

    // ── landmark mode ───────────────────────────────────────────────────────

    #[test]
    fn landmark_distance_matches_reference_computation() {
        let (mut est, handle) = landmark_estimator(0.0);
        handle.push_result(DetectionResult::new(
            vec![TrackedTarget::landmark(10.0, -5.0, 1.0)],
            1.0,
            0.0,
        ));
        est.update(&mut Vec::<VisionMeasurement>::new());

        let expected = (2.5f64 - 0.5).abs()
            / ((-5.0f64 + 20.0).to_radians().tan() * 10.0f64.to_radians().cos());
        assert_eq!(est.landmark_distance(), Ok(expected));
        assert_eq!(est.distance(), Ok(expected));
    }

    #[test]
    fn landmark_singularity_fails_closed() {
        let (mut est, handle) = landmark_estimator(0.0);
        // θ = -20 + 20 = 0: target on the optical horizon.
        handle.push_result(DetectionResult::new(
            vec![TrackedTarget::landmark(0.0, -20.0, 1.0)],
            1.0,
            0.0,
        ));
        let mut sink: Vec<VisionMeasurement> = Vec::new();
        let outcome = est.update(&mut sink);
        assert!(matches!(
            outcome,
            TickOutcome::Rejected(VisionError::DegenerateGeometry { .. })
        ));
        assert!(sink.is_empty());
    }

    #[test]
    fn landmark_pose_places_robot_behind_bearing() {
        let (mut est, handle) = landmark_estimator(0.0);
        // Looking dead ahead along +x at the hub.
        let pitch = (2.0f64 / 3.0).atan().to_degrees() - 20.0;
        handle.push_result(DetectionResult::new(
            vec![TrackedTarget::landmark(0.0, pitch, 1.0)],
            2.0,
            0.0,
        ));
        let mut sink: Vec<VisionMeasurement> = Vec::new();
        assert!(est.update(&mut sink).is_fused());

        let hub = FieldLandmark::default();
        let pose = sink[0].pose;
        let expected_x = hub.pose.translation.x - (3.0 + hub.radius_meters);
        assert!((pose.translation.x - expected_x).abs() < 1e-6);
        assert!((pose.translation.y - hub.pose.translation.y).abs() < 1e-6);
        assert!(pose.rotation.degrees().abs() < EPS);
    }

    #[test]
    fn landmark_mode_ignores_ambiguity() {
        let (mut est, handle) = landmark_estimator(90.0);
        let pitch = (2.0f64 / 2.0).atan().to_degrees() - 20.0;
        let mut target = TrackedTarget::landmark(0.0, pitch, 1.0);
        target.pose_ambiguity = 0.0;
        handle.push_result(DetectionResult::new(vec![target], 3.0, 0.0));
        let mut sink: Vec<VisionMeasurement> = Vec::new();
        assert!(est.update(&mut sink).is_fused());

        // Facing +y: the robot sits below the hub.
        let hub = FieldLandmark::default();
        let pose = sink[0].pose;
        assert!((pose.translation.x - hub.pose.translation.x).abs() < 1e-6);
        assert!((pose.translation.y - (hub.pose.translation.y - 2.0 - hub.radius_meters)).abs() < 1e-6);
    }

    #[test]
    fn heading_source_is_read_each_tick() {
        let gyro = SimGyro::new(0.0);
        let (mut est, handle) = estimator_with(
            CameraMount::new("front"),
            Arc::new(gyro.clone()),
            EstimatorConfig::default(),
        );
        let mut sink: Vec<VisionMeasurement> = Vec::new();

        handle.push_result(tag_result(7, straight_ahead(1.0), 0.5, 1.0));
        assert!(est.update(&mut sink).is_fused());

        gyro.set_heading_degrees(45.0);
        handle.push_result(tag_result(7, straight_ahead(1.0), 0.5, 2.0));
        assert_eq!(rejected_by(est.update(&mut sink)), "heading_agreement");
    }
}
