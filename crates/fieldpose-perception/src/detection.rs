//! Detection results as reported by the camera coprocessor.
//!
//! A [`DetectionResult`] is a snapshot of one camera read: zero or more
//! [`TrackedTarget`]s, the time the result became available and the
//! pipeline latency.  Producers order `targets` best-first; consumers never
//! re-rank.

use serde::{Deserialize, Serialize};

use crate::geometry::Transform3d;

/// Ambiguity value reported when the detector did not compute one.
pub const AMBIGUITY_UNSET: f64 = -1.0;

/// A target corner in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetCorner {
    pub x: f64,
    pub y: f64,
}

/// One candidate target from a single camera read.  Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedTarget {
    /// Fiducial identity; `None` for colored-landmark targets.
    #[serde(default)]
    pub fiducial_id: Option<u32>,
    /// Horizontal angular offset from the optical axis (degrees, positive right).
    pub yaw: f64,
    /// Vertical angular offset from the optical axis (degrees, positive up).
    pub pitch: f64,
    /// Percentage of the image covered by the target.
    pub area: f64,
    /// Target skew (degrees).
    #[serde(default)]
    pub skew: f64,
    /// Single-tag pose ambiguity in `[0, 1]`, or [`AMBIGUITY_UNSET`].
    #[serde(default = "default_ambiguity")]
    pub pose_ambiguity: f64,
    /// Best camera-to-target transform in the camera frame.
    #[serde(default)]
    pub camera_to_target: Transform3d,
    #[serde(default)]
    pub corners: Vec<TargetCorner>,
}

fn default_ambiguity() -> f64 {
    AMBIGUITY_UNSET
}

impl TrackedTarget {
    /// A colored-landmark target: angles and area only.
    pub fn landmark(yaw: f64, pitch: f64, area: f64) -> Self {
        Self {
            fiducial_id: None,
            yaw,
            pitch,
            area,
            skew: 0.0,
            pose_ambiguity: AMBIGUITY_UNSET,
            camera_to_target: Transform3d::identity(),
            corners: Vec::new(),
        }
    }

    /// A fiducial target with a full camera-to-target transform.
    pub fn fiducial(id: u32, camera_to_target: Transform3d, pose_ambiguity: f64) -> Self {
        let t = camera_to_target.translation;
        Self {
            fiducial_id: Some(id),
            yaw: -t.y.atan2(t.x).to_degrees(),
            pitch: t.z.atan2(t.x.hypot(t.y)).to_degrees(),
            area: 0.0,
            skew: 0.0,
            pose_ambiguity,
            camera_to_target,
            corners: Vec::new(),
        }
    }
}

/// The result of one camera read.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Candidate targets, best first.
    #[serde(default)]
    pub targets: Vec<TrackedTarget>,
    /// Time the result became available, in the fusion time base (seconds).
    pub timestamp_seconds: f64,
    /// Time between exposure and availability (milliseconds).
    #[serde(default)]
    pub latency_millis: f64,
}

impl DetectionResult {
    pub fn new(targets: Vec<TrackedTarget>, timestamp_seconds: f64, latency_millis: f64) -> Self {
        Self {
            targets,
            timestamp_seconds,
            latency_millis,
        }
    }

    /// A result with no targets.
    pub fn empty(timestamp_seconds: f64) -> Self {
        Self::new(Vec::new(), timestamp_seconds, 0.0)
    }

    pub fn has_targets(&self) -> bool {
        !self.targets.is_empty()
    }

    /// The producer's best candidate.
    pub fn best_target(&self) -> Option<&TrackedTarget> {
        self.targets.first()
    }

    /// When the light behind this result hit the sensor.
    pub fn capture_timestamp_seconds(&self) -> f64 {
        self.timestamp_seconds - self.latency_millis / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Rotation3d, Translation3d};

    #[test]
    fn empty_result_has_no_best_target() {
        let r = DetectionResult::empty(1.0);
        assert!(!r.has_targets());
        assert!(r.best_target().is_none());
    }

    #[test]
    fn best_target_is_first_candidate() {
        let r = DetectionResult::new(
            vec![
                TrackedTarget::landmark(1.0, 2.0, 3.0),
                TrackedTarget::landmark(9.0, 9.0, 9.0),
            ],
            5.0,
            0.0,
        );
        assert_eq!(r.best_target().map(|t| t.yaw), Some(1.0));
    }

    #[test]
    fn capture_timestamp_subtracts_latency() {
        let r = DetectionResult::new(Vec::new(), 100.0, 20.0);
        assert_eq!(r.capture_timestamp_seconds(), 100.0 - 20.0 / 1000.0);
        assert!((r.capture_timestamp_seconds() - 99.98).abs() < 1e-12);
    }

    #[test]
    fn fiducial_constructor_derives_angles_from_transform() {
        let t = Transform3d::new(Translation3d::new(2.0, -2.0, 0.0), Rotation3d::identity());
        let target = TrackedTarget::fiducial(3, t, 0.1);
        // Target to the camera's right → positive yaw.
        assert!((target.yaw - 45.0).abs() < 1e-9);
        assert!(target.pitch.abs() < 1e-9);
        assert_eq!(target.fiducial_id, Some(3));
    }

    #[test]
    fn minimal_json_uses_sentinel_defaults() {
        let json = r#"{"targets":[{"yaw":1.5,"pitch":-2.0,"area":0.4}],"timestamp_seconds":12.5}"#;
        let r: DetectionResult = serde_json::from_str(json).unwrap();
        let t = r.best_target().unwrap();
        assert_eq!(t.fiducial_id, None);
        assert_eq!(t.pose_ambiguity, AMBIGUITY_UNSET);
        assert_eq!(t.camera_to_target, Transform3d::identity());
        assert_eq!(r.latency_millis, 0.0);
    }
}
