//! Camera read/command interface and the physical mount descriptor.
//!
//! The estimator never talks to a vendor camera type directly; it holds a
//! [`VisionCamera`] and reads "latest available result" snapshots from it.

use fieldpose_perception::{DetectionResult, Transform2d};
use fieldpose_types::{LedMode, VisionError};
use serde::{Deserialize, Serialize};

/// A detection camera (coprocessor + pipeline).
///
/// Drivers implement this trait; the simulation backend is
/// [`SimCamera`][crate::sim::SimCamera].
pub trait VisionCamera: Send {
    /// Stable identifier for this camera, usually its host name.
    fn id(&self) -> &str;

    /// Return the most recent detection result without blocking.
    ///
    /// A disconnected or slow camera yields an empty result rather than an
    /// error so the control loop degrades to "no target".
    fn latest_result(&mut self) -> DetectionResult;

    /// Select the active detector pipeline by index.
    ///
    /// # Errors
    ///
    /// Returns [`VisionError::HardwareFault`] if the command cannot be sent.
    fn set_pipeline_index(&mut self, index: u8) -> Result<(), VisionError>;

    /// Drive the camera illuminator.
    ///
    /// # Errors
    ///
    /// Returns [`VisionError::HardwareFault`] if the command cannot be sent.
    fn set_led(&mut self, mode: LedMode) -> Result<(), VisionError>;
}

/// Where and how a camera is mounted on the robot.  Immutable for the
/// process lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraMount {
    /// Coprocessor host name, also the camera id.
    pub hostname: String,
    /// Rigid transform from robot centre to camera.
    #[serde(default)]
    pub offset: Transform2d,
    /// Upward tilt of the optical axis (degrees).
    #[serde(default)]
    pub mount_angle_deg: f64,
    /// Lens height above the floor (metres).
    #[serde(default)]
    pub mount_height_m: f64,
    /// Height of the colored landmark target above the floor (metres).
    #[serde(default)]
    pub target_height_m: f64,
    /// Whether the camera has a controllable illuminator.
    #[serde(default)]
    pub has_led: bool,
}

impl CameraMount {
    /// A camera at robot centre with no tilt and no illuminator.
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            offset: Transform2d::identity(),
            mount_angle_deg: 0.0,
            mount_height_m: 0.0,
            target_height_m: 0.0,
            has_led: false,
        }
    }

    pub fn with_offset(mut self, offset: Transform2d) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_elevation(mut self, mount_angle_deg: f64, mount_height_m: f64, target_height_m: f64) -> Self {
        self.mount_angle_deg = mount_angle_deg;
        self.mount_height_m = mount_height_m;
        self.target_height_m = target_height_m;
        self
    }

    pub fn with_led(mut self, has_led: bool) -> Self {
        self.has_led = has_led;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldpose_perception::TrackedTarget;

    struct MockCamera {
        id: String,
        pipeline: u8,
    }

    impl VisionCamera for MockCamera {
        fn id(&self) -> &str {
            &self.id
        }

        fn latest_result(&mut self) -> DetectionResult {
            DetectionResult::new(vec![TrackedTarget::landmark(1.0, 2.0, 0.5)], 3.0, 10.0)
        }

        fn set_pipeline_index(&mut self, index: u8) -> Result<(), VisionError> {
            self.pipeline = index;
            Ok(())
        }

        fn set_led(&mut self, _mode: LedMode) -> Result<(), VisionError> {
            Err(VisionError::HardwareFault {
                component: self.id.clone(),
                details: "no illuminator".to_string(),
            })
        }
    }

    #[test]
    fn mock_camera_reads_and_commands() {
        let mut cam = MockCamera {
            id: "limelight".to_string(),
            pipeline: 0,
        };
        assert_eq!(cam.id(), "limelight");
        assert!(cam.latest_result().has_targets());
        cam.set_pipeline_index(3).unwrap();
        assert_eq!(cam.pipeline, 3);
        assert!(cam.set_led(LedMode::On).is_err());
    }

    #[test]
    fn mount_builder_sets_fields() {
        let mount = CameraMount::new("front")
            .with_elevation(20.0, 0.5, 2.5)
            .with_led(true);
        assert_eq!(mount.hostname, "front");
        assert_eq!(mount.mount_angle_deg, 20.0);
        assert_eq!(mount.target_height_m, 2.5);
        assert!(mount.has_led);
        assert_eq!(mount.offset, Transform2d::identity());
    }
}
