use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Detector pipeline selection.  Exactly one pipeline is active per camera;
/// switching is an explicit command, never inferred from the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pipeline {
    /// Fiducial-marker (AprilTag) pipeline: the detector reports a full
    /// camera-to-target rigid transform per identified tag.
    AprilTag,
    /// Colored-landmark pipeline tuned for the red alliance.
    Red,
    /// Colored-landmark pipeline tuned for the blue alliance.
    Blue,
    /// Colored-landmark pipeline for green retro-reflective tape.
    Green,
}

impl Pipeline {
    /// Index of this pipeline on the camera coprocessor.
    pub fn index(self) -> u8 {
        match self {
            Pipeline::AprilTag => 1,
            Pipeline::Red => 2,
            Pipeline::Blue => 3,
            Pipeline::Green => 4,
        }
    }

    /// `true` for the fiducial-marker pipeline, `false` for every
    /// colored-landmark variant.
    pub fn is_fiducial(self) -> bool {
        matches!(self, Pipeline::AprilTag)
    }
}

impl std::fmt::Display for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pipeline::AprilTag => write!(f, "apriltag"),
            Pipeline::Red => write!(f, "red"),
            Pipeline::Blue => write!(f, "blue"),
            Pipeline::Green => write!(f, "green"),
        }
    }
}

/// Illuminator state forwarded to the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedMode {
    On,
    Off,
}

impl From<bool> for LedMode {
    fn from(on: bool) -> Self {
        if on { LedMode::On } else { LedMode::Off }
    }
}

/// Direction of the fiducial ambiguity check.
///
/// `RejectBelow` rejects detections whose ambiguity is *below* the
/// threshold.  That is the behaviour the robot has been running with and
/// stays the default until field telemetry confirms otherwise.
/// `RejectAbove` is the conventional reading (reject poorly-constrained
/// tags) and must be selected explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityPolicy {
    #[default]
    RejectBelow,
    RejectAbove,
}

/// Workspace-wide error type.
///
/// Nothing in the vision pipeline is fatal: every variant ends up as
/// "skip this tick's vision update" at the estimator boundary.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VisionError {
    #[error("no target in the latest detection result")]
    NoTarget,

    #[error("target carries no fiducial identity")]
    MissingTagId,

    #[error("tag {0} is not in the landmark registry")]
    UnknownTag(u32),

    #[error("degenerate geometry: {details}")]
    DegenerateGeometry { details: String },

    #[error("gate rule '{rule}' rejected estimate: {details}")]
    GateRejected { rule: String, details: String },

    #[error("Hardware Fault on {component}: {details}")]
    HardwareFault { component: String, details: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}
