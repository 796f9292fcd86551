//! `fieldpose-runtime` – The Control-Loop Side
//!
//! Everything that runs once per control period: reading cameras, turning
//! detections into gated poses, and scheduling actuator commands.
//!
//! # Modules
//!
//! - [`estimator`] – [`PoseEstimator`][estimator::PoseEstimator]:
//!   one camera's best target → field pose → validity gate → fusion sink,
//!   in fiducial or colored-landmark mode.  Also answers side-effect-free
//!   queries about the last target and forwards pipeline/illuminator
//!   commands to the camera.
//! - [`vision_system`] – [`VisionSystem`][vision_system::VisionSystem]:
//!   ticks every registered estimator and watches for frozen cameras.
//! - [`command`] – [`CommandScheduler`][command::CommandScheduler]:
//!   requirement-locked command execution and the
//!   [`StopActuator`][command::StopActuator] hold command.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]:
//!   `tracing` subscriber setup with optional OTLP span export.
//!
//! The validity gate lives in `fieldpose-kernel`; it is re-exported here so
//! callers configuring an estimator need only this crate.

pub mod command;
pub mod estimator;
pub mod telemetry;
pub mod vision_system;

pub use command::{Command, CommandScheduler, StopActuator};
pub use estimator::{EstimatorConfig, PoseEstimate, PoseEstimator, TickOutcome};
pub use telemetry::{LogFormat, TracerProviderGuard, init_tracing};
pub use vision_system::{CameraReport, VisionSystem};

pub use fieldpose_kernel::{GateConfig, ValidityGate};
