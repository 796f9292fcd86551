//! `fieldpose-perception` – geometry and the world model the estimator
//! reasons about.
//!
//! # Modules
//!
//! - [`geometry`] – planar and spatial rigid transforms
//!   ([`Pose2d`][geometry::Pose2d], [`Transform2d`][geometry::Transform2d],
//!   [`Transform3d`][geometry::Transform3d]) and angle normalisation.
//! - [`detection`] – [`DetectionResult`][detection::DetectionResult] and
//!   [`TrackedTarget`][detection::TrackedTarget]: one camera read as the
//!   coprocessor reports it.
//! - [`landmarks`] – [`LandmarkRegistry`][landmarks::LandmarkRegistry]:
//!   known field poses of fiducials and the colored landmark, plus
//!   [`FieldDimensions`][landmarks::FieldDimensions].
//! - [`fusion`] – the [`FusionSink`][fusion::FusionSink] boundary and
//!   [`PoseFusion`][fusion::PoseFusion], a latency-compensated
//!   odometry/vision complementary filter.

pub mod detection;
pub mod fusion;
pub mod geometry;
pub mod landmarks;

pub use detection::{DetectionResult, TargetCorner, TrackedTarget};
pub use fusion::{FusionSink, PoseFusion, VisionMeasurement};
pub use geometry::{Pose2d, Rotation2d, Rotation3d, Transform2d, Transform3d, Translation2d, Translation3d};
pub use landmarks::{FieldDimensions, FieldLandmark, LandmarkRegistry};
