//! `fieldpose-kernel` – Estimate Safety
//!
//! Decides which vision estimates are allowed to reach the fusion filter and
//! which cameras are still producing frames.
//!
//! # Modules
//!
//! - [`validity`] – [`ValidityGate`][validity::ValidityGate]:
//!   an ordered rule engine that checks every candidate pose (finite, tag
//!   ambiguity, field bounds, heading agreement) and returns the first
//!   violation as [`VisionError::GateRejected`][fieldpose_types::VisionError].
//! - [`watchdog`] – [`Watchdog`][watchdog::Watchdog]:
//!   tracks detector timestamps per camera and flags cameras whose frames
//!   stopped advancing.

pub mod validity;
pub mod watchdog;

pub use validity::{
    AmbiguityRule, FieldBoundsRule, FiniteEstimateRule, GateConfig, GateInput, GateRule,
    HeadingAgreementRule, ValidityGate,
};
pub use watchdog::{CameraHealth, Watchdog};
