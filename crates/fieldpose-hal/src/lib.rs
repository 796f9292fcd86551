//! `fieldpose-hal` – hardware capability traits.
//!
//! The rest of the workspace only talks to these traits, so camera vendors,
//! gyros and motor controllers can be swapped without touching estimation
//! logic.
//!
//! # Modules
//!
//! - [`camera`] – [`VisionCamera`][camera::VisionCamera] read/command
//!   interface and the [`CameraMount`][camera::CameraMount] descriptor.
//! - [`gyro`] – [`HeadingSource`][gyro::HeadingSource], the reference
//!   heading the validity gate compares against.
//! - [`actuator`] – [`Actuator`][actuator::Actuator] for motor-driven
//!   subsystems.
//! - [`sim`] – simulated camera, synthetic detector, gyro and actuator.

pub mod actuator;
pub mod camera;
pub mod gyro;
pub mod sim;

pub use actuator::{Actuator, SharedActuator};
pub use camera::{CameraMount, VisionCamera};
pub use gyro::{FixedHeading, HeadingSource};
