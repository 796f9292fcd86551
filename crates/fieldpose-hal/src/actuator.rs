//! Generic `Actuator` trait for motor-driven subsystems.
//!
//! Commands hold actuators through [`SharedActuator`] so the scheduler and
//! the owning subsystem can both reach the same driver.

use std::sync::{Arc, Mutex};

use fieldpose_types::VisionError;

/// A motor-driven mechanism commanded by a normalised output.
pub trait Actuator: Send {
    /// Stable identifier for this actuator, e.g. `"intake_arm"`.
    fn id(&self) -> &str;

    /// Command a normalised output in `[-1, 1]`; `0.0` stops motion.
    ///
    /// # Errors
    ///
    /// Returns [`VisionError::HardwareFault`] if the command cannot be
    /// applied (e.g. the motor controller is in a fault state).
    fn set_output(&mut self, output: f64) -> Result<(), VisionError>;

    /// Most recently commanded output.
    fn output(&self) -> f64;
}

/// An actuator shared between a subsystem and the commands that require it.
pub type SharedActuator = Arc<Mutex<dyn Actuator>>;
