//! Reference heading source.
//!
//! The estimator reads the robot heading but never writes it; write
//! ownership stays with whatever drives the gyro or odometry.

use fieldpose_perception::PoseFusion;

/// Something that reports the robot's current field heading.
pub trait HeadingSource: Send + Sync {
    /// Current heading in degrees, counter-clockwise positive.
    fn heading_degrees(&self) -> f64;
}

/// A heading that never changes.  Handy for bench setups and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedHeading(pub f64);

impl HeadingSource for FixedHeading {
    fn heading_degrees(&self) -> f64 {
        self.0
    }
}

/// The fused heading, for setups where the filter is the heading authority.
impl HeadingSource for PoseFusion {
    fn heading_degrees(&self) -> f64 {
        PoseFusion::heading_degrees(self)
    }
}
