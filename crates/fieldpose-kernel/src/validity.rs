//! [`ValidityGate`] – plausibility rule engine for vision pose estimates.
//!
//! Before an estimate reaches the fusion filter it is passed through
//! [`ValidityGate::verify`].  Every registered [`GateRule`] is evaluated in
//! order; the first violation returns [`VisionError::GateRejected`] and the
//! estimate is **not** forwarded.
//!
//! Built-in rules:
//! - [`FiniteEstimateRule`] – rejects NaN/infinite poses.
//! - [`AmbiguityRule`] – fiducial pipeline only; compares the tag's pose
//!   ambiguity against a threshold in the configured direction.
//! - [`FieldBoundsRule`] – rejects translations outside the field.
//! - [`HeadingAgreementRule`] – rejects headings too far from the reference
//!   heading.
//!
//! # Example
//!
//! ```
//! use fieldpose_kernel::validity::{GateConfig, GateInput, ValidityGate};
//! use fieldpose_perception::{Pose2d, TrackedTarget};
//! use fieldpose_types::Pipeline;
//!
//! let gate = ValidityGate::standard(&GateConfig::default());
//! let target = TrackedTarget::landmark(0.0, 5.0, 1.0);
//!
//! let inside = GateInput {
//!     pipeline: Pipeline::Green,
//!     target: &target,
//!     estimate: Pose2d::from_xy_degrees(3.0, 2.0, 0.0),
//!     reference_heading_deg: 0.0,
//! };
//! assert!(gate.verify(&inside).is_ok());
//!
//! let outside = GateInput { estimate: Pose2d::from_xy_degrees(-1.0, 2.0, 0.0), ..inside };
//! assert!(gate.verify(&outside).is_err());
//! ```

use fieldpose_perception::geometry::angle_difference_degrees;
use fieldpose_perception::{FieldDimensions, Pose2d, TrackedTarget};
use fieldpose_types::{AmbiguityPolicy, Pipeline, VisionError};
use serde::{Deserialize, Serialize};
use tracing::debug;

// ────────────────────────────────────────────────────────────────────────────
// Inputs and configuration
// ────────────────────────────────────────────────────────────────────────────

/// Everything a rule may look at for one candidate estimate.
#[derive(Debug, Clone, Copy)]
pub struct GateInput<'a> {
    /// Pipeline active when the target was detected.
    pub pipeline: Pipeline,
    /// The best target this tick.
    pub target: &'a TrackedTarget,
    /// Candidate field-relative robot pose.
    pub estimate: Pose2d,
    /// Reference heading from the gyro/odometry (degrees).
    pub reference_heading_deg: f64,
}

/// Thresholds for [`ValidityGate::standard`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(default)]
    pub field: FieldDimensions,
    #[serde(default = "default_ambiguity_threshold")]
    pub ambiguity_threshold: f64,
    #[serde(default)]
    pub ambiguity_policy: AmbiguityPolicy,
    #[serde(default = "default_angle_threshold")]
    pub angle_threshold_deg: f64,
}

fn default_ambiguity_threshold() -> f64 {
    0.2
}

fn default_angle_threshold() -> f64 {
    5.0
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            field: FieldDimensions::default(),
            ambiguity_threshold: default_ambiguity_threshold(),
            ambiguity_policy: AmbiguityPolicy::default(),
            angle_threshold_deg: default_angle_threshold(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Rule trait
// ────────────────────────────────────────────────────────────────────────────

/// A single plausibility check an estimate must pass.
pub trait GateRule: Send + Sync {
    /// Name used in rejection messages.
    fn name(&self) -> &str;

    /// `Ok(())` when the estimate passes, [`VisionError::GateRejected`]
    /// otherwise.
    fn check(&self, input: &GateInput<'_>) -> Result<(), VisionError>;
}

fn reject(rule: &dyn GateRule, details: String) -> VisionError {
    VisionError::GateRejected {
        rule: rule.name().to_string(),
        details,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ValidityGate
// ────────────────────────────────────────────────────────────────────────────

/// Ordered collection of [`GateRule`]s.
#[derive(Default)]
pub struct ValidityGate {
    rules: Vec<Box<dyn GateRule>>,
}

impl ValidityGate {
    /// An empty gate that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// The production rule set: finite → ambiguity → field bounds → heading.
    pub fn standard(config: &GateConfig) -> Self {
        let mut gate = Self::new();
        gate.add_rule(Box::new(FiniteEstimateRule));
        gate.add_rule(Box::new(AmbiguityRule {
            threshold: config.ambiguity_threshold,
            policy: config.ambiguity_policy,
        }));
        gate.add_rule(Box::new(FieldBoundsRule {
            field: config.field,
        }));
        gate.add_rule(Box::new(HeadingAgreementRule {
            threshold_deg: config.angle_threshold_deg,
        }));
        gate
    }

    /// Rules are evaluated in insertion order.
    pub fn add_rule(&mut self, rule: Box<dyn GateRule>) {
        self.rules.push(rule);
    }

    /// Names of the installed rules, in evaluation order.
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Return the first rejection, or `Ok(())` when every rule passes.
    pub fn verify(&self, input: &GateInput<'_>) -> Result<(), VisionError> {
        for rule in &self.rules {
            if let Err(e) = rule.check(input) {
                debug!(rule = rule.name(), pipeline = %input.pipeline, error = %e, "estimate rejected");
                return Err(e);
            }
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Built-in rules
// ────────────────────────────────────────────────────────────────────────────

/// Rejects estimates with NaN or infinite components.
pub struct FiniteEstimateRule;

impl GateRule for FiniteEstimateRule {
    fn name(&self) -> &str {
        "finite_estimate"
    }

    fn check(&self, input: &GateInput<'_>) -> Result<(), VisionError> {
        if input.estimate.is_finite() {
            Ok(())
        } else {
            Err(reject(self, format!("non-finite pose {:?}", input.estimate)))
        }
    }
}

/// Fiducial-pipeline ambiguity check.  Colored pipelines are never
/// affected.
///
/// With [`AmbiguityPolicy::RejectBelow`] a tag whose ambiguity is below
/// `threshold` is rejected, including the unset sentinel `-1`.  With
/// [`AmbiguityPolicy::RejectAbove`] a tag above `threshold` is rejected.
pub struct AmbiguityRule {
    pub threshold: f64,
    pub policy: AmbiguityPolicy,
}

impl GateRule for AmbiguityRule {
    fn name(&self) -> &str {
        "ambiguity"
    }

    fn check(&self, input: &GateInput<'_>) -> Result<(), VisionError> {
        if !input.pipeline.is_fiducial() {
            return Ok(());
        }
        let ambiguity = input.target.pose_ambiguity;
        let rejected = match self.policy {
            AmbiguityPolicy::RejectBelow => ambiguity < self.threshold,
            AmbiguityPolicy::RejectAbove => ambiguity > self.threshold,
        };
        if rejected {
            return Err(reject(
                self,
                format!(
                    "ambiguity {ambiguity} vs threshold {} ({:?})",
                    self.threshold, self.policy
                ),
            ));
        }
        Ok(())
    }
}

/// Rejects translations outside `[0, length_x] × [0, width_y]`.
pub struct FieldBoundsRule {
    pub field: FieldDimensions,
}

impl GateRule for FieldBoundsRule {
    fn name(&self) -> &str {
        "field_bounds"
    }

    fn check(&self, input: &GateInput<'_>) -> Result<(), VisionError> {
        let t = input.estimate.translation;
        if self.field.contains(t) {
            return Ok(());
        }
        Err(reject(
            self,
            format!(
                "({:.3}, {:.3}) outside [0, {}] x [0, {}]",
                t.x, t.y, self.field.length_x, self.field.width_y
            ),
        ))
    }
}

/// Rejects estimates whose heading disagrees with the reference heading by
/// more than `threshold_deg`, measured the short way round.
pub struct HeadingAgreementRule {
    pub threshold_deg: f64,
}

impl GateRule for HeadingAgreementRule {
    fn name(&self) -> &str {
        "heading_agreement"
    }

    fn check(&self, input: &GateInput<'_>) -> Result<(), VisionError> {
        let estimated = input.estimate.rotation.degrees();
        let diff = angle_difference_degrees(estimated, input.reference_heading_deg);
        if diff.abs() > self.threshold_deg {
            return Err(reject(
                self,
                format!(
                    "heading {estimated:.2} vs reference {:.2} differs by {:.2} > {}",
                    input.reference_heading_deg,
                    diff.abs(),
                    self.threshold_deg
                ),
            ));
        }
        Ok(())
    }
}
