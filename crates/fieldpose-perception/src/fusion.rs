//! Vision measurement fusion.
//!
//! [`FusionSink`] is the boundary the estimator forwards accepted vision
//! poses to.  Anything that blends timestamped pose measurements into a
//! running estimate can implement it.
//!
//! [`PoseFusion`] is a reference implementation: a latency-compensated
//! complementary filter over wheel odometry.  Vision measurements are
//! timestamped at light-capture time, which is in the past by the time they
//! arrive, so the filter keeps a short odometry history and applies each
//! correction at the moment it was observed:
//!
//! ```text
//! est(t)       = est(now) ∘ (odom(now) → odom(t))
//! corrected(t) = est(t) + k · (vision − est(t))
//! est(now)     = corrected(t) ∘ (odom(t) → odom(now))
//! ```
//!
//! where `k = vision_trust ∈ [0, 1]`.
//!
//! # Example
//!
//! ```rust
//! use fieldpose_perception::fusion::{FusionSink, PoseFusion};
//! use fieldpose_perception::geometry::Pose2d;
//!
//! let mut fusion = PoseFusion::new(1.0);
//! fusion.update_odometry(0.00, Pose2d::from_xy_degrees(0.0, 0.0, 0.0));
//! fusion.update_odometry(0.02, Pose2d::from_xy_degrees(0.1, 0.0, 0.0));
//!
//! // Vision saw the robot at (2, 1) at t = 0.02.
//! fusion.add_vision_measurement(Pose2d::from_xy_degrees(2.0, 1.0, 0.0), 0.02);
//! assert!((fusion.estimate().translation.x - 2.0).abs() < 1e-9);
//! ```

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry::{Pose2d, Rotation2d, Transform2d, angle_difference_degrees};

/// Default length of odometry history kept for latency compensation.
pub const DEFAULT_HISTORY_SECONDS: f64 = 1.5;

// ────────────────────────────────────────────────────────────────────────────
// Sink boundary
// ────────────────────────────────────────────────────────────────────────────

/// Accepts gated vision poses stamped with their capture time.
pub trait FusionSink {
    fn add_vision_measurement(&mut self, pose: Pose2d, timestamp_seconds: f64);
}

/// An accepted vision measurement as forwarded to a [`FusionSink`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisionMeasurement {
    pub pose: Pose2d,
    pub timestamp_seconds: f64,
}

/// Recording sink: keeps every measurement in arrival order.
impl FusionSink for Vec<VisionMeasurement> {
    fn add_vision_measurement(&mut self, pose: Pose2d, timestamp_seconds: f64) {
        self.push(VisionMeasurement {
            pose,
            timestamp_seconds,
        });
    }
}

// ────────────────────────────────────────────────────────────────────────────
// PoseFusion
// ────────────────────────────────────────────────────────────────────────────

/// Latency-compensated complementary filter fusing odometry with vision.
#[derive(Debug)]
pub struct PoseFusion {
    /// Fraction of each vision discrepancy applied (0–1).
    vision_trust: f64,
    history_seconds: f64,
    /// `(timestamp, raw odometry pose)`, oldest first.
    history: VecDeque<(f64, Pose2d)>,
    estimate: Pose2d,
}

impl PoseFusion {
    /// `vision_trust` is clamped to `[0, 1]`.
    pub fn new(vision_trust: f64) -> Self {
        Self::with_history(vision_trust, DEFAULT_HISTORY_SECONDS)
    }

    pub fn with_history(vision_trust: f64, history_seconds: f64) -> Self {
        Self {
            vision_trust: vision_trust.clamp(0.0, 1.0),
            history_seconds: history_seconds.max(0.0),
            history: VecDeque::new(),
            estimate: Pose2d::identity(),
        }
    }

    /// Current fused field pose.
    pub fn estimate(&self) -> Pose2d {
        self.estimate
    }

    /// Current fused heading in degrees.
    pub fn heading_degrees(&self) -> f64 {
        self.estimate.rotation.degrees()
    }

    /// Overwrite the fused estimate, e.g. at the start of a match.
    pub fn reset_to(&mut self, pose: Pose2d) {
        self.estimate = pose;
    }

    /// Feed the latest raw odometry pose sampled at `timestamp_seconds`.
    ///
    /// Samples must arrive in non-decreasing time order; an out-of-order
    /// sample is dropped.
    pub fn update_odometry(&mut self, timestamp_seconds: f64, odometry: Pose2d) {
        if let Some(&(last_t, last_pose)) = self.history.back() {
            if timestamp_seconds < last_t {
                debug!(timestamp_seconds, last_t, "out-of-order odometry sample dropped");
                return;
            }
            let delta = Transform2d::between(last_pose, odometry);
            self.estimate = self.estimate.transform_by(delta);
        }
        self.history.push_back((timestamp_seconds, odometry));

        let horizon = timestamp_seconds - self.history_seconds;
        while self.history.len() > 1 && self.history.front().is_some_and(|(t, _)| *t < horizon) {
            self.history.pop_front();
        }
    }

    /// Raw odometry interpolated at `t`; clamps to the newest sample when
    /// `t` is in the future.  `None` when `t` predates the history.
    fn odometry_at(&self, t: f64) -> Option<Pose2d> {
        let &(first_t, first_pose) = self.history.front()?;
        if t < first_t {
            return None;
        }
        if t == first_t {
            return Some(first_pose);
        }
        let mut prev = (first_t, first_pose);
        for &(ti, pi) in self.history.iter().skip(1) {
            if t <= ti {
                let span = ti - prev.0;
                let k = if span > 0.0 { (t - prev.0) / span } else { 1.0 };
                return Some(interpolate(prev.1, pi, k));
            }
            prev = (ti, pi);
        }
        Some(prev.1)
    }
}

impl FusionSink for PoseFusion {
    fn add_vision_measurement(&mut self, pose: Pose2d, timestamp_seconds: f64) {
        let Some(&(_, odom_now)) = self.history.back() else {
            debug!("vision measurement before any odometry; ignored");
            return;
        };
        let Some(odom_then) = self.odometry_at(timestamp_seconds) else {
            debug!(timestamp_seconds, "vision measurement older than odometry history; ignored");
            return;
        };

        let estimate_then = self
            .estimate
            .transform_by(Transform2d::between(odom_now, odom_then));
        let corrected_then = interpolate(estimate_then, pose, self.vision_trust);
        self.estimate = corrected_then.transform_by(Transform2d::between(odom_then, odom_now));
    }
}

/// Linear blend of translation and shortest-arc blend of heading.
fn interpolate(from: Pose2d, to: Pose2d, k: f64) -> Pose2d {
    let translation = from
        .translation
        .plus(to.translation.minus(from.translation).scale(k));
    let dtheta = angle_difference_degrees(to.rotation.degrees(), from.rotation.degrees());
    Pose2d::new(
        translation,
        from.rotation.plus(Rotation2d::from_degrees(dtheta * k)),
    )
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
