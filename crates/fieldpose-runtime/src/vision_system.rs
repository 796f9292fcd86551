//! [`VisionSystem`] – multi-camera tick orchestration.
//!
//! Every registered [`PoseEstimator`] is updated once per tick in
//! registration order; estimators are independent, so the order only
//! decides the order of measurements at the sink.  Each camera's detector
//! timestamp is fed to a [`Watchdog`] so a camera that froze on one frame
//! is reported as stale instead of silently contributing nothing.
//!
//! Fusion for a control period is final once [`VisionSystem::tick`]
//! returns.

use std::collections::HashSet;

use fieldpose_kernel::watchdog::{CameraHealth, Watchdog};
use fieldpose_perception::FusionSink;
use fieldpose_types::{Pipeline, VisionError};
use tracing::{info, warn};

use crate::estimator::{PoseEstimator, TickOutcome};

/// Default time without a new frame before a camera counts as stale.
pub const DEFAULT_FRAME_TIMEOUT_SECONDS: f64 = 0.5;

/// One camera's share of a tick.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraReport {
    pub camera: String,
    pub outcome: TickOutcome,
    pub health: CameraHealth,
}

/// Owns the per-camera estimators and the frame watchdog.
pub struct VisionSystem {
    estimators: Vec<PoseEstimator>,
    watchdog: Watchdog,
    frame_timeout_seconds: f64,
    stale: HashSet<String>,
}

impl Default for VisionSystem {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_TIMEOUT_SECONDS)
    }
}

impl VisionSystem {
    pub fn new(frame_timeout_seconds: f64) -> Self {
        Self {
            estimators: Vec::new(),
            watchdog: Watchdog::new(),
            frame_timeout_seconds,
            stale: HashSet::new(),
        }
    }

    /// Register a camera; its watchdog deadline starts at `now`.
    pub fn add_camera(&mut self, estimator: PoseEstimator, now: f64) {
        self.watchdog
            .register(estimator.name(), self.frame_timeout_seconds, now);
        info!(camera = estimator.name(), pipeline = %estimator.pipeline(), "camera registered");
        self.estimators.push(estimator);
    }

    pub fn len(&self) -> usize {
        self.estimators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.estimators.is_empty()
    }

    pub fn estimators(&self) -> &[PoseEstimator] {
        &self.estimators
    }

    pub fn estimator_mut(&mut self, name: &str) -> Option<&mut PoseEstimator> {
        self.estimators.iter_mut().find(|e| e.name() == name)
    }

    /// Update every camera once and forward accepted poses to `sink`.
    pub fn tick(&mut self, now: f64, sink: &mut dyn FusionSink) -> Vec<CameraReport> {
        let mut reports = Vec::with_capacity(self.estimators.len());
        for estimator in &mut self.estimators {
            let outcome = estimator.update(sink);
            let name = estimator.name().to_string();
            self.watchdog
                .observe(&name, estimator.last_result().timestamp_seconds, now);
            let health = self.watchdog.health(&name, now);

            match health {
                CameraHealth::Stale if self.stale.insert(name.clone()) => {
                    warn!(camera = %name, timeout = self.frame_timeout_seconds, "camera frames stopped advancing");
                }
                CameraHealth::Healthy if self.stale.remove(&name) => {
                    info!(camera = %name, "camera frames resumed");
                }
                _ => {}
            }

            reports.push(CameraReport {
                camera: name,
                outcome,
                health,
            });
        }
        reports
    }

    /// Ids of cameras whose frames stopped advancing, sorted.
    pub fn stale_cameras(&self, now: f64) -> Vec<String> {
        self.watchdog.check_all(now)
    }

    /// Switch every camera to `pipeline`.  Every camera is attempted; the
    /// first failure is returned.
    pub fn set_pipeline(&mut self, pipeline: Pipeline) -> Result<(), VisionError> {
        let mut first_error = None;
        for estimator in &mut self.estimators {
            if let Err(e) = estimator.set_pipeline(pipeline) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Drive every illuminator; cameras without one are skipped.
    pub fn set_led(&mut self, on: bool) -> Result<(), VisionError> {
        let mut first_error = None;
        for estimator in &mut self.estimators {
            if let Err(e) = estimator.set_led(on) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
