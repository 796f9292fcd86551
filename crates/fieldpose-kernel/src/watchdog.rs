//! [`Watchdog`] – camera frame-progress monitor.
//!
//! Cameras serve their latest frame forever, so a hung coprocessor looks
//! like a camera that keeps reporting the same result.  The watchdog
//! records, per camera, when the detector timestamp last advanced and
//! flags cameras that have made no progress within their timeout.
//!
//! Time is supplied by the caller (control-loop seconds) so behaviour is
//! deterministic under test and replay.

use std::collections::HashMap;

/// Health reported for one camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraHealth {
    /// A new frame arrived within the timeout.
    Healthy,
    /// No new frame within the timeout, or the camera is unknown.
    Stale,
}

struct CameraEntry {
    last_frame_timestamp: Option<f64>,
    last_progress: f64,
    timeout_seconds: f64,
}

/// Tracks frame progress of registered cameras.
///
/// # Example
///
/// ```
/// use fieldpose_kernel::watchdog::{CameraHealth, Watchdog};
///
/// let mut wd = Watchdog::new();
/// wd.register("front", 0.5, 0.0);
/// wd.observe("front", 10.00, 0.02);
/// assert_eq!(wd.health("front", 0.3), CameraHealth::Healthy);
///
/// // Same frame again for a whole second → stale.
/// wd.observe("front", 10.00, 1.0);
/// assert_eq!(wd.health("front", 1.0), CameraHealth::Stale);
/// ```
#[derive(Default)]
pub struct Watchdog {
    cameras: HashMap<String, CameraEntry>,
}

impl Watchdog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `camera_id`; it starts healthy as of `now`.
    /// Re-registering resets its deadline.
    pub fn register(&mut self, camera_id: &str, timeout_seconds: f64, now: f64) {
        self.cameras.insert(
            camera_id.to_string(),
            CameraEntry {
                last_frame_timestamp: None,
                last_progress: now,
                timeout_seconds,
            },
        );
    }

    /// Record the detector timestamp read from `camera_id` at `now`.
    /// No-ops for unregistered cameras.
    pub fn observe(&mut self, camera_id: &str, frame_timestamp: f64, now: f64) {
        if let Some(entry) = self.cameras.get_mut(camera_id)
            && entry.last_frame_timestamp != Some(frame_timestamp)
        {
            entry.last_frame_timestamp = Some(frame_timestamp);
            entry.last_progress = now;
        }
    }

    /// Unknown cameras are reported [`CameraHealth::Stale`].
    pub fn health(&self, camera_id: &str, now: f64) -> CameraHealth {
        match self.cameras.get(camera_id) {
            Some(entry) if now - entry.last_progress <= entry.timeout_seconds => {
                CameraHealth::Healthy
            }
            _ => CameraHealth::Stale,
        }
    }

    /// Ids of every stale camera, sorted.
    pub fn check_all(&self, now: f64) -> Vec<String> {
        let mut stale: Vec<String> = self
            .cameras
            .iter()
            .filter(|(_, e)| now - e.last_progress > e.timeout_seconds)
            .map(|(id, _)| id.clone())
            .collect();
        stale.sort();
        stale
    }
}
