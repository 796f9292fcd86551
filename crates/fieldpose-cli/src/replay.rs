//! `fieldpose replay` – feed a recorded JSON-lines detection log through an
//! estimator and report what would have reached the fusion filter.
//!
//! Each non-empty line is one serialized `DetectionResult`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use colored::Colorize;
use fieldpose_hal::FixedHeading;
use fieldpose_hal::sim::SimCamera;
use fieldpose_perception::{DetectionResult, VisionMeasurement};
use fieldpose_runtime::{PoseEstimator, TickOutcome};
use fieldpose_types::VisionError;
use tracing::info;

use crate::config::Config;

/// Per-outcome counts for one replay.
#[derive(Debug, Default, PartialEq)]
pub struct ReplaySummary {
    pub frames: usize,
    pub no_target: usize,
    pub repeated: usize,
    pub fused: usize,
    /// Rejections keyed by gate rule or failure kind.
    pub rejected: BTreeMap<String, usize>,
}

impl ReplaySummary {
    fn record(&mut self, outcome: &TickOutcome) {
        self.frames += 1;
        match outcome {
            TickOutcome::NoTarget => self.no_target += 1,
            TickOutcome::RepeatedFrame => self.repeated += 1,
            TickOutcome::Fused(_) => self.fused += 1,
            TickOutcome::Rejected(e) => *self.rejected.entry(reason(e)).or_default() += 1,
        }
    }
}

fn reason(e: &VisionError) -> String {
    match e {
        VisionError::GateRejected { rule, .. } => rule.clone(),
        VisionError::UnknownTag(_) => "unknown_tag".to_string(),
        VisionError::MissingTagId => "missing_tag_id".to_string(),
        VisionError::DegenerateGeometry { .. } => "degenerate_geometry".to_string(),
        VisionError::NoTarget => "no_target".to_string(),
        VisionError::HardwareFault { .. } => "hardware_fault".to_string(),
        VisionError::Config(_) => "config".to_string(),
    }
}

/// Parse a JSON-lines log; blank lines are skipped.
pub fn parse_log(raw: &str) -> Result<Vec<DetectionResult>, String> {
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|e| format!("line {}: {}", i + 1, e))
        })
        .collect()
}

/// Run `results` through an estimator for the first configured camera.
pub fn replay_results(
    cfg: &Config,
    results: Vec<DetectionResult>,
    heading_deg: f64,
) -> Result<(Vec<VisionMeasurement>, ReplaySummary), String> {
    let mount = cfg
        .cameras
        .first()
        .cloned()
        .ok_or_else(|| "config lists no cameras".to_string())?;

    let camera = SimCamera::new(mount.hostname.clone());
    let feed = camera.handle();
    let frames = results.len();
    for result in results {
        feed.push_result(result);
    }

    let mut estimator = PoseEstimator::new(
        Box::new(camera),
        mount,
        Arc::new(cfg.registry()),
        Arc::new(FixedHeading(heading_deg)),
        &cfg.estimator,
    );

    let mut accepted: Vec<VisionMeasurement> = Vec::new();
    let mut summary = ReplaySummary::default();
    for _ in 0..frames {
        let outcome = estimator.update(&mut accepted);
        summary.record(&outcome);
    }
    Ok((accepted, summary))
}

pub fn run(cfg: &Config, log: &Path, heading_deg: f64) -> Result<(), String> {
    let raw = fs::read_to_string(log)
        .map_err(|e| format!("Failed to read log at {}: {}", log.display(), e))?;
    let results = parse_log(&raw)?;
    info!(log = %log.display(), frames = results.len(), "replaying detection log");

    let (accepted, summary) = replay_results(cfg, results, heading_deg)?;

    for m in &accepted {
        println!(
            "  {} t={:>10.3}s  x={:>7.3}  y={:>7.3}  θ={:>7.2}°",
            "fused".green(),
            m.timestamp_seconds,
            m.pose.translation.x,
            m.pose.translation.y,
            m.pose.rotation.degrees()
        );
    }

    println!();
    println!("  {}", "Summary".bold());
    println!("    frames     {}", summary.frames);
    println!("    fused      {}", summary.fused.to_string().green());
    println!("    no target  {}", summary.no_target);
    println!("    repeated   {}", summary.repeated);
    for (why, count) in &summary.rejected {
        println!("    rejected   {} ({})", count.to_string().yellow(), why);
    }
    Ok(())
}
