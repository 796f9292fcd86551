//! Configuration Vault – reads/writes `~/.fieldpose/config.toml`.

use fieldpose_hal::CameraMount;
use fieldpose_perception::landmarks::TagEntry;
use fieldpose_perception::{FieldLandmark, LandmarkRegistry, Pose2d, Rotation2d, Transform2d, Translation2d};
use fieldpose_runtime::EstimatorConfig;
use fieldpose_types::VisionError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted robot vision configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Control-loop period for `sim` (milliseconds).
    #[serde(default = "default_loop_period_ms")]
    pub loop_period_ms: u64,

    /// Seconds without a new frame before a camera is reported stale.
    #[serde(default = "default_frame_timeout")]
    pub frame_timeout_seconds: f64,

    /// Fraction of each vision discrepancy the fusion filter applies.
    #[serde(default = "default_vision_trust")]
    pub vision_trust: f64,

    /// Pipeline and validity-gate thresholds shared by every camera.
    #[serde(default)]
    pub estimator: EstimatorConfig,

    /// The colored landmark (hub) pose and radius.
    #[serde(default)]
    pub landmark: FieldLandmark,

    /// Fiducial field poses.
    #[serde(default = "default_tags")]
    pub tags: Vec<TagEntry>,

    #[serde(default = "default_cameras")]
    pub cameras: Vec<CameraMount>,
}

fn default_loop_period_ms() -> u64 {
    20
}
fn default_frame_timeout() -> f64 {
    0.5
}
fn default_vision_trust() -> f64 {
    0.3
}

/// One tag centred on each wall, facing into the field.
fn default_tags() -> Vec<TagEntry> {
    let field = EstimatorConfig::default().gate.field;
    let (x, y) = (field.length_x, field.width_y);
    vec![
        TagEntry { id: 1, pose: Pose2d::from_xy_degrees(0.0, y / 2.0, 0.0) },
        TagEntry { id: 2, pose: Pose2d::from_xy_degrees(x, y / 2.0, 180.0) },
        TagEntry { id: 3, pose: Pose2d::from_xy_degrees(x / 2.0, 0.0, 90.0) },
        TagEntry { id: 4, pose: Pose2d::from_xy_degrees(x / 2.0, y, -90.0) },
    ]
}

fn default_cameras() -> Vec<CameraMount> {
    vec![
        CameraMount::new("limelight")
            .with_offset(Transform2d::new(
                Translation2d::new(0.25, 0.0),
                Rotation2d::identity(),
            ))
            .with_elevation(30.0, 0.6, 2.64)
            .with_led(true),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            loop_period_ms: default_loop_period_ms(),
            frame_timeout_seconds: default_frame_timeout(),
            vision_trust: default_vision_trust(),
            estimator: EstimatorConfig::default(),
            landmark: FieldLandmark::default(),
            tags: default_tags(),
            cameras: default_cameras(),
        }
    }
}

impl Config {
    /// The immutable registry the estimators share.
    pub fn registry(&self) -> LandmarkRegistry {
        self.tags
            .iter()
            .fold(LandmarkRegistry::new(self.landmark), |reg, tag| {
                reg.with_tag(tag.id, tag.pose)
            })
    }

    /// Reject configurations the estimator cannot run with.
    pub fn validate(&self) -> Result<(), VisionError> {
        let gate = &self.estimator.gate;
        if !(gate.field.length_x > 0.0 && gate.field.width_y > 0.0) {
            return Err(VisionError::Config(format!(
                "field dimensions must be positive, got {} x {}",
                gate.field.length_x, gate.field.width_y
            )));
        }
        if !(gate.ambiguity_threshold >= 0.0) {
            return Err(VisionError::Config(format!(
                "ambiguity_threshold must be >= 0, got {}",
                gate.ambiguity_threshold
            )));
        }
        if !(gate.angle_threshold_deg >= 0.0) {
            return Err(VisionError::Config(format!(
                "angle_threshold_deg must be >= 0, got {}",
                gate.angle_threshold_deg
            )));
        }
        if self.loop_period_ms == 0 {
            return Err(VisionError::Config("loop_period_ms must be > 0".to_string()));
        }

        let mut hosts = HashSet::new();
        for cam in &self.cameras {
            if !hosts.insert(cam.hostname.as_str()) {
                return Err(VisionError::Config(format!(
                    "camera hostname '{}' is listed twice",
                    cam.hostname
                )));
            }
        }
        let mut ids = HashSet::new();
        for tag in &self.tags {
            if !ids.insert(tag.id) {
                return Err(VisionError::Config(format!("tag {} is listed twice", tag.id)));
            }
        }
        Ok(())
    }
}

/// Return the path to `~/.fieldpose/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".fieldpose").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

/// Read, apply `FIELDPOSE_*` overrides, then validate.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    let Some(mut cfg) = read_from(path)? else {
        return Ok(None);
    };
    apply_env_overrides(&mut cfg);
    cfg.validate().map_err(|e| e.to_string())?;
    Ok(Some(cfg))
}

/// Parse and validate the file as written, without environment overrides.
pub(crate) fn read_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    cfg.validate().map_err(|e| e.to_string())?;
    Ok(Some(cfg))
}

/// Apply `FIELDPOSE_*` environment variable overrides to `cfg`.
/// Values that do not parse are ignored.
///
/// | Variable | Config field |
/// |---|---|
/// | `FIELDPOSE_ANGLE_THRESHOLD` | `estimator.angle_threshold_deg` |
/// | `FIELDPOSE_AMBIGUITY_THRESHOLD` | `estimator.ambiguity_threshold` |
/// | `FIELDPOSE_LOOP_PERIOD_MS` | `loop_period_ms` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("FIELDPOSE_ANGLE_THRESHOLD")
        && let Ok(deg) = v.trim().parse::<f64>()
    {
        cfg.estimator.gate.angle_threshold_deg = deg;
    }
    if let Ok(v) = std::env::var("FIELDPOSE_AMBIGUITY_THRESHOLD")
        && let Ok(threshold) = v.trim().parse::<f64>()
    {
        cfg.estimator.gate.ambiguity_threshold = threshold;
    }
    if let Ok(v) = std::env::var("FIELDPOSE_LOOP_PERIOD_MS")
        && let Ok(ms) = v.trim().parse::<u64>()
    {
        cfg.loop_period_ms = ms;
    }
}

/// Save the config to disk, creating `~/.fieldpose/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw = render(cfg)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}

/// The config as it would be written to disk.
pub fn render(cfg: &Config) -> Result<String, String> {
    toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))
}
