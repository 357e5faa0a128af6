//! Application configuration.
//!
//! [`AppConfig`] is the persisted, user-editable layer. Front-ends merge it
//! with their own flags into a [`RunConfig`], which stays immutable for the
//! lifetime of a run.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{KeepsakeError, KeepsakeResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Defaults applied to every run unless overridden.
    #[serde(default)]
    pub run: RunDefaults,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Default run parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunDefaults {
    /// Directory that receives the organized library.
    pub output_root: PathBuf,

    /// Worker count. `None` means one worker per logical core.
    pub concurrency: Option<usize>,

    /// Write image bases without compositing their overlay.
    pub skip_image_overlay: bool,

    /// Write video bases without compositing their overlay.
    pub skip_video_overlay: bool,

    /// Keep the original ZIP bundles under `overlays/archives/`.
    pub keep_archives: bool,

    /// Custom file-name timestamp template (e.g. `YYYYMMDD_HHMMSS`).
    pub date_format: Option<String>,

    /// Per-request timeout in seconds. `None` waits indefinitely.
    pub fetch_timeout_secs: Option<u64>,

    /// How per-job failures are surfaced.
    pub failure_policy: FailurePolicy,

    /// Which archive member wins when several match the same role.
    pub duplicate_policy: DuplicatePolicy,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "keepsake=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

/// Policy for per-job failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Failed jobs count as completed and are only logged at debug level.
    #[default]
    Swallow,
    /// Failed jobs are logged as warnings and fail the run at the end.
    Surface,
}

/// Resolution rule for archives holding several members of the same role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// The member encountered last in the central directory wins.
    #[default]
    LastWins,
    /// The member encountered first wins.
    FirstWins,
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("./output"),
            concurrency: None,
            skip_image_overlay: false,
            skip_video_overlay: false,
            keep_archives: false,
            date_format: None,
            fetch_timeout_secs: None,
            failure_policy: FailurePolicy::Swallow,
            duplicate_policy: DuplicatePolicy::LastWins,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

/// Immutable configuration for one run of the pipeline.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Export document (`.html` or `.json`).
    pub input_path: PathBuf,

    /// Root of the organized output library.
    pub output_root: PathBuf,

    /// Number of parallel workers, always at least one.
    pub concurrency: usize,

    pub skip_image_overlay: bool,
    pub skip_video_overlay: bool,
    pub keep_archives: bool,

    /// Custom file-name timestamp template.
    pub date_format: Option<String>,

    /// Per-request timeout for downloads.
    pub fetch_timeout: Option<Duration>,

    pub failure_policy: FailurePolicy,
    pub duplicate_policy: DuplicatePolicy,
}

impl RunConfig {
    /// Build a run configuration from persisted defaults.
    pub fn from_defaults(input_path: impl Into<PathBuf>, defaults: &RunDefaults) -> Self {
        Self {
            input_path: input_path.into(),
            output_root: defaults.output_root.clone(),
            concurrency: clamp_concurrency(defaults.concurrency),
            skip_image_overlay: defaults.skip_image_overlay,
            skip_video_overlay: defaults.skip_video_overlay,
            keep_archives: defaults.keep_archives,
            date_format: defaults.date_format.clone().filter(|f| !f.is_empty()),
            fetch_timeout: defaults.fetch_timeout_secs.map(Duration::from_secs),
            failure_policy: defaults.failure_policy,
            duplicate_policy: defaults.duplicate_policy,
        }
    }
}

/// Resolve a requested worker count: `None` means one per logical core,
/// and anything below one is raised to one.
pub fn clamp_concurrency(requested: Option<usize>) -> usize {
    requested
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
        .max(1)
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &std::path::Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> KeepsakeResult<()> {
        self.save_to(&config_file_path())
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, config_path: &std::path::Path) -> KeepsakeResult<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                KeepsakeError::config(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, json)?;
        Ok(())
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("keepsake").join("config.json")
}
