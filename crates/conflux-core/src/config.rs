//! Configuration module for Conflux.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.
//! Command-line flags take precedence over values loaded here.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for Conflux.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scan: ScanConfig,
    pub execution: ExecutionConfig,
    pub prompt: PromptConfig,
    pub logging: LoggingConfig,
}

/// Directory scan settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Glob patterns, relative to the scan root, for entries that are never visited.
    pub exclude: Vec<String>,
    /// Refuse to scan a root that lacks the synchronization tool's folder marker.
    pub require_marker: bool,
    /// Name of the folder marker checked when `require_marker` is set.
    pub marker: String,
    /// Number of files hashed concurrently when comparing content.
    pub workers: u16,
}

/// Plan execution settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Directory, relative to the scan root, that receives losing copies
    /// instead of deleting them. `None` deletes them.
    pub backup_dir: Option<String>,
}

/// Interactive prompt settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Diff tool used to compare candidates; auto-detected when `None`.
    pub diff_tool: Option<String>,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/conflux/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("conflux")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Folder marker written by the synchronization tool at the root of a shared folder.
pub const DEFAULT_MARKER: &str = ".stfolder";

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            exclude: vec![".stversions".to_string()],
            require_marker: false,
            marker: DEFAULT_MARKER.to_string(),
            workers: 4,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"scan.workers"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Upper bound for `scan.workers`.
const MAX_WORKERS: u16 = 64;

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- scan ---
        if self.scan.workers == 0 || self.scan.workers > MAX_WORKERS {
            errors.push(ValidationError {
                field: "scan.workers".into(),
                message: format!("must be in range 1..={MAX_WORKERS}"),
            });
        }
        if self.scan.exclude.iter().any(|p| p.trim().is_empty()) {
            errors.push(ValidationError {
                field: "scan.exclude".into(),
                message: "patterns must not be empty".into(),
            });
        }
        if self.scan.require_marker && self.scan.marker.trim().is_empty() {
            errors.push(ValidationError {
                field: "scan.marker".into(),
                message: "must be set when require_marker is enabled".into(),
            });
        }

        // --- execution ---
        if let Some(dir) = &self.execution.backup_dir {
            if let Some(message) = backup_dir_problem(dir) {
                errors.push(ValidationError {
                    field: "execution.backup_dir".into(),
                    message,
                });
            }
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

/// Checks that a backup directory stays inside the scan root.
pub fn backup_dir_problem(dir: &str) -> Option<String> {
    let path = Path::new(dir);
    if dir.trim().is_empty() {
        return Some("must not be empty".into());
    }
    if path.is_absolute() {
        return Some(format!("must be relative to the scan root: {dir}"));
    }
    if path
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
    {
        return Some(format!("must not leave the scan root: {dir}"));
    }
    if normalized_components(path).next().is_none() {
        return Some(format!("must name a directory below the scan root: {dir}"));
    }
    None
}

/// Backup directory as a clean root-relative path, `None` when it is unusable.
///
/// `./.bak`, `.bak/` and `.bak` all normalize to `.bak`, so the scanner and
/// the executor agree on where backups live.
pub fn normalize_backup_dir(dir: &Path) -> Option<PathBuf> {
    if dir.is_absolute()
        || dir
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_) | Component::RootDir))
    {
        return None;
    }
    let normalized: PathBuf = normalized_components(dir).collect();
    (!normalized.as_os_str().is_empty()).then_some(normalized)
}

fn normalized_components(path: &Path) -> impl Iterator<Item = Component<'_>> {
    path.components().filter(|c| !matches!(c, Component::CurDir))
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust
/// use conflux_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .scan_workers(8)
///     .execution_backup_dir(".stbackups")
///     .logging_level("debug")
///     .build();
/// assert_eq!(config.scan.workers, 8);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Start from an existing configuration, e.g. one loaded from disk.
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    // --- scan ---

    pub fn scan_exclude(mut self, pattern: impl Into<String>) -> Self {
        self.config.scan.exclude.push(pattern.into());
        self
    }

    pub fn scan_require_marker(mut self, require: bool) -> Self {
        self.config.scan.require_marker = require;
        self
    }

    pub fn scan_marker(mut self, marker: impl Into<String>) -> Self {
        self.config.scan.marker = marker.into();
        self
    }

    pub fn scan_workers(mut self, workers: u16) -> Self {
        self.config.scan.workers = workers;
        self
    }

    // --- execution ---

    pub fn execution_backup_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.execution.backup_dir = Some(dir.into());
        self
    }

    // --- prompt ---

    pub fn prompt_diff_tool(mut self, tool: impl Into<String>) -> Self {
        self.config.prompt.diff_tool = Some(tool.into());
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
