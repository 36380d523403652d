//! Configuration loading and config file resolution
//!
//! Configuration is bootstrap-only: it is read once when a host starts a
//! notification manager and never reloaded.
//!
//! # Settings Sources Priority
//!
//! Config file location:
//! 1. Command-line argument (`--config`)
//! 2. Environment variable (`CALM_CONFIG`)
//! 3. `<user config dir>/calm/config.toml`
//! 4. Built-in defaults (no file)
//!
//! Individual environment overrides (`CALM_TOAST_EXPIRY_MS`,
//! `CALM_TOAST_MAX_ACTIVE`) are applied on top of whichever file was loaded.

use crate::{time, Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Delay before an untouched notification expires
pub const DEFAULT_EXPIRY_MS: u64 = 5000;

/// Lifecycle event buffer size
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "CALM_CONFIG";

/// Environment override for `notifications.expiry_ms`
pub const EXPIRY_ENV_VAR: &str = "CALM_TOAST_EXPIRY_MS";

/// Environment override for `notifications.max_active`
pub const MAX_ACTIVE_ENV_VAR: &str = "CALM_TOAST_MAX_ACTIVE";

/// Where the loaded configuration came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    CommandLine,
    Environment,
    UserConfigDir,
    Defaults,
}

/// Bootstrap configuration loaded from TOML file
///
/// Every section and field is optional; missing values use built-in defaults.
///
/// ```toml
/// [notifications]
/// expiry_ms = 5000
/// max_active = 5
/// event_capacity = 256
///
/// [logging]
/// level = "debug"
/// file = "/tmp/calm.log"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    /// Toast manager settings
    #[serde(default)]
    pub notifications: NotificationSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Toast manager settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationSettings {
    /// Manager-wide expiry delay in milliseconds
    #[serde(default = "default_expiry_ms")]
    pub expiry_ms: u64,

    /// Maximum simultaneously active notifications (oldest evicted first)
    ///
    /// `None` leaves the active set unbounded.
    #[serde(default)]
    pub max_active: Option<usize>,

    /// Lifecycle event channel capacity
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_expiry_ms() -> u64 {
    DEFAULT_EXPIRY_MS
}

fn default_event_capacity() -> usize {
    DEFAULT_EVENT_CAPACITY
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            expiry_ms: default_expiry_ms(),
            max_active: None,
            event_capacity: default_event_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl NotificationSettings {
    /// Expiry delay as Duration
    pub fn expiry(&self) -> Duration {
        time::millis_to_duration(self.expiry_ms)
    }

    /// Reject settings the manager cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.expiry_ms == 0 {
            return Err(Error::Config("notifications.expiry_ms must be greater than 0".to_string()));
        }
        if self.max_active == Some(0) {
            return Err(Error::Config("notifications.max_active must be at least 1".to_string()));
        }
        if self.event_capacity == 0 {
            return Err(Error::Config(
                "notifications.event_capacity must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply `CALM_TOAST_*` environment overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(value) = std::env::var(EXPIRY_ENV_VAR) {
            self.expiry_ms = value.trim().parse().map_err(|e| {
                Error::Config(format!("Invalid {}={:?}: {}", EXPIRY_ENV_VAR, value, e))
            })?;
            debug!("expiry_ms overridden by {}: {}", EXPIRY_ENV_VAR, self.expiry_ms);
        }

        if let Ok(value) = std::env::var(MAX_ACTIVE_ENV_VAR) {
            let trimmed = value.trim();
            self.max_active = if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
                None
            } else {
                Some(trimmed.parse().map_err(|e| {
                    Error::Config(format!("Invalid {}={:?}: {}", MAX_ACTIVE_ENV_VAR, value, e))
                })?)
            };
            debug!("max_active overridden by {}: {:?}", MAX_ACTIVE_ENV_VAR, self.max_active);
        }

        Ok(())
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Read and parse a configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Resolve, read, override and validate configuration
    ///
    /// An explicitly named file (CLI or `CALM_CONFIG`) must exist and parse.
    /// A missing file at the default location is not an error: built-in
    /// defaults are used instead.
    pub fn load(cli_arg: Option<&Path>) -> Result<(Self, ConfigSource)> {
        let (mut config, source) = match resolve_config_path(cli_arg) {
            Some((path, ConfigSource::UserConfigDir)) => {
                if path.exists() {
                    info!("Loading configuration from {:?}", path);
                    (Self::from_file(&path)?, ConfigSource::UserConfigDir)
                } else {
                    debug!("No config file at {:?}, using defaults", path);
                    (Self::default(), ConfigSource::Defaults)
                }
            }
            Some((path, source)) => {
                info!("Loading configuration from {:?} ({:?})", path, source);
                (Self::from_file(&path)?, source)
            }
            None => {
                warn!("Could not determine config directory, using defaults");
                (Self::default(), ConfigSource::Defaults)
            }
        };

        config.notifications.apply_env_overrides()?;
        config.notifications.validate()?;

        Ok((config, source))
    }
}

/// Pick the config file path following the priority order
///
/// Returns `None` only when no explicit path was given and the platform
/// has no user config directory.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<(PathBuf, ConfigSource)> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some((path.to_path_buf(), ConfigSource::CommandLine));
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some((PathBuf::from(path), ConfigSource::Environment));
        }
    }

    // Priority 3: user config directory
    default_config_path().map(|path| (path, ConfigSource::UserConfigDir))
}

/// `<user config dir>/calm/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("calm").join("config.toml"))
}
