//! Application configuration: TOML-based, platform-aware paths.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::keepalive::KeepaliveConfig;
use crate::led::{self, Rgb};
use crate::protocol::{KEEPALIVE_INTERVAL_MS, KEEPALIVE_THRESHOLD_MS};

/// Header comment prepended to saved config files.
const CONFIG_HEADER: &str =
    "# capellix configuration. Changes made outside the CLI may be overwritten.\n\n";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Preferred device serial number. Empty = auto-select first device.
    #[serde(default)]
    pub device_serial: String,

    /// Default solid color (hex, `R,G,B` or name). Default: "#FFFFFF".
    #[serde(default = "default_color")]
    pub color: String,

    /// Pump head color for `zones`. Empty = use `color`.
    #[serde(default)]
    pub pump_color: String,

    /// Fan color for `zones`. Empty = use `color`.
    #[serde(default)]
    pub fan_color: String,

    /// How often the keepalive loop wakes, in milliseconds.
    #[serde(default = "default_keepalive_interval_ms")]
    pub keepalive_interval_ms: u64,

    /// Silence before the last frame is resent, in milliseconds.
    #[serde(default = "default_keepalive_threshold_ms")]
    pub keepalive_threshold_ms: u64,
}

fn default_color() -> String {
    "#FFFFFF".into()
}
fn default_keepalive_interval_ms() -> u64 {
    KEEPALIVE_INTERVAL_MS
}
fn default_keepalive_threshold_ms() -> u64 {
    KEEPALIVE_THRESHOLD_MS
}

impl Default for Config {
    fn default() -> Self {
        Config {
            device_serial: String::new(),
            color: default_color(),
            pump_color: String::new(),
            fan_color: String::new(),
            keepalive_interval_ms: default_keepalive_interval_ms(),
            keepalive_threshold_ms: default_keepalive_threshold_ms(),
        }
    }
}

/// Validation errors that [`Config::validate`] can return.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A color field could not be parsed.
    InvalidColor { field: &'static str, reason: String },
    /// `keepalive_interval_ms` is zero.
    ZeroKeepaliveInterval,
    /// `keepalive_threshold_ms` is shorter than the interval.
    KeepaliveThresholdTooShort { interval_ms: u64, threshold_ms: u64 },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidColor { field, reason } => {
                write!(f, "Invalid {field}: {reason}")
            }
            ValidationError::ZeroKeepaliveInterval => {
                write!(f, "keepalive_interval_ms must be greater than 0")
            }
            ValidationError::KeepaliveThresholdTooShort {
                interval_ms,
                threshold_ms,
            } => write!(
                f,
                "keepalive_threshold_ms ({threshold_ms}) must not be shorter than keepalive_interval_ms ({interval_ms})"
            ),
        }
    }
}

impl Config {
    /// Platform-specific config directory.
    pub fn dir() -> Option<PathBuf> {
        #[cfg(windows)]
        {
            dirs::config_dir().map(|p| p.join("Capellix"))
        }
        #[cfg(not(windows))]
        {
            dirs::config_dir().map(|p| p.join("capellix"))
        }
    }

    /// Full path to config file.
    pub fn path() -> Option<PathBuf> {
        Self::dir().map(|d| d.join("config.toml"))
    }

    /// Load config from disk, or return defaults if not found.
    pub fn load() -> Self {
        let (config, warnings) = Self::load_with_warnings();
        for w in &warnings {
            log::warn!("{w}");
        }
        config
    }

    /// Save config to an arbitrary path atomically (write to temp file, then rename).
    ///
    /// A header comment is prepended to warn that manual edits may be overwritten.
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let serialized = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        let contents = format!("{CONFIG_HEADER}{serialized}");
        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, &contents)?;
        match std::fs::rename(&tmp, path) {
            Ok(()) => Ok(()),
            Err(_) => {
                // Rename can fail across filesystems; fall back to direct write + cleanup
                let result = std::fs::write(path, &contents);
                let _ = std::fs::remove_file(&tmp);
                result
            }
        }
    }

    /// Load config from an arbitrary path, returning the config and any parse warnings.
    ///
    /// Returns `(defaults, [])` if the file doesn't exist.
    /// Returns `(defaults, [warning])` if the file exists but can't be parsed.
    pub fn load_from(path: &Path) -> (Self, Vec<String>) {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => (config, vec![]),
                Err(e) => {
                    let warning = format!(
                        "config parse error ({}), using defaults: {e}",
                        path.display()
                    );
                    (Self::default(), vec![warning])
                }
            },
            Err(_) => (Self::default(), vec![]),
        }
    }

    /// Load config from the default path, returning the config and any parse warnings.
    pub fn load_with_warnings() -> (Self, Vec<String>) {
        let Some(path) = Self::path() else {
            return (Self::default(), vec![]);
        };
        Self::load_from(&path)
    }

    /// Keepalive timing from the millisecond fields.
    pub fn keepalive(&self) -> KeepaliveConfig {
        KeepaliveConfig {
            interval: Duration::from_millis(self.keepalive_interval_ms),
            threshold: Duration::from_millis(self.keepalive_threshold_ms),
        }
    }

    /// The default solid color.
    pub fn solid_color(&self) -> crate::error::Result<Rgb> {
        led::parse_color(&self.color)
    }

    /// Pump head color, falling back to `color`.
    pub fn pump(&self) -> crate::error::Result<Rgb> {
        led::parse_color(non_empty_or(&self.pump_color, &self.color))
    }

    /// Fan color, falling back to `color`.
    pub fn fans(&self) -> crate::error::Result<Rgb> {
        led::parse_color(non_empty_or(&self.fan_color, &self.color))
    }

    /// Validate the entire config, collecting all errors.
    ///
    /// Returns `Ok(())` if valid, or `Err(Vec<ValidationError>)` with all problems found.
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        let colors = [
            ("color", self.color.as_str()),
            ("pump_color", self.pump_color.as_str()),
            ("fan_color", self.fan_color.as_str()),
        ];
        for (field, value) in colors {
            // Zone colors may be left empty; `color` may not.
            if field != "color" && value.trim().is_empty() {
                continue;
            }
            if let Err(e) = led::parse_color(value) {
                errors.push(ValidationError::InvalidColor {
                    field,
                    reason: e.to_string(),
                });
            }
        }

        if self.keepalive_interval_ms == 0 {
            errors.push(ValidationError::ZeroKeepaliveInterval);
        } else if self.keepalive_threshold_ms < self.keepalive_interval_ms {
            errors.push(ValidationError::KeepaliveThresholdTooShort {
                interval_ms: self.keepalive_interval_ms,
                threshold_ms: self.keepalive_threshold_ms,
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}
