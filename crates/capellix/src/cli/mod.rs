//! CLI subcommands: device listing, status, LED color control.

mod color;
mod config_cmd;
mod devices;
mod status;

use std::path::{Path, PathBuf};

use clap::Subcommand;
use serde::Serialize;

pub(super) use crate::RUNNING;
pub(super) use capellix_lib::CapellixError;
pub(super) use capellix_lib::config::{Config, ValidationError};
pub(super) use capellix_lib::device::{self, DiscoveredDevice, HidTransport, HidapiTransport};
pub(super) use capellix_lib::error::Result;
pub(super) use capellix_lib::led::{self, Rgb};
pub(super) use capellix_lib::models;
pub(super) use capellix_lib::session::{CommanderCore, InitStep, SessionOptions};
pub(super) use capellix_lib::topology;

const PADDING: usize = 2;

/// Compute alignment width for a command's key-value output.
/// Ensures at least PADDING spaces after the longest key in either level,
/// with top-level and indent values aligned to the same column.
pub(super) fn kv_width(top: &[&str], indent: &[&str]) -> usize {
    let top_max = top.iter().map(|k| k.len()).max().unwrap_or(0);
    let indent_max = indent.iter().map(|k| k.len()).max().unwrap_or(0);
    let top_need = if top.is_empty() { 0 } else { top_max + PADDING };
    // Indent keys lose 2 chars of inner width to the "  " prefix
    let indent_need = if indent.is_empty() {
        0
    } else {
        indent_max + PADDING + 2
    };
    top_need.max(indent_need)
}

pub(super) fn format_kv(key: &str, value: impl std::fmt::Display, w: usize) -> String {
    format!("{key:<width$}{value}", width = w)
}

pub(super) fn kv(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("{}", format_kv(key, value, w));
}

pub(super) fn kv_indent(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("  {key:<width$}{value}", width = w - 2);
}

/// Pretty-print any serializable output as JSON.
pub(super) fn print_json(output: &impl Serialize) -> Result<()> {
    let json_str = serde_json::to_string_pretty(output)
        .map_err(|e| CapellixError::Config(format!("JSON serialization failed: {e}")))?;
    println!("{json_str}");
    Ok(())
}

/// Load the config from `custom_path`, or the platform default.
pub(super) fn load_config(custom_path: Option<&Path>) -> Config {
    match custom_path {
        Some(path) => {
            let (config, warnings) = Config::load_from(path);
            for w in &warnings {
                log::warn!("{w}");
            }
            config
        }
        None => Config::load(),
    }
}

/// Open the configured controller without running any init step.
///
/// Refuses keepalive timings the loop cannot run with.
pub(super) fn open_session(config: &Config) -> Result<CommanderCore<HidapiTransport>> {
    check_keepalive(config)?;
    let (transport, info) = device::open_device_by_serial(&config.device_serial)?;
    log::info!("opened {} at {}", info.model(), info.path);
    let options = SessionOptions {
        keepalive: config.keepalive(),
        ..SessionOptions::default()
    };
    Ok(CommanderCore::new(transport, info, options))
}

fn check_keepalive(config: &Config) -> Result<()> {
    let problems: Vec<String> = match config.validate() {
        Ok(()) => return Ok(()),
        Err(errs) => errs
            .iter()
            .filter(|e| !matches!(e, ValidationError::InvalidColor { .. }))
            .map(ToString::to_string)
            .collect(),
    };
    if problems.is_empty() {
        Ok(())
    } else {
        Err(CapellixError::Config(problems.join("; ")))
    }
}

// ── JSON output structs ──

#[derive(Serialize)]
pub(super) struct StatusOutput {
    pub version: String,
    pub device: Option<DeviceStatusJson>,
    pub config: ConfigSummaryJson,
}

#[derive(Serialize)]
pub(super) struct DeviceStatusJson {
    pub model: String,
    pub product: String,
    pub firmware: String,
    pub serial: Option<String>,
    pub path: String,
    pub product_id: String,
    pub report_size: usize,
    pub total_leds: usize,
    pub default_layout: bool,
    pub channels: Vec<ChannelJson>,
}

#[derive(Serialize)]
pub(super) struct ChannelJson {
    pub port: u8,
    pub name: String,
    pub led_count: u16,
    pub kind: Option<String>,
}

#[derive(Serialize)]
pub(super) struct ConfigSummaryJson {
    pub color: String,
    pub pump_color: String,
    pub fan_color: String,
    pub keepalive_interval_ms: u64,
    pub keepalive_threshold_ms: u64,
}

#[derive(Serialize)]
pub(super) struct ConfigOutput {
    pub config_file: Option<String>,
    pub config_file_exists: bool,
    pub settings: Config,
    pub errors: Vec<String>,
}

#[derive(Serialize)]
pub(super) struct DevicesOutput {
    pub count: usize,
    pub devices: Vec<DeviceJson>,
}

#[derive(Serialize)]
pub(super) struct DeviceJson {
    pub model: Option<String>,
    #[serde(flatten)]
    pub device: DiscoveredDevice,
}

#[derive(Subcommand)]
pub enum Command {
    /// List connected Commander Core controllers
    Devices,

    /// Show controller firmware, LED channels and configuration
    Status,

    /// Set every LED to one color (held until Ctrl+C or --duration)
    Solid {
        /// Color as #RRGGBB, R,G,B or a name (default: `color` from config)
        color: Option<String>,
        /// Hold for this many seconds, then restore hardware lighting
        #[arg(long)]
        duration: Option<u64>,
    },

    /// Set the pump head and fans to separate colors
    Zones {
        /// Pump head color (default: `pump_color` from config)
        #[arg(long)]
        pump: Option<String>,
        /// Fan color (default: `fan_color` from config)
        #[arg(long)]
        fans: Option<String>,
        /// Hold for this many seconds, then restore hardware lighting
        #[arg(long)]
        duration: Option<u64>,
    },

    /// Turn every LED off (held until Ctrl+C or --duration)
    Off {
        /// Hold for this many seconds, then restore hardware lighting
        #[arg(long)]
        duration: Option<u64>,
    },

    /// Show current configuration and file paths
    Config {
        /// Write a default config file if none exists yet
        #[arg(long)]
        init: bool,
    },
}

/// Warn if `--json` was passed to a command that doesn't support it.
fn warn_json_unsupported(cmd_name: &str) {
    log::warn!("--json is not supported for `{cmd_name}` (ignored)");
}

pub fn run(cmd: Command, json: bool, config_path: Option<PathBuf>) -> Result<()> {
    let config_path = config_path.as_deref();
    match cmd {
        Command::Devices => devices::cmd_devices(json),
        Command::Status => status::cmd_status(json, config_path),
        Command::Solid { color, duration } => {
            if json {
                warn_json_unsupported("solid");
            }
            color::cmd_solid(color.as_deref(), duration, config_path)
        }
        Command::Zones {
            pump,
            fans,
            duration,
        } => {
            if json {
                warn_json_unsupported("zones");
            }
            color::cmd_zones(pump.as_deref(), fans.as_deref(), duration, config_path)
        }
        Command::Off { duration } => {
            if json {
                warn_json_unsupported("off");
            }
            color::cmd_off(duration, config_path)
        }
        Command::Config { init: true } => {
            if json {
                warn_json_unsupported("config --init");
            }
            config_cmd::cmd_config_init(config_path)
        }
        Command::Config { init: false } => config_cmd::cmd_config(json, config_path),
    }
}

#[cfg(test)]
mod format_tests {
    use super::*;

    #[test]
    fn kv_width_top_only() {
        let w = kv_width(&["Short:", "Longer key:"], &[]);
        // "Longer key:" = 11 + PADDING = 13
        assert_eq!(w, 13);
    }

    #[test]
    fn kv_width_indent_drives_width() {
        // Indent key needs +2 for the prefix
        let w = kv_width(&["A:"], &["Very long indent key:"]);
        // "Very long indent key:" = 21 + PADDING + 2 = 25
        assert_eq!(w, 25);
    }

    #[test]
    fn values_align_across_levels() {
        let w = kv_width(&["Top:"], &["Indent:"]);
        let top = format_kv("Top:", "V", w);
        // Simulate kv_indent output
        let indent = format!("  {:<width$}{}", "Indent:", "V", width = w - 2);
        assert_eq!(top.find('V'), indent.find('V'));
    }

    #[test]
    fn format_kv_exact_width() {
        // "ExactWidth:" is 11 chars, wider than 10: no padding
        assert_eq!(format_kv("ExactWidth:", "val", 10), "ExactWidth:val");
    }

    #[test]
    fn kv_width_empty_both() {
        assert_eq!(kv_width(&[], &[]), 0);
    }
}

#[cfg(test)]
mod json_output_tests {
    use super::*;

    fn summary() -> ConfigSummaryJson {
        ConfigSummaryJson {
            color: "#FFFFFF".into(),
            pump_color: String::new(),
            fan_color: String::new(),
            keepalive_interval_ms: 1000,
            keepalive_threshold_ms: 10_000,
        }
    }

    #[test]
    fn status_output_with_null_device() {
        let output = StatusOutput {
            version: "0.1.0".into(),
            device: None,
            config: summary(),
        };
        let json = serde_json::to_string_pretty(&output).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["version"], "0.1.0");
        assert!(parsed["device"].is_null());
        assert_eq!(parsed["config"]["keepalive_threshold_ms"], 10_000);
    }

    #[test]
    fn status_output_with_device() {
        let output = StatusOutput {
            version: "0.1.0".into(),
            device: Some(DeviceStatusJson {
                model: "Commander ST".into(),
                product: "iCUE COMMANDER Core".into(),
                firmware: "v2.10.219".into(),
                serial: Some("ABC123".into()),
                path: "/dev/hidraw3".into(),
                product_id: "0x0C32".into(),
                report_size: 64,
                total_leds: 57,
                default_layout: false,
                channels: vec![ChannelJson {
                    port: 0,
                    name: "Pump Head".into(),
                    led_count: 33,
                    kind: Some("CAPELLIX pump head".into()),
                }],
            }),
            config: summary(),
        };
        let parsed = serde_json::to_value(&output).unwrap();
        assert_eq!(parsed["device"]["model"], "Commander ST");
        assert_eq!(parsed["device"]["channels"][0]["led_count"], 33);
        assert_eq!(parsed["device"]["channels"][0]["kind"], "CAPELLIX pump head");
    }

    #[test]
    fn config_output_complete() {
        let output = ConfigOutput {
            config_file: Some("/home/user/.config/capellix/config.toml".into()),
            config_file_exists: true,
            settings: Config::default(),
            errors: vec![],
        };
        let parsed = serde_json::to_value(&output).unwrap();
        assert!(parsed["config_file"].is_string());
        assert_eq!(parsed["config_file_exists"], true);
        assert_eq!(parsed["settings"]["color"], "#FFFFFF");
        assert_eq!(parsed["settings"]["keepalive_interval_ms"], 1000);
        assert!(parsed["errors"].as_array().unwrap().is_empty());
    }

    #[test]
    fn devices_output_flattens_device() {
        let output = DevicesOutput {
            count: 1,
            devices: vec![DeviceJson {
                model: Some("Commander Core".into()),
                device: DiscoveredDevice {
                    path: "/dev/hidraw1".into(),
                    product_id: 0x0C1C,
                    serial: Some("SERIAL1".into()),
                    product_name: None,
                },
            }],
        };
        let parsed = serde_json::to_value(&output).unwrap();
        assert_eq!(parsed["count"], 1);
        let dev = &parsed["devices"][0];
        assert_eq!(dev["model"], "Commander Core");
        assert_eq!(dev["path"], "/dev/hidraw1");
        assert_eq!(dev["serial"], "SERIAL1");
        assert!(dev["product_name"].is_null());
    }
}

#[cfg(test)]
mod command_tests {
    use super::*;

    #[test]
    fn cmd_config_with_missing_file_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert!(config_cmd::cmd_config(false, Some(&path)).is_ok());
        assert!(config_cmd::cmd_config(true, Some(&path)).is_ok());
    }

    #[test]
    fn load_config_from_custom_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "color = \"red\"\n").unwrap();
        assert_eq!(load_config(Some(&path)).color, "red");
    }

    #[test]
    fn zero_keepalive_interval_is_rejected() {
        let config = Config {
            keepalive_interval_ms: 0,
            ..Config::default()
        };
        let err = check_keepalive(&config).unwrap_err();
        assert!(matches!(err, CapellixError::Config(_)));
    }

    #[test]
    fn invalid_colors_do_not_block_keepalive_check() {
        let config = Config {
            fan_color: "nope".into(),
            ..Config::default()
        };
        assert!(check_keepalive(&config).is_ok());
    }

    #[test]
    fn color_command_rejects_bad_color_before_opening_device() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let err = color::cmd_solid(Some("not-a-color"), Some(0), Some(&path)).unwrap_err();
        assert!(matches!(err, CapellixError::Color(_)));
    }
}
