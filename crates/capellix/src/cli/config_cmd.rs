//! `config` subcommand: show current configuration and file paths.

use std::path::Path;

use super::{
    CapellixError, Config, ConfigOutput, Result, kv, kv_indent, kv_width, led, load_config,
    print_json,
};

fn color_display(value: &str) -> String {
    if value.trim().is_empty() {
        return "(same as color)".to_string();
    }
    match led::parse_color(value) {
        Ok(c) => format!("{value} -> {}", led::format_color(c)),
        Err(_) => format!("{value} (invalid)"),
    }
}

pub(super) fn cmd_config(json: bool, custom_path: Option<&Path>) -> Result<()> {
    let config = load_config(custom_path);
    let config_path = custom_path.map(Path::to_path_buf).or_else(Config::path);
    let config_exists = config_path.as_ref().is_some_and(|p| p.exists());
    let errors: Vec<String> = match config.validate() {
        Ok(()) => Vec::new(),
        Err(errs) => errs.iter().map(ToString::to_string).collect(),
    };

    if json {
        let output = ConfigOutput {
            config_file: config_path.as_ref().map(|p| p.display().to_string()),
            config_file_exists: config_exists,
            settings: config,
            errors,
        };
        return print_json(&output);
    }

    // Human-readable output
    let w = kv_width(
        &["Config file:"],
        &[
            "device_serial:",
            "color:",
            "pump_color:",
            "fan_color:",
            "keepalive_interval_ms:",
            "keepalive_threshold_ms:",
        ],
    );

    match &config_path {
        Some(p) if config_exists => kv("Config file:", format_args!("{} (loaded)", p.display()), w),
        Some(p) => kv(
            "Config file:",
            format_args!("{} (not found, using defaults)", p.display()),
            w,
        ),
        None => kv("Config file:", "(no config directory)", w),
    }
    println!();

    println!("Settings:");
    let serial = if config.device_serial.is_empty() {
        "(first found)"
    } else {
        config.device_serial.as_str()
    };
    kv_indent("device_serial:", serial, w);
    kv_indent("color:", color_display(&config.color), w);
    kv_indent("pump_color:", color_display(&config.pump_color), w);
    kv_indent("fan_color:", color_display(&config.fan_color), w);
    kv_indent("keepalive_interval_ms:", config.keepalive_interval_ms, w);
    kv_indent("keepalive_threshold_ms:", config.keepalive_threshold_ms, w);

    if !errors.is_empty() {
        println!();
        println!("Problems:");
        for e in &errors {
            println!("  {e}");
        }
    }
    Ok(())
}

/// Write a default config file unless one already exists.
pub(super) fn cmd_config_init(custom_path: Option<&Path>) -> Result<()> {
    let path = custom_path
        .map(Path::to_path_buf)
        .or_else(Config::path)
        .ok_or_else(|| CapellixError::Config("no config directory on this platform".into()))?;
    if path.exists() {
        println!("Config file already exists: {}", path.display());
        return Ok(());
    }
    Config::default().save_to(&path)?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}
