//! `status` subcommand: show controller identity, LED channels and config.

use std::path::Path;

use super::{
    ChannelJson, CommanderCore, Config, ConfigSummaryJson, DeviceStatusJson, HidTransport,
    InitStep, Result, StatusOutput, kv, kv_indent, kv_width, led, load_config, open_session,
    print_json,
};

/// Read firmware and topology. Leaves the lighting mode alone.
fn probe<T: HidTransport + 'static>(session: &mut CommanderCore<T>) {
    session.run_step(InitStep::ReadFirmware);
    session.run_step(InitStep::QueryTopology);
}

/// Collect device status from a probed session.
fn collect_device_status<T: HidTransport + 'static>(
    session: &CommanderCore<T>,
) -> DeviceStatusJson {
    let info = session.info();
    let channels = session
        .channels()
        .channels()
        .iter()
        .map(|ch| ChannelJson {
            port: ch.port,
            name: ch.name.clone(),
            led_count: ch.led_count,
            kind: ch.kind().map(str::to_string),
        })
        .collect();
    DeviceStatusJson {
        model: session.model().to_string(),
        product: session.device_name().to_string(),
        firmware: session.firmware_version(),
        serial: info.serial.clone(),
        path: info.path.clone(),
        product_id: format!("0x{:04X}", info.product_id),
        report_size: session.profile().buffer_size,
        total_leds: session.total_leds(),
        default_layout: session.channels().fallback,
        channels,
    }
}

fn color_label(value: &str) -> String {
    if value.trim().is_empty() {
        return "(same as color)".to_string();
    }
    match led::parse_color(value) {
        Ok(c) => led::format_color(c),
        Err(_) => format!("{value} (invalid)"),
    }
}

/// Print or serialize the status output.
fn print_status(device_status: Option<DeviceStatusJson>, config: &Config, json: bool) -> Result<()> {
    let config_summary = ConfigSummaryJson {
        color: config.color.clone(),
        pump_color: config.pump_color.clone(),
        fan_color: config.fan_color.clone(),
        keepalive_interval_ms: config.keepalive_interval_ms,
        keepalive_threshold_ms: config.keepalive_threshold_ms,
    };

    if json {
        let output = StatusOutput {
            version: env!("CARGO_PKG_VERSION").to_string(),
            device: device_status,
            config: config_summary,
        };
        return print_json(&output);
    }

    // Human-readable output
    let w = kv_width(
        &["Version:", "Device:"],
        &[
            "Model:",
            "Product:",
            "Firmware:",
            "Serial:",
            "Path:",
            "Report size:",
            "LEDs:",
            "Color:",
            "Pump color:",
            "Fan color:",
            "Keepalive:",
        ],
    );

    kv("Version:", env!("CARGO_PKG_VERSION"), w);
    println!();

    match &device_status {
        Some(dev) => {
            kv("Device:", "CONNECTED", w);
            kv_indent("Model:", format_args!("{} ({})", dev.model, dev.product_id), w);
            kv_indent("Product:", &dev.product, w);
            kv_indent("Firmware:", &dev.firmware, w);
            if let Some(ref serial) = dev.serial {
                kv_indent("Serial:", serial, w);
            }
            kv_indent("Path:", &dev.path, w);
            kv_indent("Report size:", format_args!("{} bytes", dev.report_size), w);
            let layout = if dev.default_layout {
                " (default layout)"
            } else {
                ""
            };
            kv_indent("LEDs:", format_args!("{}{layout}", dev.total_leds), w);
            for ch in &dev.channels {
                let kind = ch.kind.as_deref().map(|k| format!(", {k}")).unwrap_or_default();
                println!(
                    "    [{}] {:<12}{:>4} LEDs{kind}",
                    ch.port, ch.name, ch.led_count
                );
            }
        }
        None => {
            kv("Device:", "NOT CONNECTED", w);
        }
    }

    println!();
    println!("Config:");
    kv_indent("Color:", color_label(&config.color), w);
    kv_indent("Pump color:", color_label(&config.pump_color), w);
    kv_indent("Fan color:", color_label(&config.fan_color), w);
    kv_indent(
        "Keepalive:",
        format_args!(
            "every {} ms, resend after {} ms",
            config.keepalive_interval_ms, config.keepalive_threshold_ms
        ),
        w,
    );

    Ok(())
}

pub(super) fn cmd_status(json: bool, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path);
    let device_status = match open_session(&config) {
        Ok(mut session) => {
            probe(&mut session);
            Some(collect_device_status(&session))
        }
        Err(e) => {
            log::info!("{e}");
            None
        }
    };
    print_status(device_status, &config, json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use capellix_lib::device::DeviceInfo;
    use capellix_lib::device::mock::MockTransport;
    use capellix_lib::protocol::{CMD_GET_FIRMWARE, COMMANDER_ST_PID, MODE_GET_LEDS};
    use capellix_lib::session::{ProtocolTiming, SessionOptions};

    fn mock_session() -> (CommanderCore<MockTransport>, MockTransport) {
        let mock = MockTransport::new();
        let info = DeviceInfo {
            path: "mock://0".into(),
            product_id: COMMANDER_ST_PID,
            serial: Some("ABC123".into()),
            product_name: "iCUE COMMANDER Core".into(),
        };
        let options = SessionOptions {
            timing: ProtocolTiming::immediate(),
            ..SessionOptions::default()
        };
        (CommanderCore::new(mock.clone(), info, options), mock)
    }

    #[test]
    fn collect_device_status_from_mock() {
        let (mut session, mock) = mock_session();
        mock.add_reply(CMD_GET_FIRMWARE, vec![0, 2, 0x13, 2, 10, 219, 0]);
        let mut leds = vec![0u8; 6];
        leds.extend_from_slice(&[0x02, 0x00, 33, 0x00, 0x02, 0x00, 34, 0x00]);
        mock.add_reply(&[0x08, 0x01, MODE_GET_LEDS], leds);

        probe(&mut session);
        let status = collect_device_status(&session);
        assert_eq!(status.model, "Commander ST");
        assert_eq!(status.product, "iCUE COMMANDER Core");
        assert_eq!(status.firmware, "v2.10.219");
        assert_eq!(status.product_id, "0x0C32");
        assert_eq!(status.report_size, 64);
        assert_eq!(status.total_leds, 67);
        assert!(!status.default_layout);
        assert_eq!(status.channels[1].kind.as_deref(), Some("QL RGB fan"));
    }

    #[test]
    fn probe_does_not_switch_lighting_mode() {
        let (mut session, mock) = mock_session();
        probe(&mut session);
        let _ = collect_device_status(&session);
        // Closing the session must not hand lighting back to the firmware
        // either; another process may be holding software control.
        drop(session);
        let state = mock.state();
        assert!(
            state
                .commands()
                .iter()
                .all(|c| !c.starts_with(&[0x01, 0x03]))
        );
    }

    #[test]
    fn silent_device_reports_unknown_firmware() {
        let (mut session, _mock) = mock_session();
        probe(&mut session);
        let status = collect_device_status(&session);
        assert_eq!(status.firmware, "unknown");
        assert!(status.default_layout);
        assert_eq!(status.total_leds, 57);
    }

    #[test]
    fn print_status_without_device_succeeds() {
        let config = Config::default();
        assert!(print_status(None, &config, false).is_ok());
        assert!(print_status(None, &config, true).is_ok());
    }

    #[test]
    fn print_status_with_mock_device_succeeds() {
        let (mut session, _mock) = mock_session();
        probe(&mut session);
        let config = Config::default();
        let result = print_status(Some(collect_device_status(&session)), &config, false);
        assert!(result.is_ok());
    }

    #[test]
    fn color_labels() {
        assert_eq!(color_label(""), "(same as color)");
        assert_eq!(color_label("red"), "#FF0000");
        assert_eq!(color_label("nope"), "nope (invalid)");
    }
}
