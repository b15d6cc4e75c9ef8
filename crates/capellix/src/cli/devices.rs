//! `devices` subcommand: list connected Commander Core controllers.

use super::{DeviceJson, DevicesOutput, Result, device, models, print_json};

pub(super) fn cmd_devices(json: bool) -> Result<()> {
    let devices = device::enumerate_devices();

    if json {
        let output = DevicesOutput {
            count: devices.len(),
            devices: devices
                .into_iter()
                .map(|d| DeviceJson {
                    model: models::model_name(d.product_id).map(str::to_string),
                    device: d,
                })
                .collect(),
        };
        return print_json(&output);
    }

    if devices.is_empty() {
        println!("No Commander Core devices found.");
        return Ok(());
    }

    println!(
        "Found {} Commander Core device{}:",
        devices.len(),
        if devices.len() == 1 { "" } else { "s" }
    );
    println!();

    for (i, dev) in devices.iter().enumerate() {
        let model = models::model_name(dev.product_id).unwrap_or("Unknown model");
        println!("  [{}] {model} (0x{:04X})", i + 1, dev.product_id);
        println!("      Path:   {}", dev.path);
        if let Some(ref serial) = dev.serial {
            println!("      Serial: {serial}");
        }
    }

    Ok(())
}
