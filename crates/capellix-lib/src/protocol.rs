//! Protocol constants for Corsair Commander Core lighting controllers.
//!
//! Values decoded from USB captures of iCUE and cross-checked against the
//! OpenLinkHub `cc` driver.
//!
//! ## Frame layout
//!
//! Every HID write is exactly `write_buffer_size` bytes:
//!
//! ```text
//! [0x00][0x08][command bytes...][payload bytes...][zero padding]
//! ```
//!
//! Byte 0 is the HID report ID, byte 1 the fixed protocol header. The
//! buffer sizes depend on the controller model, see [`crate::models`].

// ── USB identifiers ──

/// Corsair vendor ID.
pub const CORSAIR_VID: u16 = 0x1B1C;

/// Commander Core (original, bundled with CAPELLIX AIOs): 96-byte buffers.
pub const COMMANDER_CORE_PID: u16 = 0x0C1C;

/// Commander ST / Commander Core 2: 64-byte buffers.
pub const COMMANDER_ST_PID: u16 = 0x0C32;

/// Commander Core XT: 384-byte buffers.
pub const COMMANDER_CORE_XT_PID: u16 = 0x0C2A;

/// Product IDs probed during device discovery.
pub const SUPPORTED_PIDS: &[u16] = &[COMMANDER_CORE_PID, COMMANDER_ST_PID];

/// HID interface carrying the bidirectional control channel.
pub const CONTROL_INTERFACE: i32 = 0;

// ── Framing ──

/// HID report ID at byte 0 of every write.
pub const REPORT_ID: u8 = 0x00;

/// Fixed protocol header at byte 1 of every write.
pub const PROTOCOL_HEADER: u8 = 0x08;

/// Bytes occupied by report ID + protocol header.
pub const HEADER_SIZE: usize = 2;

// ── Command codes ──

/// Open a data endpoint for reading. Payload: `[mode]`.
pub const CMD_OPEN_ENDPOINT: &[u8] = &[0x0D, 0x01];

/// Open the color endpoint for writing. Payload: `[MODE_SET_COLOR]`.
pub const CMD_OPEN_COLOR_ENDPOINT: &[u8] = &[0x0D, 0x00];

/// Close a data endpoint. Payload: `[mode]`.
pub const CMD_CLOSE_ENDPOINT: &[u8] = &[0x05, 0x01, 0x01];

/// Read from the currently open endpoint. Payload: `[mode]`.
pub const CMD_READ: &[u8] = &[0x08, 0x01];

/// Query firmware version. Also used as a liveness ping.
pub const CMD_GET_FIRMWARE: &[u8] = &[0x02, 0x13];

/// Hand lighting control to the host.
pub const CMD_SOFTWARE_MODE: &[u8] = &[0x01, 0x03, 0x00, 0x02];

/// Return lighting control to the onboard firmware.
pub const CMD_HARDWARE_MODE: &[u8] = &[0x01, 0x03, 0x00, 0x01];

/// First chunk of a color write.
pub const CMD_WRITE_COLOR: &[u8] = &[0x06, 0x00];

/// Every chunk after the first one of a color write.
pub const CMD_WRITE_COLOR_NEXT: &[u8] = &[0x07, 0x00];

/// Prefix of the per-port enable command: `[0x14, port, 0x01]`.
pub const CMD_INIT_PORT: u8 = 0x14;

/// Trailing byte of the per-port enable command.
pub const INIT_PORT_ENABLE: u8 = 0x01;

/// Build the enable command for one LED port.
pub fn init_port_command(port: u8) -> [u8; 3] {
    [CMD_INIT_PORT, port, INIT_PORT_ENABLE]
}

// ── Endpoint data modes ──

/// LED configuration (per-port status and LED count).
pub const MODE_GET_LEDS: u8 = 0x20;

/// Color output endpoint.
pub const MODE_SET_COLOR: u8 = 0x22;

/// Data type tag at bytes 4..6 of a color write buffer.
pub const DATA_TYPE_SET_COLOR: [u8; 2] = [0x12, 0x00];

/// Size of the color write header: LE length (2) + padding (2) + type tag (2).
pub const COLOR_HEADER_SIZE: usize = 6;

// ── LED configuration response ──

/// Offset of the first channel slot in the LED configuration response.
pub const LED_START_INDEX: usize = 6;

/// Bytes per channel slot: `[status, _, count_lo, count_hi]`.
pub const LED_BYTES_PER_CHANNEL: usize = 4;

/// Number of LED ports on the controller.
pub const MAX_LED_CHANNELS: usize = 7;

/// Status byte value for a port with a device attached.
pub const LED_STATUS_CONNECTED: u8 = 0x02;

// ── Firmware response ──

/// Minimum firmware response length: major at 3, minor at 4, LE patch at 5..7.
pub const FIRMWARE_RESPONSE_MIN: usize = 7;

// ── Timing ──

/// Delay between a write and its read, for device-side processing.
pub const SETTLE_DELAY_MS: u64 = 5;

/// Read timeout per transfer.
pub const READ_TIMEOUT_MS: i32 = 2000;

/// Delay after pulsing all ports so the device applies port configuration.
pub const PORT_SETTLE_DELAY_MS: u64 = 500;

/// Keepalive poll interval.
pub const KEEPALIVE_INTERVAL_MS: u64 = 1000;

/// Silence after which the device reverts to hardware lighting unless poked.
pub const KEEPALIVE_THRESHOLD_MS: u64 = 10_000;

// ── Color buffer layout ──

/// LEDs reserved per auxiliary port in the device color buffer.
///
/// Auxiliary zones are padded with black up to this count; the primary
/// (pump head) zone is never padded. The slot size comes from the vendor
/// software's buffer layout; it is not reported by the device.
pub const FAN_SLOT_LEDS: usize = 34;
