//! Device communication: transport trait, hidapi backend, discovery.

use std::fmt;

use serde::Serialize;

use crate::models;
use crate::protocol::{
    CONTROL_INTERFACE, CORSAIR_VID, FIRMWARE_RESPONSE_MIN, SUPPORTED_PIDS,
};

// ── Error type ──

/// Device communication errors.
///
/// String payloads follow the convention **"context: details"** where *context*
/// identifies the operation (e.g. `"HID write"`, `"hid_open_path"`) and
/// *details* describes what went wrong.
#[derive(Debug)]
pub enum DeviceError {
    NotFound,
    OpenFailed(String),
    TransactFailed(String),
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::NotFound => write!(f, "Commander Core device not found"),
            DeviceError::OpenFailed(e) => write!(f, "Failed to open device: {e}"),
            DeviceError::TransactFailed(e) => write!(f, "Transaction failed: {e}"),
        }
    }
}

impl std::error::Error for DeviceError {}

pub type Result<T> = std::result::Result<T, DeviceError>;

// ── Device info ──

#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    /// Platform HID path (e.g. `/dev/hidraw3`).
    pub path: String,
    /// USB product ID.
    pub product_id: u16,
    /// USB serial number string, if the device reports one.
    pub serial: Option<String>,
    /// USB product string, e.g. "iCUE COMMANDER CORE".
    pub product_name: String,
}

impl DeviceInfo {
    /// Human-readable model, preferring the product table over the USB string.
    pub fn model(&self) -> &str {
        models::model_name(self.product_id).unwrap_or(self.product_name.as_str())
    }
}

/// Firmware version reported by `CMD_GET_FIRMWARE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u16,
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FirmwareVersion {
    /// Parse a firmware query response.
    ///
    /// Layout: `[_, _, _, major, minor, patch_lo, patch_hi, ...]`.
    /// Returns `None` for short or empty responses.
    pub fn from_response(resp: &[u8]) -> Option<Self> {
        if resp.len() < FIRMWARE_RESPONSE_MIN {
            return None;
        }
        Some(FirmwareVersion {
            major: resp[3],
            minor: resp[4],
            patch: u16::from_le_bytes([resp[5], resp[6]]),
        })
    }
}

// ── Transport ──

/// Blocking HID I/O used by the protocol layer.
///
/// Implementations only move bytes; framing, pacing and locking live in
/// [`crate::session`].
pub trait HidTransport: Send {
    /// Write one complete output report (report ID included).
    fn write(&self, data: &[u8]) -> Result<usize>;

    /// Read one input report, waiting at most `timeout_ms`.
    /// Returns `Ok(0)` on timeout.
    fn read_timeout(&self, buf: &mut [u8], timeout_ms: i32) -> Result<usize>;
}

/// hidapi-backed transport for a Commander Core control interface.
///
/// Holds both the `HidApi` context and the open `HidDevice`; the device is
/// closed on drop.
pub struct HidapiTransport {
    device: hidapi::HidDevice,
    _api: hidapi::HidApi,
}

impl HidTransport for HidapiTransport {
    fn write(&self, data: &[u8]) -> Result<usize> {
        self.device
            .write(data)
            .map_err(|e| DeviceError::TransactFailed(format!("HID write: {e}")))
    }

    fn read_timeout(&self, buf: &mut [u8], timeout_ms: i32) -> Result<usize> {
        self.device
            .read_timeout(buf, timeout_ms)
            .map_err(|e| DeviceError::TransactFailed(format!("HID read: {e}")))
    }
}

// ── Device enumeration ──

/// A discovered controller interface (not yet opened).
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveredDevice {
    /// Platform HID path.
    pub path: String,
    /// USB product ID.
    pub product_id: u16,
    /// USB serial number, if available.
    pub serial: Option<String>,
    /// USB product string, if available.
    pub product_name: Option<String>,
}

fn discover(api: &hidapi::HidApi) -> Vec<DiscoveredDevice> {
    api.device_list()
        .filter(|d| d.vendor_id() == CORSAIR_VID)
        .filter(|d| SUPPORTED_PIDS.contains(&d.product_id()))
        .filter(|d| d.interface_number() == CONTROL_INTERFACE)
        .map(|d| DiscoveredDevice {
            path: d.path().to_string_lossy().into_owned(),
            product_id: d.product_id(),
            serial: d.serial_number().map(str::to_string),
            product_name: d.product_string().map(str::to_string),
        })
        .collect()
}

/// Enumerate all supported controllers.
///
/// Returns an empty list when the HID subsystem is unavailable.
pub fn enumerate_devices() -> Vec<DiscoveredDevice> {
    match hidapi::HidApi::new() {
        Ok(api) => discover(&api),
        Err(e) => {
            log::warn!("HID init failed: {e}");
            Vec::new()
        }
    }
}

/// Open a discovered controller in blocking mode.
pub fn open_discovered(found: &DiscoveredDevice) -> Result<(HidapiTransport, DeviceInfo)> {
    let api = hidapi::HidApi::new().map_err(|e| DeviceError::OpenFailed(format!("HID init: {e}")))?;
    let c_path = std::ffi::CString::new(found.path.as_str())
        .map_err(|e| DeviceError::OpenFailed(format!("device path: {e}")))?;
    let device = api
        .open_path(&c_path)
        .map_err(|e| DeviceError::OpenFailed(format!("hid_open_path: {e}")))?;
    device
        .set_blocking_mode(true)
        .map_err(|e| DeviceError::OpenFailed(format!("set_blocking_mode: {e}")))?;

    let serial = device
        .get_serial_number_string()
        .ok()
        .flatten()
        .or_else(|| found.serial.clone());
    let product_name = device
        .get_product_string()
        .ok()
        .flatten()
        .or_else(|| found.product_name.clone())
        .unwrap_or_default();

    let info = DeviceInfo {
        path: found.path.clone(),
        product_id: found.product_id,
        serial,
        product_name,
    };
    Ok((HidapiTransport { device, _api: api }, info))
}

/// Open the first supported controller.
pub fn open_device() -> Result<(HidapiTransport, DeviceInfo)> {
    let devices = enumerate_devices();
    let first = devices.first().ok_or(DeviceError::NotFound)?;
    open_discovered(first)
}

/// Open a controller matching the given serial number.
///
/// If `serial` is empty, delegates to [`open_device`] (auto-select).
pub fn open_device_by_serial(serial: &str) -> Result<(HidapiTransport, DeviceInfo)> {
    let serial = serial.trim();
    if serial.is_empty() {
        return open_device();
    }
    let devices = enumerate_devices();
    if devices.is_empty() {
        return Err(DeviceError::NotFound);
    }
    let matched = devices.iter().find(|d| {
        d.serial
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case(serial))
    });
    match matched {
        Some(found) => open_discovered(found),
        None => {
            let available: Vec<&str> = devices
                .iter()
                .map(|d| d.serial.as_deref().unwrap_or("(no serial)"))
                .collect();
            Err(DeviceError::OpenFailed(format!(
                "no device with serial '{serial}' found (available: {})",
                available.join(", ")
            )))
        }
    }
}

// ── Mock transport for testing ──

/// In-memory mock transport for unit and integration tests.
///
/// Always compiled, hidden from public docs.
#[doc(hidden)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex, MutexGuard};

    use crate::protocol::HEADER_SIZE;

    /// Recorded traffic and scripted replies.
    #[derive(Default)]
    pub struct MockState {
        /// Every frame passed to `write`, in order.
        pub writes: Vec<Vec<u8>>,
        /// Scripted replies: command prefix → queued responses.
        replies: Vec<(Vec<u8>, VecDeque<Vec<u8>>)>,
        /// If true, `write` returns an error.
        pub fail_writes: bool,
    }

    impl MockState {
        /// Command bytes (after the 2-byte header) of every recorded frame.
        pub fn commands(&self) -> Vec<&[u8]> {
            self.writes.iter().map(|w| &w[HEADER_SIZE..]).collect()
        }

        /// Frames whose body starts with `prefix`.
        pub fn frames_starting_with(&self, prefix: &[u8]) -> Vec<&Vec<u8>> {
            self.writes
                .iter()
                .filter(|w| w[HEADER_SIZE..].starts_with(prefix))
                .collect()
        }
    }

    /// Cloneable handle: the session owns one clone, the test keeps another.
    #[derive(Clone, Default)]
    pub struct MockTransport {
        state: Arc<Mutex<MockState>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Lock and inspect the recorded state.
        pub fn state(&self) -> MutexGuard<'_, MockState> {
            self.state.lock().unwrap_or_else(|e| e.into_inner())
        }

        /// Queue a reply for the next frame whose body starts with `prefix`.
        ///
        /// `prefix` is matched against the bytes after the report ID and
        /// protocol header, so it can include the payload (e.g. the mode).
        pub fn add_reply(&self, prefix: &[u8], response: Vec<u8>) {
            let mut state = self.state();
            match state.replies.iter().position(|(p, _)| p.as_slice() == prefix) {
                Some(i) => state.replies[i].1.push_back(response),
                None => state
                    .replies
                    .push((prefix.to_vec(), VecDeque::from([response]))),
            }
        }

        /// Forget all recorded frames (scripted replies are kept).
        pub fn clear_writes(&self) {
            self.state().writes.clear();
        }
    }

    impl HidTransport for MockTransport {
        fn write(&self, data: &[u8]) -> Result<usize> {
            let mut state = self.state();
            if state.fail_writes {
                return Err(DeviceError::TransactFailed(
                    "mock: write failure injected".into(),
                ));
            }
            state.writes.push(data.to_vec());
            Ok(data.len())
        }

        fn read_timeout(&self, buf: &mut [u8], _timeout_ms: i32) -> Result<usize> {
            let mut state = self.state();
            let Some(last) = state.writes.last().cloned() else {
                return Ok(0);
            };
            let body = &last[HEADER_SIZE..];
            // Longest matching prefix wins.
            let reply = state
                .replies
                .iter_mut()
                .filter(|(p, q)| body.starts_with(p.as_slice()) && !q.is_empty())
                .max_by_key(|(p, _)| p.len())
                .and_then(|(_, q)| q.pop_front());
            match reply {
                Some(resp) => {
                    let n = resp.len().min(buf.len());
                    buf[..n].copy_from_slice(&resp[..n]);
                    Ok(n)
                }
                None => Ok(0),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockTransport;
    use super::*;

    // ── FirmwareVersion ──

    #[test]
    fn firmware_from_valid_response() {
        let resp = [0x00, 0x02, 0x13, 2, 10, 0x2C, 0x01, 0xFF];
        let fw = FirmwareVersion::from_response(&resp).unwrap();
        assert_eq!(fw.major, 2);
        assert_eq!(fw.minor, 10);
        assert_eq!(fw.patch, 300);
        assert_eq!(fw.to_string(), "v2.10.300");
    }

    #[test]
    fn firmware_from_exact_minimum() {
        let fw = FirmwareVersion::from_response(&[0, 0, 0, 1, 2, 3, 0]).unwrap();
        assert_eq!(fw.to_string(), "v1.2.3");
    }

    #[test]
    fn firmware_from_short_response() {
        assert!(FirmwareVersion::from_response(&[0, 0, 0, 1, 2, 3]).is_none());
        assert!(FirmwareVersion::from_response(&[]).is_none());
    }

    // ── DeviceInfo ──

    #[test]
    fn model_prefers_product_table() {
        let info = DeviceInfo {
            path: "/dev/hidraw0".into(),
            product_id: crate::protocol::COMMANDER_ST_PID,
            serial: None,
            product_name: "iCUE COMMANDER Core".into(),
        };
        assert_eq!(info.model(), "Commander ST");
    }

    #[test]
    fn model_falls_back_to_product_string() {
        let info = DeviceInfo {
            path: String::new(),
            product_id: 0x1234,
            serial: None,
            product_name: "Something Else".into(),
        };
        assert_eq!(info.model(), "Something Else");
    }

    #[test]
    fn device_info_serializes() {
        let info = DeviceInfo {
            path: "/dev/hidraw3".into(),
            product_id: 0x0C1C,
            serial: Some("ABC123".into()),
            product_name: "iCUE COMMANDER CORE".into(),
        };
        let json = serde_json::to_string(&info).expect("serialize DeviceInfo");
        assert!(json.contains("\"path\""));
        assert!(json.contains("\"serial\""));
        assert!(json.contains("ABC123"));
    }

    // ── DeviceError ──

    #[test]
    fn error_display() {
        assert_eq!(
            DeviceError::NotFound.to_string(),
            "Commander Core device not found"
        );
        assert_eq!(
            DeviceError::OpenFailed("hid_open_path: denied".into()).to_string(),
            "Failed to open device: hid_open_path: denied"
        );
    }

    // ── MockTransport ──

    #[test]
    fn mock_records_writes() {
        let mock = MockTransport::new();
        mock.write(&[0x00, 0x08, 0x02, 0x13]).unwrap();
        assert_eq!(mock.state().writes.len(), 1);
        assert_eq!(mock.state().commands()[0], &[0x02, 0x13]);
    }

    #[test]
    fn mock_reply_matches_longest_prefix() {
        let mock = MockTransport::new();
        mock.add_reply(&[0x08, 0x01], vec![1]);
        mock.add_reply(&[0x08, 0x01, 0x20], vec![2]);
        mock.write(&[0x00, 0x08, 0x08, 0x01, 0x20]).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(mock.read_timeout(&mut buf, 0).unwrap(), 1);
        assert_eq!(buf[0], 2);
    }

    #[test]
    fn mock_without_reply_times_out() {
        let mock = MockTransport::new();
        mock.write(&[0x00, 0x08, 0x01]).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(mock.read_timeout(&mut buf, 0).unwrap(), 0);
    }

    #[test]
    fn mock_write_failure() {
        let mock = MockTransport::new();
        mock.state().fail_writes = true;
        assert!(mock.write(&[0x00, 0x08]).is_err());
    }

    #[test]
    fn enumerate_devices_does_not_panic() {
        // On a test host: returns a (possibly empty) list.
        let _ = enumerate_devices();
    }
}
