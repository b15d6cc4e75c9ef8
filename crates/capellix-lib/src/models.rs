//! Model profiles: HID buffer geometry per Commander Core variant.
//!
//! Each controller revision uses a different report size. The profile is
//! resolved once from the USB product ID; unknown IDs get the conservative
//! 96-byte profile rather than being rejected.

use serde::Serialize;

use crate::protocol::{COMMANDER_CORE_PID, COMMANDER_CORE_XT_PID, COMMANDER_ST_PID};

/// Buffer geometry for one controller model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceProfile {
    /// Read buffer size (bytes per HID input report).
    pub buffer_size: usize,
    /// Write buffer size: `buffer_size` plus the report ID byte.
    pub write_buffer_size: usize,
    /// Largest payload chunk per color write (`buffer_size - 3`).
    pub max_chunk: usize,
}

impl DeviceProfile {
    const fn with_buffer(buffer_size: usize) -> Self {
        DeviceProfile {
            buffer_size,
            write_buffer_size: buffer_size + 1,
            max_chunk: buffer_size - 3,
        }
    }

    /// Resolve the profile for a USB product ID.
    pub fn for_product(pid: u16) -> Self {
        PROFILES
            .iter()
            .find(|(p, _, _)| *p == pid)
            .map(|&(_, _, profile)| profile)
            .unwrap_or(DEFAULT_PROFILE)
    }
}

/// Fallback for unrecognised product IDs (and the original Commander Core).
pub const DEFAULT_PROFILE: DeviceProfile = DeviceProfile::with_buffer(96);

/// `(product id, display name, profile)`.
static PROFILES: [(u16, &str, DeviceProfile); 3] = [
    (COMMANDER_CORE_PID, "Commander Core", DeviceProfile::with_buffer(96)),
    (COMMANDER_ST_PID, "Commander ST", DeviceProfile::with_buffer(64)),
    (
        COMMANDER_CORE_XT_PID,
        "Commander Core XT",
        DeviceProfile::with_buffer(384),
    ),
];

/// Display name for a product ID, if it is a known controller.
pub fn model_name(pid: u16) -> Option<&'static str> {
    PROFILES
        .iter()
        .find(|(p, _, _)| *p == pid)
        .map(|&(_, name, _)| name)
}
