//! LED topology: per-port channel table parsed from the LED config endpoint.
//!
//! The table is never empty: a short or garbled response, or one that
//! reports no connected ports, yields the stock CAPELLIX layout (33-LED pump
//! head plus three 8-LED fans).

use serde::Serialize;

use crate::protocol::{
    LED_BYTES_PER_CHANNEL, LED_START_INDEX, LED_STATUS_CONNECTED, MAX_LED_CHANNELS,
};

/// One LED-bearing port on the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Channel {
    /// Physical port index (0..6). Port 0 is the pump head.
    pub port: u8,
    /// Number of addressable LEDs on this port.
    pub led_count: u16,
    /// Display name.
    pub name: String,
}

impl Channel {
    fn new(port: u8, led_count: u16, name: impl Into<String>) -> Self {
        Channel {
            port,
            led_count,
            name: name.into(),
        }
    }

    /// Accessory suggested by the LED count, e.g. "QL RGB fan".
    pub fn kind(&self) -> Option<&'static str> {
        describe_led_count(self.led_count)
    }
}

/// Ordered set of connected channels, in port scan order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelTable {
    channels: Vec<Channel>,
    /// `true` when the table came from the hardcoded fallback.
    pub fallback: bool,
}

/// Total LED count of [`ChannelTable::fallback_table`].
pub const DEFAULT_TOTAL_LEDS: usize = 57;

impl ChannelTable {
    /// Stock CAPELLIX XT layout: 33-LED pump head and three 8-LED fans.
    pub fn fallback_table() -> Self {
        ChannelTable {
            channels: vec![
                Channel::new(0, 33, "Pump Head"),
                Channel::new(1, 8, "Fan 1"),
                Channel::new(2, 8, "Fan 2"),
                Channel::new(3, 8, "Fan 3"),
            ],
            fallback: true,
        }
    }

    /// Parse an LED configuration endpoint response.
    ///
    /// Slots of 4 bytes start at offset 6: `[status, _, count_lo, count_hi]`.
    /// Only ports with status `0x02` and a nonzero count are kept. A trailing
    /// partial slot ends the scan.
    pub fn parse(resp: &[u8]) -> Self {
        if resp.len() < LED_START_INDEX + LED_BYTES_PER_CHANNEL {
            log::warn!(
                "LED config response too short ({} bytes), using default layout",
                resp.len()
            );
            return Self::fallback_table();
        }

        let mut channels = Vec::new();
        for port in 0..MAX_LED_CHANNELS {
            let off = LED_START_INDEX + port * LED_BYTES_PER_CHANNEL;
            if off + 3 >= resp.len() {
                break;
            }
            let status = resp[off];
            let count = u16::from_le_bytes([resp[off + 2], resp[off + 3]]);
            if status != LED_STATUS_CONNECTED || count == 0 {
                continue;
            }
            let name = if port == 0 {
                "Pump Head".to_string()
            } else {
                format!("Fan/Port {port}")
            };
            channels.push(Channel::new(port as u8, count, name));
        }

        if channels.is_empty() {
            log::warn!("no connected LED channels reported, using default layout");
            return Self::fallback_table();
        }

        ChannelTable {
            channels,
            fallback: false,
        }
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Sum of LED counts over all channels.
    pub fn total_leds(&self) -> usize {
        self.channels.iter().map(|c| c.led_count as usize).sum()
    }
}

impl Default for ChannelTable {
    fn default() -> Self {
        Self::fallback_table()
    }
}

/// Map an LED count to the Corsair accessory it usually indicates.
pub fn describe_led_count(count: u16) -> Option<&'static str> {
    match count {
        4 => Some("ML PRO RGB fan"),
        8 => Some("AF/SP RGB Elite fan"),
        10 => Some("RGB LED Strip"),
        12 => Some("HD RGB fan"),
        16 => Some("LL RGB fan"),
        21 | 24 | 29 => Some("Pump head"),
        33 => Some("CAPELLIX pump head"),
        34 => Some("QL RGB fan"),
        _ => None,
    }
}
