//! Per-LED color buffers and the device zone layout.
//!
//! Callers work with one [`Rgb`] per physical LED in channel order. The
//! device color buffer reserves a fixed [`FAN_SLOT_LEDS`] slot per auxiliary
//! port, so every zone after the first is padded with black before the
//! buffer goes on the wire. The primary zone (pump head) is written as-is.

use crate::protocol::FAN_SLOT_LEDS;
use crate::topology::ChannelTable;

use super::color::Rgb;

/// One color for every LED in the table.
pub fn solid(table: &ChannelTable, color: Rgb) -> Vec<Rgb> {
    vec![color; table.total_leds()]
}

/// Pump head LEDs in `pump`, every other channel in `fans`.
pub fn zone_colors(table: &ChannelTable, pump: Rgb, fans: Rgb) -> Vec<Rgb> {
    table
        .channels()
        .iter()
        .flat_map(|ch| {
            let color = if ch.port == 0 { pump } else { fans };
            std::iter::repeat_n(color, ch.led_count as usize)
        })
        .collect()
}

/// Lay out per-LED colors as the device color buffer (flat RGB bytes).
///
/// `colors` holds one entry per LED in channel order; missing entries are
/// black and surplus entries are ignored. Zones after the first are padded
/// to [`FAN_SLOT_LEDS`] LEDs. A zone reporting more LEDs than a slot holds is
/// cut to the slot size.
pub fn pack_zones(table: &ChannelTable, colors: &[Rgb]) -> Vec<u8> {
    let mut out = Vec::with_capacity(3 * (colors.len() + FAN_SLOT_LEDS * table.len()));
    let mut rest = colors;

    for (zone, ch) in table.channels().iter().enumerate() {
        let count = ch.led_count as usize;
        let take = count.min(rest.len());
        let (given, tail) = rest.split_at(take);
        rest = tail;

        let slot = if zone == 0 {
            count
        } else {
            if count > FAN_SLOT_LEDS {
                log::warn!(
                    "{} reports {count} LEDs, only {FAN_SLOT_LEDS} fit its slot",
                    ch.name
                );
            }
            FAN_SLOT_LEDS
        };

        let padded = given
            .iter()
            .copied()
            .chain(std::iter::repeat(Rgb::BLACK))
            .take(slot);
        for c in padded {
            out.extend_from_slice(&c.to_bytes());
        }
    }
    out
}
