//! Wire framing: HID report construction and color write chunking.
//!
//! Pure functions with no I/O; `session` feeds their output to the transport.

use crate::protocol::{
    COLOR_HEADER_SIZE, CMD_WRITE_COLOR, CMD_WRITE_COLOR_NEXT, DATA_TYPE_SET_COLOR, HEADER_SIZE,
    PROTOCOL_HEADER, REPORT_ID,
};

/// Build one outbound HID report of exactly `write_size` bytes.
///
/// Layout: `[0x00][0x08][command...][payload...][zero padding]`.
///
/// `command.len() + payload.len()` must not exceed `write_size - 2`; callers
/// keep payloads within the profile's `max_chunk`. Excess bytes are dropped.
pub fn build_packet(write_size: usize, command: &[u8], payload: &[u8]) -> Vec<u8> {
    debug_assert!(
        HEADER_SIZE + command.len() + payload.len() <= write_size,
        "frame overflow: {} command + {} payload bytes in a {write_size}-byte report",
        command.len(),
        payload.len()
    );

    let mut pkt = vec![0u8; write_size.max(HEADER_SIZE)];
    pkt[0] = REPORT_ID;
    pkt[1] = PROTOCOL_HEADER;

    let body = command.iter().chain(payload.iter());
    for (dst, &src) in pkt[HEADER_SIZE..].iter_mut().zip(body) {
        *dst = src;
    }
    pkt
}

/// Largest RGB byte count whose length field fits in a `u16`.
pub const MAX_COLOR_BYTES: usize = (u16::MAX as usize - 2) / 3 * 3;

/// Build the color write buffer for a flat RGB byte sequence.
///
/// Layout: `[len_lo][len_hi][0x00][0x00][0x12][0x00][rgb...]` where the
/// length field is `rgb.len() + 2`.
///
/// The length field is 16 bits wide. Buffers longer than
/// [`MAX_COLOR_BYTES`] are cut to that many bytes (whole LEDs) with a warning.
pub fn build_color_payload(rgb: &[u8]) -> Vec<u8> {
    let rgb = if rgb.len() > MAX_COLOR_BYTES {
        log::warn!(
            "color buffer of {} bytes truncated to {MAX_COLOR_BYTES}",
            rgb.len()
        );
        &rgb[..MAX_COLOR_BYTES]
    } else {
        rgb
    };
    let size = (rgb.len() + 2) as u16;
    let mut buf = Vec::with_capacity(COLOR_HEADER_SIZE + rgb.len());
    buf.extend_from_slice(&size.to_le_bytes());
    buf.extend_from_slice(&[0x00, 0x00]);
    buf.extend_from_slice(&DATA_TYPE_SET_COLOR);
    buf.extend_from_slice(rgb);
    buf
}

/// Split a color write buffer into `(command, chunk)` pairs.
///
/// Chunks are at most `max_chunk` bytes; boundaries are purely size-driven.
/// The first chunk goes out as `CMD_WRITE_COLOR`, the rest as
/// `CMD_WRITE_COLOR_NEXT`.
pub fn color_chunks(payload: &[u8], max_chunk: usize) -> Vec<(&'static [u8], &[u8])> {
    payload
        .chunks(max_chunk.max(1))
        .enumerate()
        .map(|(i, chunk)| {
            let cmd = if i == 0 {
                CMD_WRITE_COLOR
            } else {
                CMD_WRITE_COLOR_NEXT
            };
            (cmd, chunk)
        })
        .collect()
}
