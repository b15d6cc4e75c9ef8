//! Color parsing and formatting for Commander Core LED control.
//!
//! The device takes plain `R, G, B` byte triplets; [`Rgb`] is one of them.

use std::fmt;

use serde::Serialize;

use crate::error::{CapellixError, Result};

/// One LED color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(0xFF, 0xFF, 0xFF);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    /// Wire order: red, green, blue.
    pub const fn to_bytes(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_color(*self))
    }
}

impl std::str::FromStr for Rgb {
    type Err = CapellixError;

    fn from_str(s: &str) -> Result<Self> {
        parse_color(s)
    }
}

/// Parse a color string.
///
/// Accepts:
/// - Hex: `"#FF0000"`, `"FF0000"`, `"#ff0000"`
/// - Decimal triplet: `"255,0,0"`, `"255, 0, 0"`
/// - Named: `"red"`, `"green"`, `"blue"`, `"white"`, `"orange"`, `"yellow"`, `"purple"`, `"cyan"`, `"off"`/`"black"`
pub fn parse_color(s: &str) -> Result<Rgb> {
    let s = s.trim();

    // Named colors
    match s.to_lowercase().as_str() {
        "red" => return Ok(Rgb::new(0xFF, 0x00, 0x00)),
        "green" => return Ok(Rgb::new(0x00, 0xFF, 0x00)),
        "blue" => return Ok(Rgb::new(0x00, 0x00, 0xFF)),
        "white" => return Ok(Rgb::WHITE),
        "orange" => return Ok(Rgb::new(0xFF, 0x80, 0x00)),
        "yellow" => return Ok(Rgb::new(0xFF, 0xFF, 0x00)),
        "purple" => return Ok(Rgb::new(0x80, 0x00, 0xFF)),
        "cyan" => return Ok(Rgb::new(0x00, 0xFF, 0xFF)),
        "off" | "black" => return Ok(Rgb::BLACK),
        _ => {}
    }

    if s.contains(',') {
        return parse_triplet(s);
    }

    // Hex color
    let hex = s.strip_prefix('#').unwrap_or(s);
    if hex.len() != 6 {
        return Err(CapellixError::Color(format!(
            "Invalid color: {s} (use #RRGGBB, R,G,B or a color name)"
        )));
    }
    let val = u32::from_str_radix(hex, 16)
        .map_err(|_| CapellixError::Color(format!("Invalid hex color: {s}")))?;
    let [_, r, g, b] = val.to_be_bytes();
    Ok(Rgb::new(r, g, b))
}

fn parse_triplet(s: &str) -> Result<Rgb> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let &[r, g, b] = parts.as_slice() else {
        return Err(CapellixError::Color(format!(
            "Invalid color: {s} (expected three components)"
        )));
    };
    let component = |c: &str| {
        c.parse::<u8>()
            .map_err(|_| CapellixError::Color(format!("Invalid color component '{c}' in {s}")))
    };
    Ok(Rgb::new(component(r)?, component(g)?, component(b)?))
}

/// Format a color as `#RRGGBB`.
pub fn format_color(c: Rgb) -> String {
    format!("#{:02X}{:02X}{:02X}", c.r, c.g, c.b)
}
