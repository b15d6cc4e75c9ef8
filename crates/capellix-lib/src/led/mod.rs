//! LED colors: parsing, per-zone buffers, device buffer layout.

mod color;
mod zones;

pub use color::{Rgb, format_color, parse_color};
pub use zones::{pack_zones, solid, zone_colors};
