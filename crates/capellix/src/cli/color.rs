//! `solid`, `zones` and `off` subcommands: push colors and hold them.

use std::path::Path;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use super::{RUNNING, Result, Rgb, led, load_config, open_session};
use super::topology::ChannelTable;

/// What to paint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Fill {
    Solid(Rgb),
    Zones { pump: Rgb, fans: Rgb },
}

impl Fill {
    /// One color per LED for the given table.
    pub(super) fn colors(self, table: &ChannelTable) -> Vec<Rgb> {
        match self {
            Fill::Solid(c) => led::solid(table, c),
            Fill::Zones { pump, fans } => led::zone_colors(table, pump, fans),
        }
    }

    fn describe(self) -> String {
        match self {
            Fill::Solid(c) if c == Rgb::BLACK => "off".to_string(),
            Fill::Solid(c) => c.to_string(),
            Fill::Zones { pump, fans } => format!("pump {pump}, fans {fans}"),
        }
    }
}

/// Parse `arg` if given, otherwise fall back to the config value.
fn resolve(arg: Option<&str>, from_config: impl FnOnce() -> Result<Rgb>) -> Result<Rgb> {
    match arg {
        Some(s) => led::parse_color(s),
        None => from_config(),
    }
}

pub(super) fn cmd_solid(
    color: Option<&str>,
    duration: Option<u64>,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = load_config(config_path);
    let color = resolve(color, || config.solid_color())?;
    apply(Fill::Solid(color), duration, &config)
}

pub(super) fn cmd_zones(
    pump: Option<&str>,
    fans: Option<&str>,
    duration: Option<u64>,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = load_config(config_path);
    let pump = resolve(pump, || config.pump())?;
    let fans = resolve(fans, || config.fans())?;
    apply(Fill::Zones { pump, fans }, duration, &config)
}

pub(super) fn cmd_off(duration: Option<u64>, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path);
    apply(Fill::Solid(Rgb::BLACK), duration, &config)
}

/// Open, initialize, paint, hold, tear down.
fn apply(fill: Fill, duration: Option<u64>, config: &super::Config) -> Result<()> {
    let mut session = open_session(config)?;
    session.initialize();

    let colors = fill.colors(session.channels());
    session.update_leds(&colors);
    println!(
        "{}: {} on {} LEDs",
        session.model(),
        fill.describe(),
        session.total_leds()
    );

    match duration {
        Some(secs) => println!("Holding for {secs}s..."),
        None => println!("Holding. Press Ctrl+C to restore hardware lighting."),
    }
    hold(duration.map(Duration::from_secs));

    session.shutdown();
    println!("Hardware lighting restored.");
    Ok(())
}

/// Block until Ctrl+C or until `duration` has passed.
fn hold(duration: Option<Duration>) {
    let deadline = duration.map(|d| Instant::now() + d);
    while RUNNING.load(Ordering::SeqCst) && deadline.is_none_or(|d| Instant::now() < d) {
        std::thread::sleep(Duration::from_millis(100));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgb = Rgb::new(255, 0, 0);
    const BLUE: Rgb = Rgb::new(0, 0, 255);

    #[test]
    fn solid_fill_covers_default_layout() {
        let colors = Fill::Solid(RED).colors(&ChannelTable::fallback_table());
        assert_eq!(colors.len(), 57);
        assert!(colors.iter().all(|&c| c == RED));
    }

    #[test]
    fn zone_fill_splits_pump_and_fans() {
        let colors = Fill::Zones {
            pump: RED,
            fans: BLUE,
        }
        .colors(&ChannelTable::fallback_table());
        assert_eq!(colors[0], RED);
        assert_eq!(colors[33], BLUE);
    }

    #[test]
    fn describe_fills() {
        assert_eq!(Fill::Solid(Rgb::BLACK).describe(), "off");
        assert_eq!(Fill::Solid(RED).describe(), "#FF0000");
        assert_eq!(
            Fill::Zones {
                pump: RED,
                fans: BLUE
            }
            .describe(),
            "pump #FF0000, fans #0000FF"
        );
    }

    #[test]
    fn resolve_prefers_argument() {
        let c = resolve(Some("blue"), || Ok(RED)).unwrap();
        assert_eq!(c, BLUE);
    }

    #[test]
    fn resolve_falls_back_to_config() {
        let c = resolve(None, || Ok(RED)).unwrap();
        assert_eq!(c, RED);
    }

    #[test]
    fn resolve_rejects_bad_argument() {
        assert!(resolve(Some("nope"), || Ok(RED)).is_err());
    }

    #[test]
    fn hold_returns_after_duration() {
        let started = Instant::now();
        hold(Some(Duration::ZERO));
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
