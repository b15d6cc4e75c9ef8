//! capellix CLI: direct LED control for Corsair Commander Core controllers.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;

mod cli;

/// Shared shutdown flag: set by Ctrl+C handler.
pub static RUNNING: AtomicBool = AtomicBool::new(true);

#[derive(Parser)]
#[command(
    name = "capellix-cli",
    version,
    about = "Direct LED control for Corsair Commander Core / CAPELLIX controllers"
)]
struct Args {
    /// Output as JSON (for status, config, devices)
    #[arg(long, global = true)]
    json: bool,

    /// Log protocol traffic and init steps
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of the platform default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: cli::Command,
}

fn main() {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp(None)
        .format_target(false)
        .init();

    if let Err(e) = ctrlc::set_handler(move || {
        RUNNING.store(false, Ordering::SeqCst);
    }) {
        log::warn!("could not install Ctrl+C handler: {e}");
    }

    if let Err(e) = cli::run(args.command, args.json, args.config) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
