//! ftmix CLI - Frequency-Domain Image Mixer
//!
//! Command-line interface for the ftmix mixing engine.

use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use log::debug;

use ftmix::cli::{commands, Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    debug!("ftmix v{}", env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Commands::Mix(args) => commands::mix(args),
        Commands::View(args) => commands::view(args),
    }
}
