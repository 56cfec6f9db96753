//! CLI Module
//!
//! Command-line front end for the spectral mixer.

pub mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::registry::{InputSlot, INPUT_SLOT_COUNT};

/// ftmix - Mix images in the frequency domain
#[derive(Parser, Debug)]
#[command(name = "ftmix-cli")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Mix up to four images and write the composite
    #[command(name = "mix")]
    Mix(MixArgs),

    /// Write one spectral view of an image
    #[command(name = "view")]
    View(ViewArgs),
}

#[derive(Args, Debug)]
pub struct MixArgs {
    /// Input image as SLOT=PATH, slot 1-4 (repeatable)
    #[arg(short, long = "image", value_parser = parse_slot_path, required = true)]
    pub images: Vec<(InputSlot, PathBuf)>,

    /// Magnitude/real weights for slots 1-4, 0-10 each
    #[arg(long, value_parser = parse_weights, default_value = "10,10,10,10")]
    pub wa: [f64; INPUT_SLOT_COUNT],

    /// Phase/imaginary weights for slots 1-4, 0-10 each
    #[arg(long, value_parser = parse_weights, default_value = "10,10,10,10")]
    pub wb: [f64; INPUT_SLOT_COUNT],

    /// magnitude_phase or real_imag
    #[arg(short, long, default_value = "magnitude_phase")]
    pub mode: String,

    /// Size of the centered keep region, percent of each axis
    #[arg(short, long, default_value_t = 100.0)]
    pub size: f64,

    /// Keep everything outside the region instead of inside
    #[arg(long)]
    pub outer: bool,

    /// JSON request body; replaces the weight, mode and mask flags
    #[arg(short, long)]
    pub request: Option<PathBuf>,

    /// Output port, 1 or 2
    #[arg(short, long, default_value_t = 1)]
    pub target: u8,

    /// Mixer config file (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Where to write the composite PNG
    #[arg(short, long)]
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct ViewArgs {
    /// Source image
    #[arg(short, long)]
    pub image: PathBuf,

    /// original, magnitude, phase, real or imaginary
    #[arg(short, long, default_value = "magnitude")]
    pub kind: String,

    /// Where to write the view PNG
    #[arg(short, long)]
    pub output: PathBuf,
}

/// Parse `SLOT=PATH`
fn parse_slot_path(value: &str) -> Result<(InputSlot, PathBuf), String> {
    let (slot, path) = value
        .split_once('=')
        .ok_or_else(|| format!("expected SLOT=PATH, got '{}'", value))?;
    let slot: InputSlot = slot.parse().map_err(|e| format!("{}", e))?;
    if path.is_empty() {
        return Err("image path is empty".to_string());
    }
    Ok((slot, PathBuf::from(path)))
}

/// Parse four comma-separated weights
fn parse_weights(value: &str) -> Result<[f64; INPUT_SLOT_COUNT], String> {
    let parsed = value
        .split(',')
        .map(|w| {
            w.trim()
                .parse::<f64>()
                .map_err(|_| format!("'{}' is not a number", w.trim()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    parsed
        .try_into()
        .map_err(|v: Vec<f64>| format!("expected {} weights, got {}", INPUT_SLOT_COUNT, v.len()))
}
