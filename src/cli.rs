//! Command-line interface definition using clap
//!
//! Provides structured argument parsing with automatic help generation.

use clap::Parser;
use serialdv::constants::MAX_GAIN_DB;
use serialdv::RateProfile;
use std::path::PathBuf;

// =============================================================================
// CLI Definition
// =============================================================================

/// Encode/decode test loop through an AMBE3000 vocoder
///
/// Format indices: 0 none (default), 1 3600x2400 (D-Star), 2 3600x2450 (DMR),
/// 3 7200x4400, 4 7100x4400, 6 2450 no FEC, 7 4400 no FEC, 9 3000 no FEC,
/// 10 6400 no FEC, 11 7200 no FEC.
#[derive(Parser, Debug)]
#[command(name = "dvtest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Audio input with 8 kS/s S16LE samples ("-" for stdin)
    #[arg(short = 'i', long, value_name = "FILE", default_value = "/dev/audio")]
    pub input: String,

    /// Audio output with 8 kS/s S16LE samples ("-" for stdout)
    #[arg(short = 'o', long, value_name = "FILE", default_value = "/dev/audio")]
    pub output: String,

    /// Vocoder device: serial path (e.g. /dev/ttyUSB0) or server ip:port (overrides config)
    #[arg(short = 'D', long, value_name = "DEVICE")]
    pub device: Option<String>,

    /// Format index
    #[arg(short = 'f', long, value_name = "NUM", default_value = "0", value_parser = parse_format)]
    pub format: RateProfile,

    /// Linear gain applied to decoder output
    #[arg(short = 'g', long, value_name = "GAIN", default_value_t = 1.0)]
    pub gain: f32,

    /// Open serial devices at 230400 baud instead of 460800
    #[arg(long)]
    pub half_speed: bool,

    /// Config file (TOML)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_format(s: &str) -> Result<RateProfile, String> {
    let index: u8 = s
        .parse()
        .map_err(|_| format!("'{}' is not a format index", s))?;
    RateProfile::from_index(index).ok_or_else(|| format!("format {} is not supported", index))
}

/// Convert a linear gain to whole decibels
///
/// Non-positive gains map to the strongest attenuation.
pub fn gain_db(linear: f32) -> i32 {
    if linear <= 0.0 {
        return -MAX_GAIN_DB;
    }
    (10.0 * linear.log10()) as i32
}

// =============================================================================
// Tests
// =============================================================================
