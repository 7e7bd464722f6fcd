//! Command-line argument parsing for QHA runs

use clap::Parser;

/// Quasi-harmonic thermodynamics from a YAML settings file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the YAML settings file
    #[arg(short, long, default_value = "settings.yaml")]
    pub config_file: String,

    /// Log file (default: stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Only use static energies, skip the vibrational contribution
    #[arg(long)]
    pub static_only: bool,

    /// Override the equation-of-state order (3, 4 or 5)
    #[arg(long)]
    pub order: Option<u8>,

    /// Override the volume expansion ratio instead of searching for one
    #[arg(long)]
    pub volume_ratio: Option<f64>,

    /// Override the results directory
    #[arg(long)]
    pub output_directory: Option<String>,
}
