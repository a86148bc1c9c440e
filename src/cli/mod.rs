//! CLI interface for chiptone

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Procedural waveform voices for real-time audio
#[derive(Parser)]
#[command(name = "chiptone")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Play the configured voices on the output device
    Play {
        /// Configuration file path
        #[arg(short, long, default_value = "chiptone.yaml")]
        config: PathBuf,

        /// Stop after this many seconds (default: one second after the last cue)
        #[arg(short, long)]
        duration: Option<f64>,
    },

    /// Play a single voice
    Tone {
        /// Waveform shape: sine, square, triangle or sawtooth
        #[arg(short, long, default_value = "sine")]
        shape: String,

        /// Frequency in Hz
        #[arg(short, long, default_value = "440")]
        frequency: f32,

        /// Volume multiplier
        #[arg(short, long, default_value = "1", allow_negative_numbers = true)]
        volume: i32,

        /// Duration in seconds
        #[arg(short, long, default_value = "2")]
        duration: f64,

        /// Record to this WAV file instead of playing
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Record the configured voices to a WAV file
    Record {
        /// Configuration file path
        #[arg(short, long, default_value = "chiptone.yaml")]
        config: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Duration in seconds (default: one second after the last cue)
        #[arg(short, long)]
        duration: Option<f64>,
    },

    /// List available audio devices
    Devices,

    /// Validate a configuration file
    Check {
        /// Configuration file path
        #[arg(short, long, default_value = "chiptone.yaml")]
        config: PathBuf,
    },

    /// Generate an example configuration file
    Init,
}
