//! Command-line interface for scribewire
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Real-time dictation streaming
#[derive(Parser, Debug)]
#[command(name = "scribewire", version, about = "Stream microphone audio to a cloud transcript")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress transcript display (final transcript still prints on stop)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Audio input device name
    #[arg(long, value_name = "DEVICE")]
    pub device: Option<String>,

    /// Recognition model (default: nova-2)
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Language code for transcription (default: en)
    #[arg(long, value_name = "LANG")]
    pub language: Option<String>,

    /// Request speaker diarization
    #[arg(long)]
    pub diarize: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available audio input devices
    Devices,
}

/// Default configuration path: `$XDG_CONFIG_HOME/scribewire/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("scribewire").join("config.toml"))
}
