//! Command-line interface definitions.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Barge-in behavior while synthesized speech is playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BargeInArg {
    /// Gate microphone input during playback (default).
    Gate,
    /// Let user speech interrupt playback.
    Interrupt,
}

impl From<BargeInArg> for crate::session::BargeInPolicy {
    fn from(arg: BargeInArg) -> Self {
        match arg {
            BargeInArg::Gate => Self::GateDuringPlayback,
            BargeInArg::Interrupt => Self::InterruptToSpeak,
        }
    }
}

/// Real-time voice conversation pipeline.
#[derive(Debug, Parser)]
#[command(name = "voxloop", version, about)]
pub struct Cli {
    /// Path to the configuration file (default: ~/.config/voxloop/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Audio input device name (see `voxloop devices`)
    #[arg(short, long)]
    pub device: Option<String>,

    /// VAD speech threshold (RMS, 0.0-1.0)
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Minimum interval between synthesis requests (e.g. "2s", "1500ms")
    #[arg(long, value_parser = humantime::parse_duration)]
    pub cooldown: Option<Duration>,

    /// Barge-in policy during playback
    #[arg(long, value_enum)]
    pub barge_in: Option<BargeInArg>,

    /// Show a live input level meter on stderr
    #[arg(long)]
    pub meter: bool,

    /// Exit after the first completed turn
    #[arg(long)]
    pub once: bool,

    /// Suppress status messages
    #[arg(short, long)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List audio input devices
    Devices,
    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Write a default configuration file
    Init,
    /// Print the resolved configuration
    Show,
}
