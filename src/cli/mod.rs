//! CLI module for ffclipper
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{ClipperConfig, LogFormat};
use crate::domain::model::Verbosity;

pub mod args;
pub mod commands;

/// ffclipper - cut and shrink video clips with ffmpeg
///
/// Clips are stream copied on keyframes or re-encoded to fit a target size.
#[derive(Parser, Debug)]
#[command(name = "ffclipper")]
#[command(about = "Cut video clips with ffmpeg, sized to a target file size")]
#[command(version)]
pub struct Cli {
    /// Logging filter (error, warn, info, debug, trace or a directive)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log line format
    #[arg(long, value_enum, global = true)]
    pub log_format: Option<LogFormat>,

    /// Configuration file (TOML or YAML)
    #[arg(long, global = true, env = "FFCLIPPER_CONFIG")]
    pub config: Option<PathBuf>,

    /// How much ffmpeg detail to show
    #[arg(short, long, value_enum, global = true)]
    pub verbosity: Option<Verbosity>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Apply global flags over the loaded configuration
    pub fn apply_to(&self, config: &mut ClipperConfig) {
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        if let Some(verbosity) = self.verbosity {
            config.verbosity = verbosity;
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Cut a clip from a video
    Clip(args::ClipArgs),
    /// Show duration, codecs and subtitle tracks of a video
    Inspect(args::InspectArgs),
    /// Show where a copy trim would snap to keyframes
    Keyframes(args::KeyframesArgs),
    /// Compute the video bitrate that fits a target size
    Budget(args::BudgetArgs),
    /// Print the effective configuration
    Config,
}
