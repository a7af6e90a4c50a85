//! Layered configuration: defaults, then file, then environment
//!
//! Command-line flags are applied last by the CLI layer, giving the
//! precedence CLI > env > file > defaults.

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::adapters::config_file;
use crate::domain::model::{Container, CopyTrim, Encoder, Verbosity};
use crate::error::{ClipperError, ClipperResult};

/// Prefix shared by every environment override
pub const ENV_PREFIX: &str = "FFCLIPPER_";

/// Log line rendering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// User configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipperConfig {
    /// tracing filter directive, e.g. `info` or `ffclipper=debug`
    pub log_level: String,
    pub log_format: LogFormat,
    pub verbosity: Verbosity,
    pub container: Option<Container>,
    pub encoder: Option<Encoder>,
    /// Default target size in MiB
    pub target_size_mb: Option<u64>,
    pub audio_kbps: Option<u32>,
    pub copy_trim: CopyTrim,
    pub open_dir: bool,
    /// JSON file persisting ffprobe answers between runs
    pub probe_cache: Option<PathBuf>,
}

impl Default for ClipperConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            verbosity: Verbosity::Quiet,
            container: None,
            encoder: None,
            target_size_mb: None,
            audio_kbps: None,
            copy_trim: CopyTrim::Keyframe,
            open_dir: false,
            probe_cache: None,
        }
    }
}

impl ClipperConfig {
    /// Defaults, overlaid with the config file and process environment
    pub fn load(explicit: Option<&Path>) -> ClipperResult<Self> {
        let mut config = match explicit {
            Some(path) => config_file::load(path)?,
            None => match default_config_paths().into_iter().find(|p| p.is_file()) {
                Some(path) => config_file::load(&path)?,
                None => {
                    debug!("No configuration file found, using defaults");
                    Self::default()
                }
            },
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `FFCLIPPER_*` overrides read through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> ClipperResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));
        let mut applied = 0;

        if let Some(v) = var("LOG_LEVEL") {
            self.log_level = v;
            applied += 1;
        }
        if let Some(v) = var("LOG_FORMAT") {
            self.log_format = parse_enum("LOG_FORMAT", &v)?;
            applied += 1;
        }
        if let Some(v) = var("VERBOSITY") {
            self.verbosity = parse_enum("VERBOSITY", &v)?;
            applied += 1;
        }
        if let Some(v) = var("CONTAINER") {
            self.container = Some(parse_enum("CONTAINER", &v)?);
            applied += 1;
        }
        if let Some(v) = var("ENCODER") {
            self.encoder = Some(parse_enum("ENCODER", &v)?);
            applied += 1;
        }
        if let Some(v) = var("TARGET_SIZE") {
            self.target_size_mb = Some(parse_number("TARGET_SIZE", &v)?);
            applied += 1;
        }
        if let Some(v) = var("AUDIO_KBPS") {
            self.audio_kbps = Some(parse_number("AUDIO_KBPS", &v)?);
            applied += 1;
        }
        if let Some(v) = var("COPY_TRIM") {
            self.copy_trim = parse_enum("COPY_TRIM", &v)?;
            applied += 1;
        }
        if let Some(v) = var("OPEN_DIR") {
            self.open_dir = parse_bool("OPEN_DIR", &v)?;
            applied += 1;
        }
        if let Some(v) = var("PROBE_CACHE") {
            self.probe_cache = Some(PathBuf::from(v));
            applied += 1;
        }

        if applied > 0 {
            info!("Applied {} environment variable overrides", applied);
        }
        Ok(())
    }
}

/// Files searched when no `--config` is given, first match wins
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from("ffclipper.toml"),
        PathBuf::from("ffclipper.yaml"),
        PathBuf::from("ffclipper.yml"),
    ];
    let config_home = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("APPDATA").map(PathBuf::from))
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")));
    if let Some(dir) = config_home {
        paths.push(dir.join("ffclipper").join("config.toml"));
        paths.push(dir.join("ffclipper").join("config.yaml"));
    }
    paths
}

fn parse_enum<T: ValueEnum>(name: &str, value: &str) -> ClipperResult<T> {
    T::from_str(value, true).map_err(|_| invalid_env(name, value))
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> ClipperResult<T> {
    value.trim().parse().map_err(|_| invalid_env(name, value))
}

fn parse_bool(name: &str, value: &str) -> ClipperResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid_env(name, value)),
    }
}

fn invalid_env(name: &str, value: &str) -> ClipperError {
    ClipperError::ConfigError {
        message: format!("Invalid value for {}{}: '{}'", ENV_PREFIX, name, value),
    }
}
