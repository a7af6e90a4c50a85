//! Error handling module for ffclipper

use thiserror::Error;

/// Main error type for ffclipper operations
#[derive(Error, Debug)]
pub enum ClipperError {
    /// Bitrate planning was asked to budget a non-positive duration
    #[error("Duration must be greater than 0 (got {duration_s}s)")]
    InvalidDuration { duration_s: f64 },

    /// Share of the target size kept for stream payload, outside (0, 1]
    #[error("Reserve factor must be in (0, 1] (got {reserve_factor})")]
    InvalidReserveFactor { reserve_factor: f64 },

    /// The audio budget alone consumes the requested target size
    #[error(
        "Target size leaves no bitrate budget for video (audio ~= {audio_kbps} kbps over {duration_s:.2}s, \
         target ~= {target_bytes} bytes). Increase the target size, lower the audio bitrate, or avoid audio copy."
    )]
    NoBitrateBudget {
        audio_kbps: u32,
        target_bytes: u64,
        duration_s: f64,
    },

    /// Invalid time format
    #[error("Invalid time format: {time}. Expected seconds, 1h2m3s, MM:SS(.ms) or HH:MM:SS(.ms)")]
    InvalidTimeFormat { time: String },

    /// Time range validation error
    #[error("Invalid time range: {message}")]
    InvalidTimeRange { message: String },

    /// Option combination rejected before planning
    #[error("Invalid options: {message}")]
    InvalidOptions { message: String },

    /// External tool missing from PATH
    #[error("{tool} not found")]
    ToolNotFound { tool: String },

    /// External tool exited unsuccessfully
    #[error("{tool} failed ({status}): {output}")]
    ToolFailed {
        tool: String,
        status: String,
        output: String,
    },

    /// Media probe error
    #[error("Failed to probe media file: {message}")]
    ProbeError { message: String },

    /// Requested encoder cannot run on this system
    #[error("Video encoder '{encoder}' not available")]
    EncoderUnavailable { encoder: String },

    /// Output location error
    #[error("Output error: {message}")]
    OutputError { message: String },

    /// ffmpeg run failed
    #[error("Conversion failed: {message}")]
    ConversionFailed { message: String },

    /// Configuration file or environment error
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ClipperError {
    /// Shorthand for option validation failures
    pub fn options(message: impl Into<String>) -> Self {
        Self::InvalidOptions {
            message: message.into(),
        }
    }
}

/// Result type alias for ffclipper operations
pub type ClipperResult<T> = std::result::Result<T, ClipperError>;
