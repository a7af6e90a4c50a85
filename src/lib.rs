//! ffclipper library
//!
//! Plans and runs ffmpeg invocations that cut a clip from a video, either by
//! stream copying between keyframes or by re-encoding to a target file size.
//!
//! The two planning primitives are usable on their own:
//!
//! - [`planner::resolve_copy_bounds`] snaps a copy-trim window to the
//!   keyframes reported by any [`ports::KeyframeProbe`].
//! - [`planner::BitrateBudget`] derives the bitrate, peak rate and buffer size
//!   that keep an encode near a target size.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod planner;
pub mod ports;
pub mod probe;
pub mod utils;

// Re-export commonly used types
pub use config::ClipperConfig;
pub use domain::options::ClipOptions;
pub use engine::{build_command, run_conversion, CommandContext, ConversionReport};
pub use error::{ClipperError, ClipperResult};
pub use planner::{
    compute_video_bitrate_kbps, resolve_copy_bounds, BitrateBudget, ClipPlan, ProbeWindow,
    TrimBounds,
};
pub use ports::{ExecutePort, KeyframeProbe, ToolRunner};
