//! ffmpeg command assembly
//!
//! Each stream kind contributes its own argument group; [`build_command`]
//! strings them together in the order ffmpeg expects.

use std::path::Path;

use crate::error::ClipperResult;
use crate::planner::plan::{ClipPlan, Tonemapper};
use crate::probe::capabilities::FFMPEG;
use crate::utils::path::null_device;

pub mod audio;
pub mod executor;
pub mod mux;
pub mod subs;
pub mod trim;
pub mod video;

pub use executor::{run_conversion, ConversionReport};

/// Overwrite without asking, let ffmpeg pick a hardware decoder
pub const GLOBAL_FLAGS: [&str; 3] = ["-y", "-hwaccel", "auto"];
/// Vulkan device needed by the libplacebo filter
pub const TONEMAP_HW_DEVICE: [&str; 2] = ["-init_hw_device", "vulkan"];
pub const INPUT_FLAG: &str = "-i";

/// Per-invocation details not carried by the plan
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandContext<'a> {
    /// Pass number for two-pass encoders, `None` for single pass
    pub pass: Option<u8>,
    /// Base name for two-pass statistics files
    pub stats_id: Option<&'a str>,
    /// Subtitle file extracted for burn-in
    pub burn_file: Option<&'a Path>,
}

impl<'a> CommandContext<'a> {
    pub fn pass(mut self, pass: u8, stats_id: &'a str) -> Self {
        self.pass = Some(pass);
        self.stats_id = Some(stats_id);
        self
    }

    pub fn burn_file(mut self, path: Option<&'a Path>) -> Self {
        self.burn_file = path;
        self
    }

    /// Analysis pass that discards its output
    pub fn is_first_pass(&self) -> bool {
        self.pass == Some(1)
    }
}

/// Full ffmpeg command line, program name first
pub fn build_command(plan: &ClipPlan, ctx: CommandContext<'_>) -> ClipperResult<Vec<String>> {
    let mut args = vec![FFMPEG.to_string()];
    args.extend(owned(&GLOBAL_FLAGS));
    if plan.tonemap == Some(Tonemapper::Libplacebo) {
        args.extend(owned(&TONEMAP_HW_DEVICE));
    }

    let (pre_input, post_input) = trim::args(plan);
    args.extend(pre_input);
    args.push(INPUT_FLAG.to_string());
    args.push(plan.opts.source.clone());
    args.extend(post_input);

    args.extend(video::args(plan, &ctx)?);
    args.extend(audio::args(plan, ctx.pass));
    args.extend(subs::copy_args(plan));

    if ctx.is_first_pass() {
        // x264/x265 analysis passes need a real muxer even when discarded
        args.extend(owned(&["-f", "mp4"]));
        args.push(null_device().to_string());
    } else {
        args.extend(mux::args(plan, is_passthrough(plan)));
        args.push(plan.output_path.to_string_lossy().into_owned());
    }
    Ok(args)
}

/// Copied streams keep their timestamps unless fast trimming already cut them
pub fn is_passthrough(plan: &ClipPlan) -> bool {
    use crate::domain::model::CopyTrim;
    plan.copies_stream() && (plan.opts.runtime.copy_trim != CopyTrim::Fast || !plan.need_trim)
}

pub(crate) fn owned(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

/// `-map 0:<kind>:0`
pub(crate) fn map_first(kind: char) -> Vec<String> {
    vec!["-map".to_string(), format!("0:{}:0", kind)]
}

#[cfg(test)]
mod tests;
