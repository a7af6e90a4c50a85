//! Subtitle copy, burn-in filter and pre-extraction

use std::path::Path;

use crate::domain::model::{Container, SubtitleBurnMethod};
use crate::error::{ClipperError, ClipperResult};
use crate::planner::plan::ClipPlan;
use crate::probe::capabilities::FFMPEG;
use crate::utils::path::escape_filter_path;
use crate::utils::time::format_millis;

use super::{owned, INPUT_FLAG};

/// Muxing arguments for subtitle streams carried into the output
pub fn copy_args(plan: &ClipPlan) -> Vec<String> {
    if !plan.copy_subtitles {
        return Vec::new();
    }
    // MP4 only carries mov_text
    let codec = match plan.opts.container() {
        Container::Mp4 => "mov_text",
        _ => "copy",
    };
    owned(&["-map", "0:s?", "-c:s", codec])
}

/// `subtitles` filter reading either the extracted file or the source stream
pub fn burn_filter(plan: &ClipPlan, burn_file: Option<&Path>) -> ClipperResult<String> {
    let extracted = burn_file.filter(|p| p.exists());
    if plan.subtitle_burn_method == Some(SubtitleBurnMethod::Extract) && extracted.is_none() {
        return Err(ClipperError::ConversionFailed {
            message: "subtitles must be extracted before the burn-in filter is built".to_string(),
        });
    }
    match extracted {
        Some(path) => Ok(format!(
            "subtitles='{}'",
            escape_filter_path(&path.to_string_lossy())
        )),
        None => Ok(format!(
            "subtitles='{}':si={}",
            escape_filter_path(&plan.opts.source),
            plan.burn_subtitles.unwrap_or(0)
        )),
    }
}

/// Command writing the clip's cues of the burned stream to `dest`
///
/// Seeks before the input to skip most of the file, then seeks to zero after
/// it so earlier cues are dropped. A delay shifts the cues with `-itsoffset`.
pub fn extract_command(plan: &ClipPlan, dest: &Path) -> Vec<String> {
    let mut args = owned(&[FFMPEG, "-y"]);
    if let Some(delay) = plan.subtitle_delay_ms.filter(|d| *d != 0) {
        args.extend([
            "-itsoffset".to_string(),
            format!("{:.3}", delay as f64 / 1000.0),
        ]);
    }

    let mut post_input = Vec::new();
    if plan.start_ms > 0 {
        args.extend(["-ss".to_string(), format_millis(plan.start_ms)]);
        post_input.extend(owned(&["-ss", "0"]));
    }
    if let Some(ms) = plan.duration_ms.filter(|ms| *ms > 0) {
        post_input.extend(["-t".to_string(), format_millis(ms)]);
    }

    args.push(INPUT_FLAG.to_string());
    args.push(plan.opts.source.clone());
    args.extend(post_input);
    args.extend([
        "-map".to_string(),
        format!("0:s:{}", plan.burn_subtitles.unwrap_or(0)),
        "-c:s".to_string(),
        "copy".to_string(),
        dest.to_string_lossy().into_owned(),
    ]);
    args
}
