//! Time range arguments

use tracing::debug;

use crate::domain::model::CopyTrim;
use crate::planner::plan::ClipPlan;
use crate::planner::TrimBounds;
use crate::utils::time::{format_millis, format_time, RoundMode};

/// Arguments placed before and after `-i`
pub fn args(plan: &ClipPlan) -> (Vec<String>, Vec<String>) {
    if !plan.need_trim {
        return (Vec::new(), Vec::new());
    }
    if plan.copies_stream() {
        return match plan.opts.runtime.copy_trim {
            CopyTrim::Fast => fast(plan),
            CopyTrim::Keyframe => (keyframe(plan), Vec::new()),
        };
    }
    (basic(plan), Vec::new())
}

/// Decode path: accurate `-ss`/`-t` before the input
pub fn basic(plan: &ClipPlan) -> Vec<String> {
    let mut args = Vec::new();
    if plan.start_ms > 0 {
        args.extend(["-ss".to_string(), format_millis(plan.start_ms)]);
    }
    if let Some(ms) = plan.duration_ms.filter(|ms| *ms > 0) {
        args.extend(["-t".to_string(), format_millis(ms)]);
    }
    args
}

/// Stream copy without keyframe probing
pub fn fast(plan: &ClipPlan) -> (Vec<String>, Vec<String>) {
    let mut pre = Vec::new();
    let mut post = Vec::new();
    if plan.start_ms > 0 {
        pre.extend([
            "-noaccurate_seek".to_string(),
            "-ss".to_string(),
            format_millis(plan.start_ms),
        ]);
    }
    if let Some(ms) = plan.duration_ms.filter(|ms| *ms > 0) {
        post.extend(["-t".to_string(), format_millis(ms)]);
    }
    (pre, post)
}

/// Stream copy cut on the planned keyframes, widened to whole milliseconds
pub fn keyframe(plan: &ClipPlan) -> Vec<String> {
    let bounds = plan.copy_bounds.unwrap_or_else(|| {
        let start_s = plan.start_ms as f64 / 1000.0;
        let end_s = plan
            .duration_ms
            .map(|ms| start_s + ms as f64 / 1000.0)
            .unwrap_or(plan.source_duration_s);
        debug!("No snapped bounds in plan, cutting at the requested times");
        TrimBounds::new(start_s, end_s)
    });
    vec![
        "-seek2any".to_string(),
        "0".to_string(),
        "-ss".to_string(),
        format_time(bounds.start_s, RoundMode::Floor),
        "-to".to_string(),
        format_time(bounds.end_s, RoundMode::Ceil),
        "-copyts".to_string(),
    ]
}
