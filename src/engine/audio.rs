//! Audio stream arguments

use crate::domain::model::AudioCodec;
use crate::planner::plan::ClipPlan;

use super::{map_first, owned};

/// Drop every audio stream
pub const DISABLE: &str = "-an";

/// Audio arguments; analysis passes never carry audio
pub fn args(plan: &ClipPlan, pass: Option<u8>) -> Vec<String> {
    let audio = &plan.opts.audio;
    if pass == Some(1) || !audio.include {
        return vec![DISABLE.to_string()];
    }
    if audio.copy {
        return copy();
    }
    encode(plan)
}

pub fn copy() -> Vec<String> {
    let mut args = map_first('a');
    args.extend(owned(&["-c:a", "copy"]));
    args
}

pub fn encode(plan: &ClipPlan) -> Vec<String> {
    let audio = &plan.opts.audio;
    let encoder = match plan.opts.container().encoded_audio_codec() {
        AudioCodec::Opus => "libopus",
        _ => "aac",
    };
    let mut args = map_first('a');
    args.extend(owned(&["-c:a", encoder]));
    if audio.downmix_to_stereo.unwrap_or(true) {
        args.extend(owned(&["-ac", "2"]));
    }
    args.extend([
        "-b:a".to_string(),
        format!("{}k", audio.kbps.unwrap_or(plan.audio_budget_kbps)),
    ]);
    args
}
