//! Container muxing flags

use crate::domain::model::{Container, VideoCodec};
use crate::planner::plan::ClipPlan;

use super::owned;

pub const FASTSTART: [&str; 2] = ["-movflags", "+faststart"];
/// Inherited chapters point outside a trimmed clip
pub const DROP_CHAPTERS: [&str; 2] = ["-map_chapters", "-1"];
/// Keep timestamps stable when streams are copied
pub const PASSTHROUGH: [&str; 8] = [
    "-avoid_negative_ts",
    "make_zero",
    "-muxpreload",
    "0",
    "-muxdelay",
    "0",
    "-copytb",
    "1",
];

pub fn args(plan: &ClipPlan, passthrough: bool) -> Vec<String> {
    let mut args = Vec::new();
    if plan.opts.container() == Container::Mp4 {
        args.extend(owned(&FASTSTART));
        // QuickTime wants explicit tags; unknown copied codecs stay untagged
        match plan.video_codec {
            Some(VideoCodec::H264) => args.extend(owned(&["-tag:v", "avc1"])),
            Some(VideoCodec::Hevc) => args.extend(owned(&["-tag:v", "hvc1"])),
            _ => {}
        }
    }
    if plan.need_trim {
        args.extend(owned(&DROP_CHAPTERS));
    }
    if passthrough {
        args.extend(owned(&PASSTHROUGH));
    }
    args
}
