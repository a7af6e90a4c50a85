//! Video stream arguments: copy, or encode to the planned bitrate

use crate::domain::model::Encoder;
use crate::error::{ClipperError, ClipperResult};
use crate::planner::plan::{ClipPlan, Tonemapper};
use crate::planner::BitrateBudget;

use super::{map_first, owned, subs, CommandContext};

pub const TONEMAP_ZSCALE: &str =
    "zscale=t=linear:npl=100,tonemap=tonemap=hable,zscale=t=bt709:m=bt709:r=tv";
pub const TONEMAP_LIBPLACEBO: &str =
    "libplacebo=tonemapping=bt.2446a:colorspace=bt709:color_trc=bt709:color_primaries=bt709";
/// Pixel format for broad player compatibility
pub const PIX_FMT: [&str; 2] = ["-pix_fmt", "yuv420p"];
/// Stats base name used when a two-pass command is built without one
pub const DEFAULT_STATS_ID: &str = "ffclipper";

const NVENC_QUALITY: [&str; 18] = [
    "-preset",
    "p6",
    "-tune:v",
    "hq",
    "-rc:v",
    "vbr",
    "-multipass",
    "fullres",
    "-rc-lookahead",
    "20",
    "-spatial-aq",
    "1",
    "-temporal-aq",
    "1",
    "-aq-strength",
    "8",
    "-b_ref_mode",
    "middle",
];

/// Quality flags specific to `encoder`
pub fn encoder_flags(encoder: Encoder) -> Vec<String> {
    match encoder {
        Encoder::X264 => owned(&["-preset", "slow", "-profile:v", "high"]),
        Encoder::X265 => owned(&["-preset", "slow"]),
        Encoder::H264Nvenc => {
            let mut flags = owned(&NVENC_QUALITY);
            flags.extend(owned(&["-profile:v", "high"]));
            flags
        }
        Encoder::HevcNvenc => {
            let mut flags = owned(&NVENC_QUALITY);
            flags.extend(owned(&["-profile:v", "main"]));
            flags
        }
        Encoder::SvtAv1 | Encoder::Auto => Vec::new(),
    }
}

pub fn tonemap_filter(mapper: Tonemapper) -> &'static str {
    match mapper {
        Tonemapper::Zscale => TONEMAP_ZSCALE,
        Tonemapper::Libplacebo => TONEMAP_LIBPLACEBO,
    }
}

/// Filter chain: tonemap, then subtitle burn, then scaling
pub fn filters(plan: &ClipPlan, ctx: &CommandContext<'_>) -> ClipperResult<Vec<String>> {
    let mut filters = Vec::new();
    if let Some(mapper) = plan.tonemap {
        filters.push(tonemap_filter(mapper).to_string());
    }
    if plan.burn_subtitles.is_some() {
        filters.push(subs::burn_filter(plan, ctx.burn_file)?);
    }
    if let Some(height) = plan.opts.video.resolution.and_then(|r| r.height()) {
        filters.push(format!("scale=-2:{}", height));
    }
    Ok(filters)
}

pub fn args(plan: &ClipPlan, ctx: &CommandContext<'_>) -> ClipperResult<Vec<String>> {
    match plan.encoder() {
        None => Ok(copy()),
        Some(encoder) => encode(plan, encoder, ctx),
    }
}

pub fn copy() -> Vec<String> {
    let mut args = map_first('v');
    args.extend(owned(&["-c:v", "copy"]));
    args
}

pub fn encode(
    plan: &ClipPlan,
    encoder: Encoder,
    ctx: &CommandContext<'_>,
) -> ClipperResult<Vec<String>> {
    let budget: BitrateBudget = plan.video_budget.ok_or_else(|| {
        ClipperError::options("video bitrate budget missing from an encoding plan")
    })?;

    let mut args = map_first('v');
    args.extend([
        "-c:v".to_string(),
        encoder.ffmpeg_name().to_string(),
        "-b:v".to_string(),
        format!("{}k", budget.kbps),
    ]);
    // x265 takes its VBV limits through -x265-params
    if encoder != Encoder::X265 {
        args.extend([
            "-maxrate".to_string(),
            format!("{}k", budget.maxrate_kbps),
            "-bufsize".to_string(),
            format!("{}k", budget.bufsize_kbps),
        ]);
    }
    args.extend(encoder_flags(encoder));
    args.extend(owned(&PIX_FMT));

    if encoder.is_two_pass() {
        let pass = ctx.pass.unwrap_or(2);
        let stats_id = ctx.stats_id.unwrap_or(DEFAULT_STATS_ID);
        if encoder == Encoder::X264 {
            args.extend([
                "-pass".to_string(),
                pass.to_string(),
                "-passlogfile".to_string(),
                format!("{}.x264", stats_id),
            ]);
        } else {
            args.extend([
                "-x265-params".to_string(),
                format!(
                    "pass={}:stats={}.x265:vbv-maxrate={}:vbv-bufsize={}",
                    pass, stats_id, budget.maxrate_kbps, budget.bufsize_kbps
                ),
            ]);
        }
    }

    let filters = filters(plan, ctx)?;
    if !filters.is_empty() {
        args.extend(["-vf".to_string(), filters.join(",")]);
    }
    Ok(args)
}
