//! Probe-backed clip plan resolved from user options

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use super::{resolve_copy_bounds, BitrateBudget, TrimBounds};
use crate::domain::model::*;
use crate::domain::options::{is_url, ClipOptions};
use crate::domain::rules::{compute_time_bounds, OptionRules};
use crate::error::{ClipperError, ClipperResult};
use crate::probe::{best_encoder_for, ffprobe_keyframe_probe, Capabilities, FfprobeClient};
use crate::utils::path::file_stem;

/// Suffix appended to derived output file stems
pub const CLIP_SUFFIX: &str = "_clip";
/// Largest clip/source duration ratio at which `auto` burn extracts subtitles
pub const AUTO_EXTRACT_RATIO_THRESHOLD: f64 = 0.25;

/// HDR to SDR conversion filter family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tonemapper {
    Zscale,
    /// Needs a Vulkan device
    Libplacebo,
}

/// Everything the command builders need, resolved once
#[derive(Debug, Clone, Serialize)]
pub struct ClipPlan {
    /// Validated options with a concrete encoder when encoding
    pub opts: ClipOptions,
    pub output_path: PathBuf,
    pub start_ms: u64,
    /// `None` when no trimming was requested
    pub duration_ms: Option<u64>,
    pub source_duration_s: f64,
    pub need_trim: bool,
    /// Length of the produced clip in seconds
    pub effective_seconds: f64,
    /// Subtitle stream index to burn, only when burning
    pub burn_subtitles: Option<u32>,
    pub copy_subtitles: bool,
    pub subtitle_delay_ms: Option<i32>,
    /// Never `Auto` once planned
    pub subtitle_burn_method: Option<SubtitleBurnMethod>,
    pub tonemap: Option<Tonemapper>,
    /// Output video codec; `None` when a copied stream is not modeled
    pub video_codec: Option<VideoCodec>,
    pub audio_codec: Option<AudioCodec>,
    /// Audio bitrate counted against the target size
    pub audio_budget_kbps: u32,
    pub video_budget: Option<BitrateBudget>,
    /// Keyframe-snapped window for keyframe copy trimming
    pub copy_bounds: Option<TrimBounds>,
}

impl ClipPlan {
    /// Validate `opts` and resolve them against the source and local tools
    pub fn from_options(
        opts: ClipOptions,
        probe: &FfprobeClient,
        caps: &Capabilities,
    ) -> ClipperResult<Self> {
        let mut opts = OptionRules::resolve(opts)?;
        ensure_tools(&mut opts, probe, caps)?;

        let source = opts.source.clone();
        let source_duration_s =
            probe
                .duration_s(&source)
                .ok_or_else(|| ClipperError::ProbeError {
                    message: format!("Could not read video duration from: {}", source),
                })?;

        let (start_ms, duration_ms) = compute_time_bounds(&opts.time, source_duration_s)?;
        let need_trim = opts.time.is_set();
        let duration_ms = need_trim.then_some(duration_ms);
        let effective_seconds = duration_ms
            .map(|ms| ms as f64 / 1000.0)
            .unwrap_or(source_duration_s);

        let output_path = derive_output_path(&source, opts.output.as_deref(), opts.container())?;
        let (video_codec, audio_codec) = output_codecs(&opts, probe)?;

        let burn_subtitles = if opts.should_burn_subtitles() {
            opts.subtitles.burn
        } else {
            None
        };
        let (subtitle_burn_method, subtitle_delay_ms) = match burn_subtitles {
            Some(_) => {
                let method = match opts.subtitles.burn_method {
                    None | Some(SubtitleBurnMethod::Auto) => {
                        auto_burn_method(effective_seconds, source_duration_s)
                    }
                    Some(explicit) => explicit,
                };
                (Some(method), Some(opts.subtitles.delay_ms.unwrap_or(0)))
            }
            None => (None, None),
        };

        let tonemap = tonemapper(&opts, probe, caps)?;
        let audio_budget_kbps = audio_budget_kbps(&opts, probe);

        let video_budget = match (opts.video.copy, opts.video.encoder) {
            (false, Some(encoder)) => Some(BitrateBudget::for_encoder(
                opts.target_size_mb.unwrap_or_default(),
                effective_seconds,
                audio_budget_kbps,
                encoder,
            )?),
            _ => None,
        };

        let copies_stream = opts.video.copy || opts.audio.copy;
        let copy_bounds = match duration_ms {
            Some(ms) if copies_stream && opts.runtime.copy_trim == CopyTrim::Keyframe => {
                let start_s = start_ms as f64 / 1000.0;
                let end_s = start_s + ms as f64 / 1000.0;
                let bounds =
                    resolve_copy_bounds(&ffprobe_keyframe_probe(probe), &source, start_s, end_s);
                if opts.runtime.verbosity >= Verbosity::Commands {
                    info!("Original request: {:.3}s to {:.3}s", start_s, end_s);
                    info!(
                        "Snapped to keyframes: {:.3}s to {:.3}s",
                        bounds.start_s, bounds.end_s
                    );
                }
                Some(bounds)
            }
            _ => None,
        };

        let copy_subtitles = opts.should_copy_subtitles();
        let plan = Self {
            opts,
            output_path,
            start_ms,
            duration_ms,
            source_duration_s,
            need_trim,
            effective_seconds,
            burn_subtitles,
            copy_subtitles,
            subtitle_delay_ms,
            subtitle_burn_method,
            tonemap,
            video_codec,
            audio_codec,
            audio_budget_kbps,
            video_budget,
            copy_bounds,
        };
        debug!(?plan, "Clip plan ready");
        Ok(plan)
    }

    /// Concrete encoder, `None` when the video stream is copied
    pub fn encoder(&self) -> Option<Encoder> {
        if self.opts.video.copy {
            None
        } else {
            self.opts.video.encoder.filter(|e| *e != Encoder::Auto)
        }
    }

    /// Whether this plan runs an analysis pass before the real encode
    pub fn is_two_pass(&self) -> bool {
        self.encoder().is_some_and(|e| e.is_two_pass())
    }

    /// Whether any stream is copied without re-encoding
    pub fn copies_stream(&self) -> bool {
        self.opts.video.copy || self.opts.audio.copy
    }
}

fn ensure_tools(
    opts: &mut ClipOptions,
    probe: &FfprobeClient,
    caps: &Capabilities,
) -> ClipperResult<()> {
    let ffmpeg = caps.ffmpeg_version()?;
    let ffprobe = probe.version()?;
    debug!(%ffmpeg, %ffprobe, "Tool versions");

    if opts.video.copy {
        return Ok(());
    }
    let available = caps.available_encoders();
    let encoder = match opts.video.encoder.unwrap_or(Encoder::Auto) {
        Encoder::Auto => {
            let codec = opts
                .video
                .codec
                .ok_or_else(|| ClipperError::options("codec not set"))?;
            best_encoder_for(codec, &available)?
        }
        explicit if available.contains(&explicit) => explicit,
        explicit => {
            return Err(ClipperError::EncoderUnavailable {
                encoder: explicit.to_string(),
            })
        }
    };
    info!(%encoder, "Selected video encoder");
    opts.video.encoder = Some(encoder);
    opts.video.codec.get_or_insert(encoder.codec()?);
    Ok(())
}

/// Codecs written to the output; copied streams report what the source carries
fn output_codecs(
    opts: &ClipOptions,
    probe: &FfprobeClient,
) -> ClipperResult<(Option<VideoCodec>, Option<AudioCodec>)> {
    let video = if opts.video.copy {
        probe
            .video_codec(&opts.source)
            .and_then(|name| VideoCodec::from_probe(&name))
    } else {
        let encoder = opts
            .video
            .encoder
            .ok_or_else(|| ClipperError::options("encoder not set"))?;
        Some(encoder.codec()?)
    };

    let audio = match (opts.audio.include, opts.audio.copy) {
        (false, _) => None,
        (true, true) => probe
            .audio_codec(&opts.source)
            .and_then(|name| AudioCodec::from_probe(&name)),
        (true, false) => Some(opts.container().encoded_audio_codec()),
    };
    Ok((video, audio))
}

fn auto_burn_method(effective_seconds: f64, source_duration_s: f64) -> SubtitleBurnMethod {
    let ratio = if source_duration_s > 0.0 {
        effective_seconds / source_duration_s
    } else {
        1.0
    };
    if ratio <= AUTO_EXTRACT_RATIO_THRESHOLD {
        SubtitleBurnMethod::Extract
    } else {
        SubtitleBurnMethod::Inline
    }
}

fn tonemapper(
    opts: &ClipOptions,
    probe: &FfprobeClient,
    caps: &Capabilities,
) -> ClipperResult<Option<Tonemapper>> {
    let Some(encoder) = opts.video.encoder.filter(|_| !opts.video.copy) else {
        return Ok(None);
    };
    if encoder.codec()?.supports_hdr() {
        return Ok(None);
    }
    let hdr = probe
        .color_info(&opts.source)
        .is_some_and(|info| info.is_hdr());
    if !hdr {
        return Ok(None);
    }
    let mapper = if caps.has_libplacebo() {
        Tonemapper::Libplacebo
    } else {
        Tonemapper::Zscale
    };
    info!(?mapper, "HDR source will be tonemapped");
    Ok(Some(mapper))
}

fn audio_budget_kbps(opts: &ClipOptions, probe: &FfprobeClient) -> u32 {
    if !opts.audio.include {
        return 0;
    }
    if opts.audio.copy {
        return probe.audio_bitrate_kbps(&opts.source).unwrap_or(0);
    }
    opts.audio.kbps.unwrap_or(0)
}

/// Output location for a clip of `source`
///
/// An explicit output gains the container extension when it has none.
/// Otherwise the clip is `<stem>_clip.<ext>` beside a local source, or in the
/// working directory for an http(s) source.
pub fn derive_output_path(
    source: &str,
    output: Option<&Path>,
    container: Container,
) -> ClipperResult<PathBuf> {
    if let Some(output) = output {
        let mut path = output.to_path_buf();
        if path.extension().is_none() {
            path.set_extension(container.as_str());
        }
        return Ok(std::path::absolute(path)?);
    }

    if is_url(source) {
        let name = url_file_name(source).ok_or_else(|| ClipperError::OutputError {
            message: "Cannot derive output filename from URL; please provide --output"
                .to_string(),
        })?;
        let stem = file_stem(Path::new(&name));
        return Ok(std::env::current_dir()?.join(clip_file_name(&stem, container)));
    }

    let src = Path::new(source);
    let parent = src.parent().unwrap_or_else(|| Path::new(""));
    let path = parent.join(clip_file_name(&file_stem(src), container));
    Ok(std::path::absolute(path)?)
}

fn clip_file_name(stem: &str, container: Container) -> String {
    format!("{}{}{}", stem, CLIP_SUFFIX, container.extension())
}

/// Last path segment of an http(s) URL, without query or fragment
fn url_file_name(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    let name = url.path_segments()?.last()?;
    (!name.is_empty()).then(|| name.to_string())
}
