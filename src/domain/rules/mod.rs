// Domain rules - Option validation and default resolution

use std::path::Path;

use tracing::debug;

use crate::domain::model::*;
use crate::domain::options::*;
use crate::error::{ClipperError, ClipperResult};

/// Business rules applied to raw clip options
pub struct OptionRules;

impl OptionRules {
    /// Validate `opts` and fill in every default the planner relies on
    pub fn resolve(mut opts: ClipOptions) -> ClipperResult<ClipOptions> {
        Self::validate_source(&mut opts)?;
        Self::infer_container_from_output(&mut opts)?;
        Self::resolve_subtitles(&mut opts)?;
        Self::validate_time(&opts)?;
        Self::validate_stream_copy_constraints(&mut opts)?;
        Self::validate_audio_constraints(&opts)?;
        Self::apply_encoding_defaults(&mut opts)?;
        Self::validate_codec_against_container(&opts)?;
        Self::validate_output_matches_container(&opts)?;

        debug!(?opts, "Resolved clip options");
        Ok(opts)
    }

    /// Local sources must exist and are made absolute; URLs pass through
    fn validate_source(opts: &mut ClipOptions) -> ClipperResult<()> {
        if opts.is_url_source() {
            return Ok(());
        }
        let path = std::path::absolute(Path::new(&opts.source))?;
        if !path.is_file() {
            return Err(ClipperError::options(format!(
                "Input path is not a file: {}",
                path.display()
            )));
        }
        opts.source = path.to_string_lossy().into_owned();
        Ok(())
    }

    fn infer_container_from_output(opts: &mut ClipOptions) -> ClipperResult<()> {
        let Some(inferred) = opts
            .output
            .as_deref()
            .and_then(|p| p.extension())
            .and_then(|ext| Container::from_extension(&ext.to_string_lossy()))
        else {
            opts.container.get_or_insert(DEFAULT_CONTAINER);
            return Ok(());
        };

        match opts.container {
            None => opts.container = Some(inferred),
            Some(explicit) if explicit != inferred => {
                return Err(ClipperError::options(format!(
                    "Output extension '{}' conflicts with explicit container '{}'.",
                    inferred.extension(),
                    explicit
                )));
            }
            Some(_) => {}
        }
        Ok(())
    }

    fn resolve_subtitles(opts: &mut ClipOptions) -> ClipperResult<()> {
        let subs = &mut opts.subtitles;
        if subs.burn.is_none() {
            if subs.burn_method.is_some() {
                return Err(ClipperError::options("burn_method requires burn"));
            }
            if subs.delay_ms.is_some() {
                return Err(ClipperError::options("delay requires burn"));
            }
            return Ok(());
        }

        let delay = *subs.delay_ms.get_or_insert(DEFAULT_SUBTITLE_DELAY_MS);
        if delay.abs() > MAX_SUBTITLE_DELAY_MS {
            return Err(ClipperError::options(format!(
                "Subtitle delay must be within ±{} ms",
                MAX_SUBTITLE_DELAY_MS
            )));
        }
        subs.burn_method.get_or_insert(SubtitleBurnMethod::Auto);
        Ok(())
    }

    fn validate_time(opts: &ClipOptions) -> ClipperResult<()> {
        if opts.time.end.is_some() && opts.time.duration.is_some() {
            return Err(ClipperError::options(
                "Cannot specify both 'end' and 'duration'",
            ));
        }
        Ok(())
    }

    fn validate_stream_copy_constraints(opts: &mut ClipOptions) -> ClipperResult<()> {
        if !opts.video.copy {
            return Ok(());
        }
        if opts.subtitles.burn.is_some() {
            return Err(ClipperError::options(
                "Cannot burn subtitles when stream copying video",
            ));
        }
        if opts.video.resolution.is_some() {
            return Err(ClipperError::options("resolution requires video encoding"));
        }
        if opts.video.codec.is_some() {
            return Err(ClipperError::options("codec requires video encoding"));
        }
        if !matches!(opts.video.encoder, None | Some(Encoder::Auto)) {
            return Err(ClipperError::options("encoder requires video encoding"));
        }
        if opts.target_size_mb.is_some() {
            return Err(ClipperError::options("target_size requires video encoding"));
        }
        opts.video.encoder = None;
        Ok(())
    }

    fn validate_audio_constraints(opts: &ClipOptions) -> ClipperResult<()> {
        let audio = &opts.audio;
        if audio.copy {
            if audio.downmix_to_stereo == Some(true) {
                return Err(ClipperError::options(
                    "downmix_to_stereo requires audio encoding",
                ));
            }
            if audio.kbps.is_some() {
                return Err(ClipperError::options("audio bitrate requires audio encoding"));
            }
        }
        if !audio.include {
            if audio.kbps.is_some() {
                return Err(ClipperError::options("audio bitrate requires audio inclusion"));
            }
            if audio.copy {
                return Err(ClipperError::options(
                    "audio stream copy requires audio inclusion",
                ));
            }
        }
        if audio.kbps == Some(0) {
            return Err(ClipperError::options("audio bitrate must be greater than 0"));
        }
        Ok(())
    }

    fn apply_encoding_defaults(opts: &mut ClipOptions) -> ClipperResult<()> {
        if opts.video.copy {
            return Ok(());
        }

        let encoder = opts.video.encoder.unwrap_or(Encoder::Auto);
        if let Some(codec) = opts.video.codec {
            if encoder != Encoder::Auto && encoder.codec()? != codec {
                return Err(ClipperError::options(
                    "Selected encoder does not match selected codec",
                ));
            }
        } else if encoder != Encoder::Auto {
            opts.video.codec = Some(encoder.codec()?);
        } else {
            opts.video.codec = Some(DEFAULT_ENCODER.codec()?);
        }
        opts.video.encoder = Some(encoder);
        opts.video.resolution.get_or_insert(DEFAULT_RESOLUTION);

        match opts.target_size_mb {
            Some(0) => {
                return Err(ClipperError::options("target_size must be greater than 0"));
            }
            Some(_) => {}
            None => opts.target_size_mb = Some(DEFAULT_TARGET_SIZE_MB),
        }

        if opts.audio.include && !opts.audio.copy {
            opts.audio.kbps.get_or_insert(DEFAULT_AUDIO_KBPS);
            opts.audio.downmix_to_stereo.get_or_insert(true);
        }
        Ok(())
    }

    fn validate_codec_against_container(opts: &ClipOptions) -> ClipperResult<()> {
        let container = opts.container();
        let compat = container.compatibility();

        if !opts.video.copy {
            let codec = opts.video.codec.unwrap_or(VideoCodec::H264);
            if !compat.video_codecs.contains(&codec) {
                return Err(ClipperError::options(format!(
                    "Video codec '{}' not supported in {} container",
                    codec, container
                )));
            }
        }

        if opts.audio.include && !opts.audio.copy {
            let audio_codec = container.encoded_audio_codec();
            if !compat.audio_codecs.contains(&audio_codec) {
                return Err(ClipperError::options(format!(
                    "{} audio not supported in {} container",
                    audio_codec.as_str().to_uppercase(),
                    container
                )));
            }
        }
        Ok(())
    }

    fn validate_output_matches_container(opts: &ClipOptions) -> ClipperResult<()> {
        let Some(ext) = opts.output.as_deref().and_then(|p| p.extension()) else {
            return Ok(());
        };
        let suffix = format!(".{}", ext.to_string_lossy().to_lowercase());
        let container = opts.container();
        if suffix != container.extension() {
            return Err(ClipperError::options(format!(
                "Output extension '{}' does not match selected container '{}'.",
                suffix, container
            )));
        }
        Ok(())
    }
}

/// Compute `(start_ms, duration_ms)` for the clip
///
/// An explicit duration wins, then `end - start`, then the remainder of the
/// source after `start`, then the whole source.
pub fn compute_time_bounds(
    time: &TimeOptions,
    source_duration_s: f64,
) -> ClipperResult<(u64, u64)> {
    let start_ms = time.start.map(|t| t.millis).unwrap_or(0);

    let duration_ms: i64 = if let Some(duration) = time.duration {
        duration.millis as i64
    } else if let Some(end) = time.end {
        end.millis as i64 - start_ms as i64
    } else if time.start.is_some() {
        ((source_duration_s - start_ms as f64 / 1000.0) * 1000.0) as i64
    } else {
        (source_duration_s * 1000.0) as i64
    };

    if duration_ms <= 0 {
        return Err(ClipperError::InvalidTimeRange {
            message: "Computed duration must be greater than 0".to_string(),
        });
    }
    Ok((start_ms, duration_ms as u64))
}
