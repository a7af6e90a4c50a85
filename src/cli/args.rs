//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;
use clap_num::number_range;

use crate::config::ClipperConfig;
use crate::domain::model::*;
use crate::domain::options::*;

fn target_size_mb(s: &str) -> Result<u64, String> {
    number_range(s, 1, 1_000_000)
}

fn audio_kbps(s: &str) -> Result<u32, String> {
    number_range(s, 1, 1_536)
}

fn subtitle_delay_ms(s: &str) -> Result<i32, String> {
    number_range(s, -MAX_SUBTITLE_DELAY_MS, MAX_SUBTITLE_DELAY_MS)
}

fn reserve(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|_| format!("'{}' is not a number", s))?;
    if value > 0.0 && value <= 1.0 {
        Ok(value)
    } else {
        Err("reserve factor must be in (0, 1]".to_string())
    }
}

/// Arguments for the clip command
#[derive(Args, Debug)]
pub struct ClipArgs {
    /// Source video path or http(s) URL
    pub source: String,

    /// Output file path (default: <source>_clip.<container>)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Start time (seconds, 1m20s, MM:SS(.ms) or HH:MM:SS(.ms))
    #[arg(short, long)]
    pub start: Option<TimeSpec>,

    /// End time
    #[arg(short, long, conflicts_with = "duration")]
    pub end: Option<TimeSpec>,

    /// Clip duration
    #[arg(short, long)]
    pub duration: Option<TimeSpec>,

    /// Output container (default: from the output extension, else mp4)
    #[arg(long, value_enum)]
    pub container: Option<Container>,

    /// Approximate output size in MiB when encoding
    #[arg(long, value_parser = target_size_mb)]
    pub target_size: Option<u64>,

    /// Video codec when encoding
    #[arg(long, value_enum)]
    pub codec: Option<VideoCodec>,

    /// Video encoder (auto picks the best available for the codec)
    #[arg(long, value_enum)]
    pub encoder: Option<Encoder>,

    /// Output height
    #[arg(long, value_enum)]
    pub resolution: Option<Resolution>,

    /// Copy the video stream instead of encoding
    #[arg(long)]
    pub copy_video: bool,

    /// Copy the audio stream instead of encoding
    #[arg(long, conflicts_with = "no_audio")]
    pub copy_audio: bool,

    /// Drop audio
    #[arg(long)]
    pub no_audio: bool,

    /// Audio bitrate in kbps when encoding audio
    #[arg(long, value_parser = audio_kbps)]
    pub audio_kbps: Option<u32>,

    /// Keep the source channel layout instead of downmixing to stereo
    #[arg(long)]
    pub no_downmix: bool,

    /// Copy subtitle tracks when the container supports them
    #[arg(long)]
    pub subs: bool,

    /// Subtitle track index to burn into the picture
    #[arg(long, value_name = "TRACK")]
    pub burn_subs: Option<u32>,

    /// How burned subtitles are read
    #[arg(long, value_enum, requires = "burn_subs")]
    pub burn_method: Option<SubtitleBurnMethod>,

    /// Burned subtitle delay in milliseconds
    #[arg(long, value_parser = subtitle_delay_ms, allow_hyphen_values = true, requires = "burn_subs")]
    pub sub_delay: Option<i32>,

    /// Trimming used when a stream is copied
    #[arg(long, value_enum)]
    pub copy_trim: Option<CopyTrim>,

    /// Print the ffmpeg commands without running them
    #[arg(long)]
    pub dry_run: bool,

    /// Reveal the output in the file manager when done
    #[arg(long)]
    pub open_dir: bool,
}

impl ClipArgs {
    /// Clip options with configured defaults filling unset flags
    pub fn into_options(self, config: &ClipperConfig) -> ClipOptions {
        let mut opts = ClipOptions::for_source(self.source);

        // A configured container must not fight an explicit output extension
        let output_has_ext = self
            .output
            .as_deref()
            .is_some_and(|p| p.extension().is_some());
        opts.container = self
            .container
            .or_else(|| (!output_has_ext).then_some(config.container).flatten());
        opts.output = self.output;

        opts.time = TimeOptions {
            start: self.start,
            end: self.end,
            duration: self.duration,
        };

        opts.video.copy = self.copy_video;
        opts.video.codec = self.codec;
        opts.video.resolution = self.resolution;
        opts.video.encoder = match self.encoder {
            Some(encoder) => Some(encoder),
            None if !self.copy_video && self.codec.is_none() => {
                config.encoder.or(Some(Encoder::Auto))
            }
            None => Some(Encoder::Auto),
        };
        opts.target_size_mb = match self.target_size {
            Some(mb) => Some(mb),
            None if !self.copy_video => config.target_size_mb,
            None => None,
        };

        opts.audio.include = !self.no_audio;
        opts.audio.copy = self.copy_audio;
        opts.audio.downmix_to_stereo = self.no_downmix.then_some(false);
        opts.audio.kbps = match self.audio_kbps {
            Some(kbps) => Some(kbps),
            None if !self.no_audio && !self.copy_audio => config.audio_kbps,
            None => None,
        };

        opts.subtitles = SubtitlesOptions {
            include: self.subs,
            burn: self.burn_subs,
            burn_method: self.burn_method,
            delay_ms: self.sub_delay,
        };

        opts.runtime = RuntimeOptions {
            verbosity: config.verbosity,
            dry_run: self.dry_run,
            open_dir: self.open_dir || config.open_dir,
            copy_trim: self.copy_trim.unwrap_or(config.copy_trim),
        };
        opts
    }
}

/// Arguments for the inspect command
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Source video path or http(s) URL
    pub source: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the keyframes command
#[derive(Args, Debug)]
pub struct KeyframesArgs {
    /// Source video path or http(s) URL
    pub source: String,

    /// Requested start time
    #[arg(short, long)]
    pub start: TimeSpec,

    /// Requested end time
    #[arg(short, long)]
    pub end: TimeSpec,
}

/// Arguments for the budget command
#[derive(Args, Debug)]
pub struct BudgetArgs {
    /// Target output size in MiB
    #[arg(long, value_parser = target_size_mb)]
    pub target_size: u64,

    /// Clip duration
    #[arg(short, long)]
    pub duration: TimeSpec,

    /// Audio bitrate in kbps counted against the target (0 for no audio)
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=1536))]
    pub audio_kbps: Option<u32>,

    /// Encoder whose container overhead reserve applies
    #[arg(long, value_enum)]
    pub encoder: Option<Encoder>,

    /// Override the reserve factor, in (0, 1]
    #[arg(long, value_parser = reserve)]
    pub reserve: Option<f64>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::{Cli, Commands};

    fn clip_args(argv: &[&str]) -> ClipArgs {
        let mut full = vec!["ffclipper", "clip"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Commands::Clip(args) => args,
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_clip_flags() {
        let args = clip_args(&[
            "in.mkv",
            "-s",
            "1:30",
            "-d",
            "20s",
            "--encoder",
            "hevc-nvenc",
            "--burn-subs",
            "2",
            "--sub-delay",
            "-250",
        ]);
        assert_eq!(args.start, Some(TimeSpec::from_millis(90_000)));
        assert_eq!(args.duration, Some(TimeSpec::from_millis(20_000)));
        assert_eq!(args.encoder, Some(Encoder::HevcNvenc));
        assert_eq!(args.sub_delay, Some(-250));
    }

    #[test]
    fn test_rejects_out_of_range_and_conflicts() {
        let parse = |argv: &[&str]| {
            let mut full = vec!["ffclipper", "clip", "in.mkv"];
            full.extend_from_slice(argv);
            Cli::try_parse_from(full)
        };
        assert!(parse(&["--sub-delay", "20000", "--burn-subs", "0"]).is_err());
        assert!(parse(&["--sub-delay", "100"]).is_err());
        assert!(parse(&["-e", "10", "-d", "5"]).is_err());
        assert!(parse(&["--target-size", "0"]).is_err());
        assert!(parse(&["-s", "soon"]).is_err());
    }

    #[test]
    fn test_config_fills_unset_flags() {
        let config = ClipperConfig {
            container: Some(Container::Mkv),
            encoder: Some(Encoder::X265),
            target_size_mb: Some(25),
            audio_kbps: Some(96),
            copy_trim: CopyTrim::Fast,
            ..Default::default()
        };

        let opts = clip_args(&["in.mkv"]).into_options(&config);
        assert_eq!(opts.container, Some(Container::Mkv));
        assert_eq!(opts.video.encoder, Some(Encoder::X265));
        assert_eq!(opts.target_size_mb, Some(25));
        assert_eq!(opts.audio.kbps, Some(96));
        assert_eq!(opts.runtime.copy_trim, CopyTrim::Fast);

        let opts = clip_args(&["in.mkv", "-o", "out.webm", "--target-size", "5", "--copy-audio"])
            .into_options(&config);
        assert_eq!(opts.container, None);
        assert_eq!(opts.target_size_mb, Some(5));
        assert_eq!(opts.audio.kbps, None);

        let opts = clip_args(&["in.mkv", "--copy-video", "--codec", "h264"]).into_options(&config);
        assert_eq!(opts.video.encoder, Some(Encoder::Auto));
        assert_eq!(opts.target_size_mb, None);
    }
}
