//! User-facing clip options, before and after default resolution

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::model::*;

/// Default audio bitrate when encoding audio, in kbps
pub const DEFAULT_AUDIO_KBPS: u32 = 128;
/// Default target size when encoding video, in MiB
pub const DEFAULT_TARGET_SIZE_MB: u64 = 10;
pub const DEFAULT_RESOLUTION: Resolution = Resolution::Original;
pub const DEFAULT_ENCODER: Encoder = Encoder::X264;
pub const DEFAULT_SUBTITLE_DELAY_MS: i32 = 0;
pub const DEFAULT_CONTAINER: Container = Container::Mp4;
/// Subtitle delay bound in either direction, in milliseconds
pub const MAX_SUBTITLE_DELAY_MS: i32 = 10_000;

/// Options for the clip operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipOptions {
    /// Path or http(s) URL of the source video
    pub source: String,
    /// Output file path, derived from the source when absent
    pub output: Option<PathBuf>,
    /// Output container, inferred from the output extension when absent
    pub container: Option<Container>,
    /// Approximate target file size in MiB when encoding
    pub target_size_mb: Option<u64>,
    pub time: TimeOptions,
    pub audio: AudioOptions,
    pub video: VideoOptions,
    pub subtitles: SubtitlesOptions,
    pub runtime: RuntimeOptions,
}

impl ClipOptions {
    /// Options for `source` with every other field at its default
    pub fn for_source(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            output: None,
            container: None,
            target_size_mb: None,
            time: TimeOptions::default(),
            audio: AudioOptions::default(),
            video: VideoOptions::default(),
            subtitles: SubtitlesOptions::default(),
            runtime: RuntimeOptions::default(),
        }
    }

    /// Container after resolution, falling back to the default
    pub fn container(&self) -> Container {
        self.container.unwrap_or(DEFAULT_CONTAINER)
    }

    /// Whether subtitles get burned into the picture
    pub fn should_burn_subtitles(&self) -> bool {
        self.subtitles.burn.is_some() && !self.video.copy
    }

    /// Whether subtitle streams are copied into the output
    pub fn should_copy_subtitles(&self) -> bool {
        self.subtitles.include && self.supports_subtitle_copying()
    }

    pub fn supports_subtitle_copying(&self) -> bool {
        !self.container().compatibility().subtitle_codecs.is_empty()
    }

    pub fn is_url_source(&self) -> bool {
        is_url(&self.source)
    }
}

/// Whether `source` names an http(s) resource
pub fn is_url(source: &str) -> bool {
    Url::parse(source)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Options related to time selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeOptions {
    pub start: Option<TimeSpec>,
    pub end: Option<TimeSpec>,
    pub duration: Option<TimeSpec>,
}

impl TimeOptions {
    pub fn is_set(&self) -> bool {
        self.start.is_some() || self.end.is_some() || self.duration.is_some()
    }
}

/// Options for audio handling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioOptions {
    /// Include an audio track in the output
    pub include: bool,
    /// Copy the audio stream without re-encoding
    pub copy: bool,
    /// Downmix to stereo when encoding; resolves to `true` when unset
    pub downmix_to_stereo: Option<bool>,
    /// Audio bitrate when encoding, in kbps
    pub kbps: Option<u32>,
}

impl Default for AudioOptions {
    fn default() -> Self {
        Self {
            include: true,
            copy: false,
            downmix_to_stereo: None,
            kbps: None,
        }
    }
}

/// Options for video encoding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoOptions {
    /// Copy the video stream without re-encoding
    pub copy: bool,
    pub codec: Option<VideoCodec>,
    /// `None` once resolution has cleared it for stream copy
    pub encoder: Option<Encoder>,
    pub resolution: Option<Resolution>,
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            copy: false,
            codec: None,
            encoder: Some(Encoder::Auto),
            resolution: None,
        }
    }
}

/// Options related to subtitles
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubtitlesOptions {
    /// Include subtitle tracks when the container supports them
    pub include: bool,
    /// Subtitle stream index to burn into the video
    pub burn: Option<u32>,
    pub burn_method: Option<SubtitleBurnMethod>,
    /// Delay applied when burning, in milliseconds
    pub delay_ms: Option<i32>,
}

/// Runtime behavior options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeOptions {
    pub verbosity: Verbosity,
    /// Print ffmpeg commands without executing them
    pub dry_run: bool,
    /// Reveal the output in the file manager when done
    pub open_dir: bool,
    pub copy_trim: CopyTrim,
}
