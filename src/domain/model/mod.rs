// Domain models - Codecs, containers, encoders and time values

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{ClipperError, ClipperResult};

/// Video codec options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    H264,
    Hevc,
    Av1,
    Vp9,
    Mpeg4,
}

impl VideoCodec {
    /// Name as reported by ffprobe
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoCodec::H264 => "h264",
            VideoCodec::Hevc => "hevc",
            VideoCodec::Av1 => "av1",
            VideoCodec::Vp9 => "vp9",
            VideoCodec::Mpeg4 => "mpeg4",
        }
    }

    /// Whether this codec can carry HDR content
    pub fn supports_hdr(&self) -> bool {
        matches!(self, VideoCodec::Hevc | VideoCodec::Av1 | VideoCodec::Vp9)
    }

    /// Map a probed codec name, `None` for codecs we do not model
    pub fn from_probe(name: &str) -> Option<Self> {
        match name {
            "h264" => Some(VideoCodec::H264),
            "hevc" | "h265" => Some(VideoCodec::Hevc),
            "av1" => Some(VideoCodec::Av1),
            "vp9" => Some(VideoCodec::Vp9),
            "mpeg4" => Some(VideoCodec::Mpeg4),
            _ => None,
        }
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audio codec options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    Aac,
    Mp3,
    Ac3,
    Eac3,
    Dts,
    Flac,
    Opus,
    Vorbis,
}

impl AudioCodec {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioCodec::Aac => "aac",
            AudioCodec::Mp3 => "mp3",
            AudioCodec::Ac3 => "ac3",
            AudioCodec::Eac3 => "eac3",
            AudioCodec::Dts => "dts",
            AudioCodec::Flac => "flac",
            AudioCodec::Opus => "opus",
            AudioCodec::Vorbis => "vorbis",
        }
    }

    /// Map a probed codec name, `None` for codecs we do not model
    pub fn from_probe(name: &str) -> Option<Self> {
        match name {
            "aac" => Some(AudioCodec::Aac),
            "mp3" => Some(AudioCodec::Mp3),
            "ac3" => Some(AudioCodec::Ac3),
            "eac3" => Some(AudioCodec::Eac3),
            "dts" => Some(AudioCodec::Dts),
            "flac" => Some(AudioCodec::Flac),
            "opus" => Some(AudioCodec::Opus),
            "vorbis" => Some(AudioCodec::Vorbis),
            _ => None,
        }
    }
}

impl fmt::Display for AudioCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subtitle codec options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtitleCodec {
    Srt,
    Ass,
    Ssa,
    Pgs,
    Vobsub,
    MovText,
}

/// Strategies for burning subtitles into the video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleBurnMethod {
    /// Extract when the clip is short relative to the source, otherwise inline
    Auto,
    /// Pre-extract the clip's cues to a temporary file
    Extract,
    /// Read cues straight from the source stream
    Inline,
}

/// Color transfer characteristics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorTransfer {
    #[serde(rename = "smpte2084")]
    Pq,
    #[serde(rename = "arib-std-b67")]
    Hlg,
}

impl ColorTransfer {
    pub fn from_probe(name: &str) -> Option<Self> {
        match name {
            "smpte2084" => Some(ColorTransfer::Pq),
            "arib-std-b67" => Some(ColorTransfer::Hlg),
            _ => None,
        }
    }

    /// Whether this transfer represents HDR content
    pub fn is_hdr(&self) -> bool {
        matches!(self, ColorTransfer::Pq | ColorTransfer::Hlg)
    }
}

/// Supported video encoders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Encoder {
    Auto,
    X264,
    X265,
    H264Nvenc,
    HevcNvenc,
    SvtAv1,
}

impl Encoder {
    /// Every concrete encoder, in declaration order
    pub const CONCRETE: [Encoder; 5] = [
        Encoder::X264,
        Encoder::X265,
        Encoder::H264Nvenc,
        Encoder::HevcNvenc,
        Encoder::SvtAv1,
    ];

    /// FFmpeg encoder name
    pub fn ffmpeg_name(&self) -> &'static str {
        match self {
            Encoder::Auto => "auto",
            Encoder::X264 => "libx264",
            Encoder::X265 => "libx265",
            Encoder::H264Nvenc => "h264_nvenc",
            Encoder::HevcNvenc => "hevc_nvenc",
            Encoder::SvtAv1 => "libsvtav1",
        }
    }

    /// Video codec produced by this encoder
    pub fn codec(&self) -> ClipperResult<VideoCodec> {
        match self {
            Encoder::Auto => Err(ClipperError::options("AUTO encoder has no codec")),
            Encoder::X264 | Encoder::H264Nvenc => Ok(VideoCodec::H264),
            Encoder::X265 | Encoder::HevcNvenc => Ok(VideoCodec::Hevc),
            Encoder::SvtAv1 => Ok(VideoCodec::Av1),
        }
    }

    /// Encoders that run a two-pass encode
    pub fn is_two_pass(&self) -> bool {
        matches!(self, Encoder::X264 | Encoder::X265)
    }

    pub fn is_nvenc(&self) -> bool {
        matches!(self, Encoder::H264Nvenc | Encoder::HevcNvenc)
    }
}

impl fmt::Display for Encoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Encoder::Auto => "auto",
            Encoder::X264 => "x264",
            Encoder::X265 => "x265",
            Encoder::H264Nvenc => "h264-nvenc",
            Encoder::HevcNvenc => "hevc-nvenc",
            Encoder::SvtAv1 => "svt-av1",
        };
        f.write_str(name)
    }
}

/// Output video resolutions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum Resolution {
    #[serde(rename = "original")]
    #[value(name = "original")]
    Original,
    #[serde(rename = "2160p")]
    #[value(name = "2160p")]
    P2160,
    #[serde(rename = "1440p")]
    #[value(name = "1440p")]
    P1440,
    #[serde(rename = "1080p")]
    #[value(name = "1080p")]
    P1080,
    #[serde(rename = "720p")]
    #[value(name = "720p")]
    P720,
    #[serde(rename = "480p")]
    #[value(name = "480p")]
    P480,
}

impl Resolution {
    /// Vertical resolution in pixels, `None` keeps the source height
    pub fn height(&self) -> Option<u32> {
        match self {
            Resolution::Original => None,
            Resolution::P2160 => Some(2160),
            Resolution::P1440 => Some(1440),
            Resolution::P1080 => Some(1080),
            Resolution::P720 => Some(720),
            Resolution::P480 => Some(480),
        }
    }
}

/// Supported output container formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    Mp4,
    Mkv,
    Webm,
}

impl Container {
    pub fn as_str(&self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
            Container::Mkv => "mkv",
            Container::Webm => "webm",
        }
    }

    /// Canonical filename extension, including the dot
    pub fn extension(&self) -> String {
        format!(".{}", self.as_str())
    }

    /// Resolve a container from a file extension (without the dot)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "mp4" => Some(Container::Mp4),
            "mkv" => Some(Container::Mkv),
            "webm" => Some(Container::Webm),
            _ => None,
        }
    }

    /// Codecs this container can carry
    pub fn compatibility(&self) -> ContainerCompatibility {
        use AudioCodec as A;
        use SubtitleCodec as S;
        use VideoCodec as V;
        match self {
            Container::Mkv => ContainerCompatibility::new(
                &[V::H264, V::Hevc, V::Av1, V::Vp9, V::Mpeg4],
                &[A::Aac, A::Mp3, A::Ac3, A::Eac3, A::Dts, A::Flac, A::Opus, A::Vorbis],
                &[S::Srt, S::Ass, S::Ssa, S::Pgs, S::Vobsub],
            ),
            Container::Mp4 => ContainerCompatibility::new(
                &[V::H264, V::Hevc, V::Av1],
                &[A::Aac, A::Mp3, A::Ac3],
                &[S::MovText],
            ),
            Container::Webm => {
                ContainerCompatibility::new(&[V::Vp9, V::Av1], &[A::Opus, A::Vorbis], &[])
            }
        }
    }

    /// Audio codec used when encoding audio for this container
    pub fn encoded_audio_codec(&self) -> AudioCodec {
        match self {
            Container::Webm => AudioCodec::Opus,
            _ => AudioCodec::Aac,
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capabilities supported by an output container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerCompatibility {
    pub video_codecs: HashSet<VideoCodec>,
    pub audio_codecs: HashSet<AudioCodec>,
    pub subtitle_codecs: HashSet<SubtitleCodec>,
}

impl ContainerCompatibility {
    fn new(video: &[VideoCodec], audio: &[AudioCodec], subs: &[SubtitleCodec]) -> Self {
        Self {
            video_codecs: video.iter().copied().collect(),
            audio_codecs: audio.iter().copied().collect(),
            subtitle_codecs: subs.iter().copied().collect(),
        }
    }
}

/// How much of the tool chatter reaches the user
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    #[default]
    Quiet,
    /// Show ffmpeg/ffprobe command lines
    Commands,
    /// Also stream ffmpeg output
    Output,
}

/// Trimming strategy used when any stream is copied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CopyTrim {
    /// Snap the window to probed keyframes
    #[default]
    Keyframe,
    /// Input seek without keyframe probing
    Fast,
}

/// Time specification with millisecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeSpec {
    pub millis: u64,
}

impl TimeSpec {
    /// Create a new TimeSpec from milliseconds
    pub fn from_millis(millis: u64) -> Self {
        Self { millis }
    }

    /// Create a new TimeSpec from seconds, rounded to the nearest millisecond
    pub fn from_seconds(seconds: f64) -> Self {
        Self {
            millis: (seconds.max(0.0) * 1000.0).round() as u64,
        }
    }

    pub fn as_seconds(&self) -> f64 {
        self.millis as f64 / 1000.0
    }

    /// Parse a timespan such as `90`, `90.5s`, `1m20s`, `01:30` or `00:01:30.250`
    pub fn parse(time_str: &str) -> ClipperResult<Self> {
        let trimmed = time_str.trim();
        let invalid = || ClipperError::InvalidTimeFormat {
            time: time_str.to_string(),
        };

        if trimmed.is_empty() || trimmed.starts_with('-') {
            return Err(invalid());
        }

        if let Ok(seconds) = trimmed.parse::<f64>() {
            if !seconds.is_finite() {
                return Err(invalid());
            }
            return Ok(Self::from_seconds(seconds));
        }

        let seconds = if trimmed.contains(':') {
            parse_clock(trimmed).ok_or_else(invalid)?
        } else {
            parse_units(trimmed).ok_or_else(invalid)?
        };
        Ok(Self::from_seconds(seconds))
    }
}

impl FromStr for TimeSpec {
    type Err = ClipperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// Serialized in the same text form the CLI accepts
impl Serialize for TimeSpec {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeSpec {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_secs = self.millis / 1000;
        let ms = self.millis % 1000;
        let hours = total_secs / 3600;
        let minutes = (total_secs % 3600) / 60;
        let secs = total_secs % 60;
        if hours > 0 {
            write!(f, "{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, ms)
        } else {
            write!(f, "{:02}:{:02}.{:03}", minutes, secs, ms)
        }
    }
}

/// `[HH:]MM:SS[.fff]`
fn parse_clock(s: &str) -> Option<f64> {
    let parts: Vec<&str> = s.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [m, s] => (0u64, m.parse::<u64>().ok()?, s.parse::<f64>().ok()?),
        [h, m, s] => {
            let minutes = m.parse::<u64>().ok()?;
            if minutes >= 60 {
                return None;
            }
            (h.parse::<u64>().ok()?, minutes, s.parse::<f64>().ok()?)
        }
        _ => return None,
    };
    if !(0.0..60.0).contains(&seconds) {
        return None;
    }
    Some(hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds)
}

/// Unit-suffixed spans like `1h2m3.5s` or `1 min 30 sec`
fn parse_units(s: &str) -> Option<f64> {
    let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    let mut rest = compact.as_str();
    let mut total = 0.0;
    let mut matched = false;

    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_len == 0 {
            return None;
        }
        let value: f64 = rest[..num_len].parse().ok()?;
        rest = &rest[num_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match rest[..unit_len].to_ascii_lowercase().as_str() {
            "h" | "hr" | "hrs" | "hour" | "hours" => 3600.0,
            "m" | "min" | "mins" | "minute" | "minutes" => 60.0,
            "s" | "sec" | "secs" | "second" | "seconds" => 1.0,
            "ms" | "msec" | "msecs" => 0.001,
            _ => return None,
        };
        rest = &rest[unit_len..];
        total += value * scale;
        matched = true;
    }

    matched.then_some(total)
}
