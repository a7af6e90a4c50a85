//! Media inspection through ffprobe

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::model::{ColorTransfer, Verbosity};
use crate::error::{ClipperError, ClipperResult};
use crate::ports::ToolRunner;
use crate::utils::path::join_command;

pub mod cache;
pub mod capabilities;
pub mod keyframes;

pub use cache::{cache_key, CachedOutput, ProbeCache};
pub use capabilities::{best_encoder_for, Capabilities};
pub use keyframes::{ffprobe_keyframe_probe, FfprobeKeyframes, KeyframeStrategy};

pub const FFPROBE: &str = "ffprobe";

/// Color characteristics of the first video stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoColorInfo {
    pub primaries: Option<String>,
    pub transfer: Option<ColorTransfer>,
    pub space: Option<String>,
}

impl VideoColorInfo {
    pub fn is_hdr(&self) -> bool {
        self.transfer.is_some_and(|t| t.is_hdr())
    }
}

/// A subtitle stream of the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleTrack {
    /// Position among the subtitle streams, as used by `0:s:N`
    pub index: u32,
    pub language: String,
    pub title: String,
    pub codec: String,
    /// Label like `Track 0: eng - Commentary (subrip)`
    pub display: String,
}

/// Everything `inspect` reports about a source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaSummary {
    pub source: String,
    pub duration_s: f64,
    pub video_codec: Option<String>,
    pub color: Option<VideoColorInfo>,
    pub audio_codec: Option<String>,
    pub audio_kbps: Option<u32>,
    pub subtitles: Vec<SubtitleTrack>,
}

#[derive(Debug, Deserialize)]
struct StreamsDoc {
    #[serde(default)]
    streams: Vec<SubtitleStreamDoc>,
}

#[derive(Debug, Deserialize)]
struct SubtitleStreamDoc {
    #[serde(default)]
    codec_name: Option<String>,
    #[serde(default)]
    tags: Option<SubtitleTagsDoc>,
}

#[derive(Debug, Default, Deserialize)]
struct SubtitleTagsDoc {
    language: Option<String>,
    title: Option<String>,
}

/// ffprobe front end with memoized results
pub struct FfprobeClient {
    runner: Arc<dyn ToolRunner>,
    cache: Arc<ProbeCache>,
    verbosity: Verbosity,
}

impl FfprobeClient {
    pub fn new(runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            runner,
            cache: Arc::new(ProbeCache::new()),
            verbosity: Verbosity::default(),
        }
    }

    /// Share an existing cache, e.g. one loaded from disk
    pub fn with_cache(mut self, cache: Arc<ProbeCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn cache(&self) -> &Arc<ProbeCache> {
        &self.cache
    }

    pub fn runner(&self) -> &Arc<dyn ToolRunner> {
        &self.runner
    }

    /// First line of `ffprobe -version`
    pub fn version(&self) -> ClipperResult<String> {
        tool_version(self.runner.as_ref(), FFPROBE)
    }

    /// Run ffprobe and return its trimmed stdout, `None` on failure or empty output
    pub fn run(&self, args: &[String]) -> Option<String> {
        let key = cache_key(FFPROBE, args);
        if let Some(cached) = self.cache.get(&key) {
            self.log_command("Cached", args);
            return match cached {
                CachedOutput::Success(out) => out,
                CachedOutput::Failure => None,
            };
        }

        self.log_command("Running", args);
        let entry = match self.runner.run(FFPROBE, args) {
            Ok(output) if output.success => {
                let trimmed = output.stdout.trim();
                CachedOutput::Success((!trimmed.is_empty()).then(|| trimmed.to_string()))
            }
            Ok(output) => {
                warn!(
                    status = ?output.status,
                    command = %self.display(args),
                    "ffprobe command failed"
                );
                CachedOutput::Failure
            }
            Err(e) => {
                warn!(error = %e, command = %self.display(args), "ffprobe could not run");
                CachedOutput::Failure
            }
        };
        self.cache.insert(key, entry.clone());
        match entry {
            CachedOutput::Success(out) => out,
            CachedOutput::Failure => None,
        }
    }

    /// Generic `-show_entries` query printed as bare CSV
    pub fn query(&self, path: &str, entries: &str, stream: Option<&str>) -> Option<String> {
        let mut args = strings(&["-v", "quiet"]);
        if let Some(stream) = stream {
            args.extend(strings(&["-select_streams", stream]));
        }
        args.extend(strings(&["-show_entries", entries, "-of", "csv=p=0", path]));
        self.run(&args)
    }

    pub fn duration_s(&self, path: &str) -> Option<f64> {
        self.query(path, "format=duration", None)?
            .parse::<f64>()
            .ok()
            .filter(|d| d.is_finite())
    }

    /// Codec name of the first video stream as ffprobe reports it
    pub fn video_codec(&self, path: &str) -> Option<String> {
        self.query(path, "stream=codec_name", Some("v:0"))
    }

    pub fn color_info(&self, path: &str) -> Option<VideoColorInfo> {
        let primaries = self.query(path, "stream=color_primaries", Some("v:0"));
        let transfer = self
            .query(path, "stream=color_transfer", Some("v:0"))
            .and_then(|t| ColorTransfer::from_probe(&t));
        let space = self.query(path, "stream=color_space", Some("v:0"));
        if primaries.is_none() && transfer.is_none() && space.is_none() {
            return None;
        }
        Some(VideoColorInfo {
            primaries,
            transfer,
            space,
        })
    }

    /// Average bitrate of the first audio stream in kbps
    pub fn audio_bitrate_kbps(&self, path: &str) -> Option<u32> {
        let bps: u64 = self
            .query(path, "stream=bit_rate", Some("a:0"))?
            .parse()
            .ok()?;
        u32::try_from(bps / 1000).ok()
    }

    pub fn audio_codec(&self, path: &str) -> Option<String> {
        self.query(path, "stream=codec_name", Some("a:0"))
    }

    pub fn subtitle_tracks(&self, path: &str) -> Vec<SubtitleTrack> {
        let args = strings(&[
            "-v",
            "quiet",
            "-select_streams",
            "s",
            "-show_entries",
            "stream=index,codec_name:stream_tags=language,title",
            "-of",
            "json",
            path,
        ]);
        let Some(out) = self.run(&args) else {
            return Vec::new();
        };
        match parse_subtitle_tracks(&out) {
            Ok(tracks) => tracks,
            Err(e) => {
                warn!(error = %e, "Could not parse ffprobe subtitle listing");
                Vec::new()
            }
        }
    }

    /// Collect the facts `inspect` shows
    pub fn summarize(&self, path: &str) -> ClipperResult<MediaSummary> {
        let duration_s = self.duration_s(path).ok_or_else(|| ClipperError::ProbeError {
            message: format!("Could not read video duration from: {}", path),
        })?;
        Ok(MediaSummary {
            source: path.to_string(),
            duration_s,
            video_codec: self.video_codec(path),
            color: self.color_info(path),
            audio_codec: self.audio_codec(path),
            audio_kbps: self.audio_bitrate_kbps(path),
            subtitles: self.subtitle_tracks(path),
        })
    }

    fn display(&self, args: &[String]) -> String {
        let mut command = vec![FFPROBE.to_string()];
        command.extend(args.iter().cloned());
        join_command(&command)
    }

    fn log_command(&self, action: &str, args: &[String]) {
        if self.verbosity >= Verbosity::Commands {
            info!("{}: {}", action, self.display(args));
        } else {
            debug!("{}: {}", action, self.display(args));
        }
    }
}

/// Parse ffprobe's JSON stream listing into display-ready tracks
pub fn parse_subtitle_tracks(json: &str) -> serde_json::Result<Vec<SubtitleTrack>> {
    let doc: StreamsDoc = serde_json::from_str(json)?;
    Ok(doc
        .streams
        .into_iter()
        .enumerate()
        .map(|(i, stream)| {
            let tags = stream.tags.unwrap_or_default();
            let language = tags.language.unwrap_or_else(|| "und".to_string());
            let title = tags.title.unwrap_or_default();
            let codec = stream.codec_name.unwrap_or_default();

            let mut display = format!("Track {}: {}", i, language);
            if !title.is_empty() {
                display.push_str(&format!(" - {}", title));
            }
            if !codec.is_empty() {
                display.push_str(&format!(" ({})", codec));
            }
            SubtitleTrack {
                index: i as u32,
                language,
                title,
                codec,
                display,
            }
        })
        .collect())
}

/// First line of `<tool> -version`
pub fn tool_version(runner: &dyn ToolRunner, tool: &str) -> ClipperResult<String> {
    let output = runner.run(tool, &strings(&["-version"]))?;
    if !output.success {
        return Err(ClipperError::ToolFailed {
            tool: tool.to_string(),
            status: output
                .status
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string()),
            output: output.stderr.trim().to_string(),
        });
    }
    let version = output.stdout.lines().next().unwrap_or_default().trim().to_string();
    debug!(tool, %version, "Found tool");
    Ok(version)
}

pub(crate) fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}
