//! ffmpeg capability detection
//!
//! An encoder counts as available when ffmpeg can encode one synthetic frame
//! with it. Answers are memoized in the shared [`ProbeCache`].

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use super::{cache_key, strings, tool_version, CachedOutput, ProbeCache};
use crate::domain::model::{Encoder, VideoCodec};
use crate::error::{ClipperError, ClipperResult};
use crate::ports::ToolRunner;

pub const FFMPEG: &str = "ffmpeg";

/// Synthetic one-frame source used by every check
const TEST_SOURCE: &str = "color=c=black:s=200x200:d=0.1";

/// Encoders to try for each codec, best first
pub fn preferred_encoders(codec: VideoCodec) -> &'static [Encoder] {
    match codec {
        VideoCodec::H264 => &[Encoder::H264Nvenc, Encoder::X264],
        VideoCodec::Hevc => &[Encoder::HevcNvenc, Encoder::X265],
        VideoCodec::Av1 => &[Encoder::SvtAv1],
        _ => &[],
    }
}

/// Highest-priority available encoder producing `codec`
pub fn best_encoder_for(codec: VideoCodec, available: &HashSet<Encoder>) -> ClipperResult<Encoder> {
    preferred_encoders(codec)
        .iter()
        .copied()
        .find(|e| available.contains(e))
        .ok_or_else(|| ClipperError::EncoderUnavailable {
            encoder: format!("any encoder for codec '{}'", codec),
        })
}

/// Locate an executable on `PATH`
pub fn locate_tool(tool: &str) -> ClipperResult<PathBuf> {
    which::which(tool).map_err(|_| ClipperError::ToolNotFound {
        tool: tool.to_string(),
    })
}

/// Cached view of what the local ffmpeg build can do
pub struct Capabilities {
    runner: Arc<dyn ToolRunner>,
    cache: Arc<ProbeCache>,
}

impl Capabilities {
    pub fn new(runner: Arc<dyn ToolRunner>, cache: Arc<ProbeCache>) -> Self {
        Self { runner, cache }
    }

    /// First line of `ffmpeg -version`
    pub fn ffmpeg_version(&self) -> ClipperResult<String> {
        tool_version(self.runner.as_ref(), FFMPEG)
    }

    /// Whether `encoder` can encode a tiny sample
    pub fn supports_encoder(&self, encoder: Encoder) -> bool {
        if encoder == Encoder::Auto {
            return false;
        }
        let args = strings(&[
            "-hide_banner",
            "-loglevel",
            "error",
            "-f",
            "lavfi",
            "-i",
            TEST_SOURCE,
            "-frames:v",
            "1",
            "-an",
            "-c:v",
            encoder.ffmpeg_name(),
            "-f",
            "null",
            "-",
        ]);
        self.ffmpeg_succeeds(&args)
    }

    /// Set of encoders usable on this system
    pub fn available_encoders(&self) -> HashSet<Encoder> {
        let available: HashSet<Encoder> = Encoder::CONCRETE
            .into_iter()
            .filter(|e| self.supports_encoder(*e))
            .collect();
        info!(encoders = ?available, "Detected available encoders");
        available
    }

    /// Whether the libplacebo filter runs on a Vulkan device
    pub fn has_libplacebo(&self) -> bool {
        let args = strings(&[
            "-init_hw_device",
            "vulkan",
            "-hide_banner",
            "-loglevel",
            "error",
            "-f",
            "lavfi",
            "-i",
            TEST_SOURCE,
            "-vf",
            "libplacebo",
            "-f",
            "null",
            "-",
        ]);
        self.ffmpeg_succeeds(&args)
    }

    fn ffmpeg_succeeds(&self, args: &[String]) -> bool {
        let key = cache_key(FFMPEG, args);
        if let Some(cached) = self.cache.get(&key) {
            return matches!(cached, CachedOutput::Success(_));
        }
        let ok = matches!(self.runner.run(FFMPEG, args), Ok(out) if out.success);
        debug!(ok, "ffmpeg capability check");
        self.cache.insert(
            key,
            if ok {
                CachedOutput::Success(None)
            } else {
                CachedOutput::Failure
            },
        );
        ok
    }
}
