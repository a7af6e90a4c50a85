//! Video bitrate budgeting against a target output size

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::model::Encoder;
use crate::error::{ClipperError, ClipperResult};

/// Lowest video bitrate ever requested, in kbps
pub const MIN_VIDEO_KBPS: u32 = 100;
/// Peak rate relative to the average bitrate
pub const MAXRATE_MULTIPLIER: f64 = 1.0;
/// Rate-control buffer relative to the average bitrate
pub const BUFSIZE_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_RESERVE_FACTOR: f64 = 0.95;

const BYTES_PER_MIB: u64 = 1024 * 1024;

/// Fraction of the target size left for stream payload after container overhead
pub fn reserve_factor(encoder: Encoder) -> f64 {
    match encoder {
        Encoder::H264Nvenc | Encoder::HevcNvenc => 0.85,
        Encoder::X264 | Encoder::X265 => 0.97,
        _ => DEFAULT_RESERVE_FACTOR,
    }
}

/// Video bitrate in kbps that keeps video plus audio within `target_bytes`
pub fn compute_video_bitrate_kbps(
    target_bytes: u64,
    duration_s: f64,
    audio_kbps: u32,
    reserve_factor: f64,
) -> ClipperResult<u32> {
    if !(duration_s > 0.0) {
        return Err(ClipperError::InvalidDuration { duration_s });
    }
    if !(reserve_factor > 0.0 && reserve_factor <= 1.0) {
        return Err(ClipperError::InvalidReserveFactor { reserve_factor });
    }

    let usable_bytes = (target_bytes as f64 * reserve_factor).floor();
    let total_kbps = usable_bytes * 8.0 / (duration_s * 1000.0);
    let raw_kbps = total_kbps - audio_kbps as f64;

    // Subnormal durations overflow the division
    if !raw_kbps.is_finite() {
        return Err(ClipperError::InvalidDuration { duration_s });
    }
    if raw_kbps <= 0.0 {
        return Err(ClipperError::NoBitrateBudget {
            audio_kbps,
            target_bytes,
            duration_s,
        });
    }

    let kbps = (raw_kbps.round() as u32).max(MIN_VIDEO_KBPS);
    debug!(
        target_bytes,
        duration_s, audio_kbps, reserve_factor, raw_kbps, kbps, "Computed video bitrate"
    );
    Ok(kbps)
}

/// Average bitrate plus the rate-control limits derived from it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitrateBudget {
    pub kbps: u32,
    pub maxrate_kbps: u32,
    pub bufsize_kbps: u32,
}

impl BitrateBudget {
    /// Budget for an explicit byte target
    pub fn compute(
        target_bytes: u64,
        duration_s: f64,
        audio_kbps: u32,
        reserve_factor: f64,
    ) -> ClipperResult<Self> {
        let kbps = compute_video_bitrate_kbps(target_bytes, duration_s, audio_kbps, reserve_factor)?;
        Ok(Self::from_kbps(kbps))
    }

    /// Budget for a target size in MiB, using the encoder's reserve factor
    pub fn for_encoder(
        target_mb: u64,
        duration_s: f64,
        audio_kbps: u32,
        encoder: Encoder,
    ) -> ClipperResult<Self> {
        Self::compute(
            target_mb.saturating_mul(BYTES_PER_MIB),
            duration_s,
            audio_kbps,
            reserve_factor(encoder),
        )
    }

    pub fn from_kbps(kbps: u32) -> Self {
        Self {
            kbps,
            maxrate_kbps: (kbps as f64 * MAXRATE_MULTIPLIER).round() as u32,
            bufsize_kbps: (kbps as f64 * BUFSIZE_MULTIPLIER).round() as u32,
        }
    }
}
