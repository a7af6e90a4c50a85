//! Clip planning: keyframe snapping, bitrate budgeting and plan assembly

use serde::{Deserialize, Serialize};

pub mod bitrate;
pub mod keyframe;
pub mod plan;

pub use bitrate::{compute_video_bitrate_kbps, reserve_factor, BitrateBudget};
pub use keyframe::{resolve_copy_bounds, FirstNonEmpty};
pub use plan::{derive_output_path, ClipPlan};

/// Time range handed to a keyframe probe
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbeWindow {
    /// Window start in seconds, never negative
    pub start_s: f64,
    /// Window length in seconds
    pub duration_s: f64,
}

impl ProbeWindow {
    /// Window covering `[start_s, end_s]` with `pad_s` on each side
    pub fn around(start_s: f64, end_s: f64, pad_s: f64) -> Self {
        Self {
            start_s: (start_s - pad_s).max(0.0),
            duration_s: (end_s - start_s) + keyframe::PAD_EDGE_MULTIPLIER * pad_s,
        }
    }

    pub fn end_s(&self) -> f64 {
        self.start_s + self.duration_s
    }
}

/// Keyframe-aligned copy boundaries
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimBounds {
    pub start_s: f64,
    pub end_s: f64,
}

impl TrimBounds {
    pub fn new(start_s: f64, end_s: f64) -> Self {
        Self { start_s, end_s }
    }

    pub fn duration_s(&self) -> f64 {
        self.end_s - self.start_s
    }
}
