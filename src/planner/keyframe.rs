//! Keyframe window resolution for stream-copy trimming
//!
//! Stream copy can only cut cleanly on keyframes, so the requested window is
//! widened to the enclosing keyframes found by a [`KeyframeProbe`]. When the
//! probe comes back empty the search window doubles, and after the last
//! attempt the request is returned untouched.

use tracing::{debug, warn};

use super::{ProbeWindow, TrimBounds};
use crate::ports::KeyframeProbe;

/// Initial padding on each side of the requested window, in seconds
pub const DEFAULT_PAD_S: f64 = 6.0;
/// Number of pads added to the window length
pub const PAD_EDGE_MULTIPLIER: f64 = 2.0;
pub const PAD_GROWTH_FACTOR: f64 = 2.0;
pub const MAX_PAD_ATTEMPTS: usize = 3;
/// Span used when the end keyframe collapses onto the start keyframe
pub const END_BOUNDARY_FALLBACK_DELTA: f64 = 0.1;
/// Tolerance for treating a keyframe as an exact match of the requested end
pub const END_MATCH_TOLERANCE: f64 = 1e-6;

/// Snap `[start_s, end_s]` to the enclosing keyframes reported by `probe`
///
/// Never fails: if every attempt finds no keyframes the input is returned.
pub fn resolve_copy_bounds<P>(probe: &P, path: &str, start_s: f64, end_s: f64) -> TrimBounds
where
    P: KeyframeProbe + ?Sized,
{
    let mut pad = DEFAULT_PAD_S;
    for attempt in 1..=MAX_PAD_ATTEMPTS {
        let window = ProbeWindow::around(start_s, end_s, pad);
        let kfs = probe.keyframes(window, path);
        if let Some(bounds) = snap_to_keyframes(&kfs, start_s, end_s) {
            debug!(
                attempt,
                keyframes = kfs.len(),
                start_s = bounds.start_s,
                end_s = bounds.end_s,
                "Snapped copy bounds to keyframes"
            );
            return bounds;
        }
        debug!(attempt, pad, "No keyframes in probe window, widening");
        pad *= PAD_GROWTH_FACTOR;
    }

    warn!(
        start_s,
        end_s, "No keyframes found near the requested window, using unsnapped bounds"
    );
    TrimBounds::new(start_s, end_s)
}

/// Pick the keyframe at-or-before `start_s` and the first one at-or-after `end_s`
///
/// `kfs` must be ascending. Returns `None` for an empty list.
pub fn snap_to_keyframes(kfs: &[f64], start_s: f64, end_s: f64) -> Option<TrimBounds> {
    if kfs.is_empty() {
        return None;
    }

    let i = bisect_right(kfs, start_s).saturating_sub(1);
    let start_kf = kfs[i];

    let mut j = bisect_right(kfs, end_s);
    if j > 0 && (kfs[j - 1] - end_s).abs() <= END_MATCH_TOLERANCE {
        j -= 1;
    }
    let j = j.min(kfs.len() - 1);

    let mut end_kf = kfs[j];
    if end_kf <= start_kf {
        end_kf = start_kf + END_BOUNDARY_FALLBACK_DELTA;
    }
    Some(TrimBounds::new(start_kf, end_kf))
}

/// Index of the first element strictly greater than `x`
fn bisect_right(kfs: &[f64], x: f64) -> usize {
    kfs.partition_point(|&k| k <= x)
}

/// Ordered probe strategies; the first non-empty answer wins
pub struct FirstNonEmpty<'a> {
    probes: Vec<Box<dyn KeyframeProbe + 'a>>,
}

impl<'a> FirstNonEmpty<'a> {
    pub fn new() -> Self {
        Self { probes: Vec::new() }
    }

    /// Append a strategy to try after the ones already added
    pub fn with(mut self, probe: impl KeyframeProbe + 'a) -> Self {
        self.probes.push(Box::new(probe));
        self
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }
}

impl Default for FirstNonEmpty<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyframeProbe for FirstNonEmpty<'_> {
    fn keyframes(&self, window: ProbeWindow, path: &str) -> Vec<f64> {
        for (idx, probe) in self.probes.iter().enumerate() {
            let kfs = probe.keyframes(window, path);
            if !kfs.is_empty() {
                debug!(strategy = idx + 1, found = kfs.len(), "Keyframe strategy succeeded");
                return kfs;
            }
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    fn fixed(kfs: Vec<f64>) -> impl Fn(ProbeWindow, &str) -> Vec<f64> {
        move |_: ProbeWindow, _: &str| kfs.clone()
    }

    #[test]
    fn test_snaps_to_enclosing_keyframes() {
        let probe = fixed(vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
        let bounds = resolve_copy_bounds(&probe, "in.mp4", 3.0, 7.0);
        assert_eq!(bounds, TrimBounds::new(2.0, 8.0));
    }

    #[test]
    fn test_exact_matches_are_kept() {
        let probe = fixed(vec![0.0, 2.0, 4.0, 6.0, 8.0]);
        let bounds = resolve_copy_bounds(&probe, "in.mp4", 2.0, 6.0);
        assert_eq!(bounds, TrimBounds::new(2.0, 6.0));

        // within tolerance of the requested end
        let probe = fixed(vec![0.0, 4.9999995, 10.0]);
        let bounds = resolve_copy_bounds(&probe, "in.mp4", 1.0, 5.0);
        assert_eq!(bounds, TrimBounds::new(0.0, 4.9999995));
    }

    #[test]
    fn test_start_before_first_keyframe_clamps_to_first() {
        let probe = fixed(vec![1.5, 3.0, 9.0]);
        let bounds = resolve_copy_bounds(&probe, "in.mp4", 0.5, 4.0);
        assert_eq!(bounds, TrimBounds::new(1.5, 9.0));
    }

    #[test]
    fn test_end_after_last_keyframe_clamps_to_last() {
        let probe = fixed(vec![0.0, 2.0, 4.0]);
        let bounds = resolve_copy_bounds(&probe, "in.mp4", 1.0, 20.0);
        assert_eq!(bounds, TrimBounds::new(0.0, 4.0));
    }

    #[test]
    fn test_single_keyframe_gets_fallback_span() {
        let probe = fixed(vec![4.0]);
        let bounds = resolve_copy_bounds(&probe, "in.mp4", 5.0, 9.0);
        assert_eq!(bounds.start_s, 4.0);
        assert!((bounds.end_s - 4.1).abs() < 1e-9);
    }

    #[test]
    fn test_empty_probe_returns_input_after_all_attempts() {
        let windows = RefCell::new(Vec::new());
        let probe = |w: ProbeWindow, _: &str| -> Vec<f64> {
            windows.borrow_mut().push(w);
            Vec::new()
        };
        let bounds = resolve_copy_bounds(&probe, "in.mp4", 20.0, 30.0);
        assert_eq!(bounds, TrimBounds::new(20.0, 30.0));

        let windows = windows.into_inner();
        assert_eq!(windows.len(), MAX_PAD_ATTEMPTS);
        assert_eq!(windows[0], ProbeWindow { start_s: 14.0, duration_s: 22.0 });
        assert_eq!(windows[1], ProbeWindow { start_s: 8.0, duration_s: 34.0 });
        assert_eq!(windows[2], ProbeWindow { start_s: 0.0, duration_s: 58.0 });
    }

    #[test]
    fn test_retry_stops_at_first_hit() {
        let calls = RefCell::new(0);
        let probe = |_: ProbeWindow, _: &str| -> Vec<f64> {
            *calls.borrow_mut() += 1;
            if *calls.borrow() < 2 {
                Vec::new()
            } else {
                vec![0.0, 10.0]
            }
        };
        let bounds = resolve_copy_bounds(&probe, "in.mp4", 3.0, 7.0);
        assert_eq!(bounds, TrimBounds::new(0.0, 10.0));
        assert_eq!(calls.into_inner(), 2);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let probe = fixed(vec![0.0, 1.9, 4.2, 7.7, 12.0]);
        let first = resolve_copy_bounds(&probe, "in.mp4", 3.3, 8.1);
        let second = resolve_copy_bounds(&probe, "in.mp4", 3.3, 8.1);
        assert_eq!(first, second);
    }

    #[test]
    fn test_greatest_start_and_least_end_property() {
        let kfs = vec![0.0, 0.5, 1.0, 2.5, 3.0, 4.75, 6.0, 8.0];
        let cases = [(0.1, 7.9), (1.0, 3.0), (2.6, 4.0), (0.5, 6.0), (2.99, 3.01)];
        for (start, end) in cases {
            let bounds = snap_to_keyframes(&kfs, start, end).unwrap();
            let want_start = kfs.iter().copied().filter(|&k| k <= start).fold(f64::MIN, f64::max);
            let want_end = kfs.iter().copied().filter(|&k| k >= end).fold(f64::MAX, f64::min);
            assert_eq!(bounds.start_s, want_start, "start for {start}..{end}");
            assert_eq!(bounds.end_s, want_end, "end for {start}..{end}");
        }
    }

    #[test]
    fn test_first_non_empty_uses_order() {
        let combined = FirstNonEmpty::new()
            .with(|_: ProbeWindow, _: &str| -> Vec<f64> { Vec::new() })
            .with(fixed(vec![1.0, 2.0]))
            .with(fixed(vec![9.0]));
        assert_eq!(combined.len(), 3);
        let window = ProbeWindow::around(1.0, 2.0, DEFAULT_PAD_S);
        assert_eq!(combined.keyframes(window, "in.mp4"), vec![1.0, 2.0]);

        let none = FirstNonEmpty::new().with(|_: ProbeWindow, _: &str| -> Vec<f64> { Vec::new() });
        assert!(none.keyframes(window, "in.mp4").is_empty());
    }
}
