//! ffprobe keyframe listing strategies

use tracing::debug;

use super::{strings, FfprobeClient};
use crate::planner::{FirstNonEmpty, ProbeWindow};
use crate::ports::KeyframeProbe;

/// How many timestamps are echoed to the debug log
const MAX_DEBUG_KFS: usize = 5;

/// One way of asking ffprobe for keyframe timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyframeStrategy {
    /// Decoded key frames, `best_effort_timestamp_time`
    BestEffortFrames,
    /// Decoded key frames, `pkt_pts_time`
    PacketPtsFrames,
    /// Demuxed packets carrying the `K` flag
    FlaggedPackets,
}

impl KeyframeStrategy {
    /// Strategies in the order they are tried
    pub const ALL: [KeyframeStrategy; 3] = [
        KeyframeStrategy::BestEffortFrames,
        KeyframeStrategy::PacketPtsFrames,
        KeyframeStrategy::FlaggedPackets,
    ];

    fn show_flag(&self) -> &'static str {
        match self {
            KeyframeStrategy::FlaggedPackets => "-show_packets",
            _ => "-show_frames",
        }
    }

    fn entries(&self) -> &'static str {
        match self {
            KeyframeStrategy::BestEffortFrames => "frame=best_effort_timestamp_time",
            KeyframeStrategy::PacketPtsFrames => "frame=pkt_pts_time",
            KeyframeStrategy::FlaggedPackets => "packet=pts_time,flags",
        }
    }

    fn requires_flag(&self) -> bool {
        matches!(self, KeyframeStrategy::FlaggedPackets)
    }

    /// ffprobe arguments reading only `window` of the first video stream
    pub fn args(&self, window: ProbeWindow, path: &str) -> Vec<String> {
        let interval = format!("{}%+{}", window.start_s, window.duration_s);
        strings(&[
            "-v",
            "quiet",
            "-select_streams",
            "v:0",
            "-read_intervals",
            interval.as_str(),
            "-skip_frame",
            "nokey",
            self.show_flag(),
            "-show_entries",
            self.entries(),
            "-of",
            "csv=p=0",
            path,
        ])
    }

    /// Parse ffprobe CSV output into ascending timestamps
    pub fn parse(&self, output: &str) -> Vec<f64> {
        let mut kfs: Vec<f64> = output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(|line| parse_keyframe_line(line, self.requires_flag()))
            .collect();
        kfs.sort_by(|a, b| a.total_cmp(b));
        kfs
    }
}

/// Timestamp from a `pts[,flags]` CSV line
///
/// With `require_flag` the line must have a flags column containing `K`.
pub fn parse_keyframe_line(line: &str, require_flag: bool) -> Option<f64> {
    let mut parts = line.splitn(2, ',');
    let ts = parts.next()?;
    if require_flag {
        let flags = parts.next()?;
        if !flags.contains('K') {
            return None;
        }
    }
    ts.trim().parse::<f64>().ok().filter(|t| t.is_finite())
}

/// A single strategy bound to an ffprobe client
pub struct FfprobeKeyframes<'a> {
    client: &'a FfprobeClient,
    strategy: KeyframeStrategy,
}

impl<'a> FfprobeKeyframes<'a> {
    pub fn new(client: &'a FfprobeClient, strategy: KeyframeStrategy) -> Self {
        Self { client, strategy }
    }
}

impl KeyframeProbe for FfprobeKeyframes<'_> {
    fn keyframes(&self, window: ProbeWindow, path: &str) -> Vec<f64> {
        let Some(out) = self.client.run(&self.strategy.args(window, path)) else {
            return Vec::new();
        };
        let kfs = self.strategy.parse(&out);
        if !kfs.is_empty() {
            debug!(
                strategy = ?self.strategy,
                count = kfs.len(),
                window_start = window.start_s,
                window_end = window.end_s(),
                first = ?&kfs[..kfs.len().min(MAX_DEBUG_KFS)],
                "Found keyframes"
            );
        }
        kfs
    }
}

/// Every ffprobe strategy, tried in priority order
pub fn ffprobe_keyframe_probe(client: &FfprobeClient) -> FirstNonEmpty<'_> {
    KeyframeStrategy::ALL
        .into_iter()
        .fold(FirstNonEmpty::new(), |probe, strategy| {
            probe.with(FfprobeKeyframes::new(client, strategy))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_lines() {
        let out = "4.004\n\n0.000\n2.002 \nN/A\n";
        assert_eq!(
            KeyframeStrategy::BestEffortFrames.parse(out),
            vec![0.0, 2.002, 4.004]
        );
    }

    #[test]
    fn test_parse_packet_lines_requires_key_flag() {
        let out = "0.000,K__\n0.033,___\n2.002,K_\n2.5\n";
        assert_eq!(KeyframeStrategy::FlaggedPackets.parse(out), vec![0.0, 2.002]);
        assert_eq!(parse_keyframe_line("1.5,__", true), None);
        assert_eq!(parse_keyframe_line("1.5,__", false), Some(1.5));
    }

    #[test]
    fn test_strategy_args() {
        let window = ProbeWindow::around(10.0, 20.0, 6.0);
        let args = KeyframeStrategy::FlaggedPackets.args(window, "in.mkv");
        let joined = args.join(" ");
        assert!(joined.contains("-read_intervals 4%+22"));
        assert!(joined.contains("-skip_frame nokey -show_packets"));
        assert!(joined.contains("packet=pts_time,flags"));
        assert_eq!(args.last().map(String::as_str), Some("in.mkv"));
    }
}
