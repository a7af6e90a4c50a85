//! Timestamp formatting for ffmpeg arguments

/// How fractional milliseconds are resolved when formatting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoundMode {
    #[default]
    Round,
    Floor,
    Ceil,
}

/// Format seconds as `HH:MM:SS.mmm`
pub fn format_time(seconds: f64, mode: RoundMode) -> String {
    let scaled = seconds.max(0.0) * 1000.0;
    let millis = match mode {
        RoundMode::Round => scaled.round(),
        RoundMode::Floor => scaled.floor(),
        RoundMode::Ceil => scaled.ceil(),
    } as u64;

    let hours = millis / 3_600_000;
    let minutes = (millis % 3_600_000) / 60_000;
    let secs = (millis % 60_000) / 1000;
    let ms = millis % 1000;
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, ms)
}

/// Format milliseconds as `HH:MM:SS.mmm`
pub fn format_millis(millis: u64) -> String {
    format_time(millis as f64 / 1000.0, RoundMode::Round)
}
