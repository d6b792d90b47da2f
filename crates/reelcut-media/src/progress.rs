//! FFmpeg `-progress` parsing.

/// Progress snapshot reported by FFmpeg.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FfmpegProgress {
    /// Current frame number
    pub frame: u64,
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Encoding speed (1.5 = 1.5x realtime)
    pub speed: f64,
    /// Whether encoding is complete
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Percentage of `total_secs` encoded so far, capped at 100.
    pub fn percentage(&self, total_secs: f64) -> f64 {
        if total_secs <= 0.0 {
            return 0.0;
        }
        ((self.out_time_ms as f64 / 1000.0 / total_secs) * 100.0).min(100.0)
    }
}

/// Whether a stderr line is a `key=value` record from `-progress pipe:2`.
pub(crate) fn is_progress_line(line: &str) -> bool {
    match line.trim().split_once('=') {
        Some((key, value)) => {
            !key.is_empty()
                && key.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
                && !value.contains(' ')
        }
        None => false,
    }
}

/// Fold one progress record into `current`; returns a snapshot at each block end.
pub(crate) fn parse_progress_line(line: &str, current: &mut FfmpegProgress) -> Option<FfmpegProgress> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        "out_time_us" => {
            if let Ok(us) = value.parse::<i64>() {
                current.out_time_ms = us / 1000;
            }
        }
        "frame" => {
            if let Ok(frame) = value.parse() {
                current.frame = frame;
            }
        }
        "speed" => {
            if let Some(speed) = value.strip_suffix('x').and_then(|s| s.trim().parse().ok()) {
                current.speed = speed;
            }
        }
        "progress" => {
            current.is_complete = value == "end";
            return Some(current.clone());
        }
        _ => {}
    }
    None
}
