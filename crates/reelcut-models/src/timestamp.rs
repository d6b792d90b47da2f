//! Timestamp formatting for subtitle formats.
//!
//! ASS uses `H:MM:SS.cc` (centiseconds), SRT uses `HH:MM:SS,mmm`.

/// Format seconds as an ASS timestamp (`H:MM:SS.cc`).
///
/// # Examples
/// ```
/// use reelcut_models::timestamp::format_ass_time;
/// assert_eq!(format_ass_time(0.0), "0:00:00.00");
/// assert_eq!(format_ass_time(83.456), "0:01:23.46");
/// ```
pub fn format_ass_time(seconds: f64) -> String {
    let total_cs = (seconds.max(0.0) * 100.0).round() as u64;
    let hours = total_cs / 360_000;
    let mins = (total_cs % 360_000) / 6_000;
    let secs = (total_cs % 6_000) / 100;
    let cs = total_cs % 100;
    format!("{}:{:02}:{:02}.{:02}", hours, mins, secs, cs)
}

/// Format seconds as an SRT timestamp (`HH:MM:SS,mmm`).
///
/// # Examples
/// ```
/// use reelcut_models::timestamp::format_srt_time;
/// assert_eq!(format_srt_time(3723.5), "01:02:03,500");
/// ```
pub fn format_srt_time(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let mins = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let ms = total_ms % 1000;
    format!("{:02}:{:02}:{:02},{:03}", hours, mins, secs, ms)
}

/// Format seconds as `HH:MM:SS` or `HH:MM:SS.mmm` for logs and reports.
pub fn format_seconds(total_secs: f64) -> String {
    let total_secs = total_secs.max(0.0);
    let hours = (total_secs / 3600.0).floor() as u32;
    let mins = ((total_secs % 3600.0) / 60.0).floor() as u32;
    let secs = total_secs % 60.0;

    if (secs - secs.floor()).abs() > 0.0001 {
        format!("{:02}:{:02}:{:06.3}", hours, mins, secs)
    } else {
        format!("{:02}:{:02}:{:02}", hours, mins, secs.floor() as u32)
    }
}
