//! Loudness-based highlights from auto-editor.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use reelcut_models::{Segment, SegmentBounds};

use super::{pack_ranges, windows_to_segments, SegmentStrategy, TimeRange};
use crate::command::require_tool;
use crate::error::{last_stderr_line, MediaError, MediaResult};
use crate::tools::FetchedMedia;

/// Speed auto-editor assigns to cut (silent) chunks.
const CUT_SPEED: f64 = 99999.0;

/// Runs `auto-editor --export v1` and keeps the loud chunks.
#[derive(Debug, Clone)]
pub struct AutoEditorStrategy {
    binary: String,
    silent_threshold: f64,
    frame_margin: u32,
}

impl Default for AutoEditorStrategy {
    fn default() -> Self {
        Self {
            binary: "auto-editor".to_string(),
            silent_threshold: 0.04,
            frame_margin: 1,
        }
    }
}

impl AutoEditorStrategy {
    pub fn new(binary: impl Into<String>, silent_threshold: f64, frame_margin: u32) -> Self {
        Self {
            binary: binary.into(),
            silent_threshold,
            frame_margin,
        }
    }

    fn build_args(&self, input: &Path, timeline: &Path, fps: f64) -> Vec<String> {
        let margin_secs = self.frame_margin as f64 / fps.max(1.0);
        vec![
            input.to_string_lossy().to_string(),
            "--export".to_string(),
            "v1".to_string(),
            "--output".to_string(),
            timeline.to_string_lossy().to_string(),
            "--no-open".to_string(),
            "--edit".to_string(),
            format!("audio:threshold={}", self.silent_threshold),
            "--margin".to_string(),
            format!("{:.3}s", margin_secs),
        ]
    }
}

#[async_trait]
impl SegmentStrategy for AutoEditorStrategy {
    fn name(&self) -> &'static str {
        "auto-editor"
    }

    async fn select(&self, media: &FetchedMedia, bounds: &SegmentBounds) -> MediaResult<Vec<Segment>> {
        require_tool(&self.binary)?;

        let timeline = media.path.with_extension("timeline.json");
        let output = Command::new(&self.binary)
            .args(self.build_args(&media.path, &timeline, media.info.fps))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MediaError::detection_failed(format!(
                "auto-editor failed: {}",
                last_stderr_line(&stderr)
            )));
        }

        let json = tokio::fs::read(&timeline).await?;
        let loud = parse_v1_timeline(&json, media.info.fps)?;
        debug!(loud_ranges = loud.len(), "auto-editor timeline parsed");

        let windows = pack_ranges(&loud, bounds);
        Ok(windows_to_segments(&windows, media.info.duration, bounds))
    }
}

#[derive(Debug, Deserialize)]
struct V1Timeline {
    #[serde(default)]
    timebase: Option<String>,
    chunks: Vec<(f64, f64, f64)>,
}

/// Parse an auto-editor v1 timeline into loud ranges in seconds.
///
/// Chunks are `[start_frame, end_frame, speed]`; cut chunks carry speed
/// 99999. The timeline's own timebase wins over `fallback_fps`.
pub fn parse_v1_timeline(json: &[u8], fallback_fps: f64) -> MediaResult<Vec<TimeRange>> {
    let timeline: V1Timeline = serde_json::from_slice(json)?;

    let fps = timeline
        .timebase
        .as_deref()
        .and_then(parse_timebase)
        .unwrap_or(fallback_fps);
    if fps <= 0.0 {
        return Err(MediaError::detection_failed("timeline has no usable frame rate"));
    }

    Ok(timeline
        .chunks
        .into_iter()
        .filter(|(_, _, speed)| *speed > 0.0 && *speed < CUT_SPEED)
        .map(|(start, end, _)| TimeRange::new(start / fps, end / fps))
        .filter(|r| r.end > r.start)
        .collect())
}

fn parse_timebase(s: &str) -> Option<f64> {
    match s.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            (den > 0.0).then(|| num / den)
        }
        None => s.trim().parse().ok(),
    }
}
