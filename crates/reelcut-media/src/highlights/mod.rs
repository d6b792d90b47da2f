//! Highlight segment selection.
//!
//! [`SegmentSelector`] runs an ordered list of [`SegmentStrategy`]s. The first
//! strategy producing at least one segment wins; when every strategy fails
//! or comes back empty the whole video becomes the single segment.
//!
//! Detectors report "interesting" ranges (loud chunks, shots). Those are
//! packed into candidate windows ([`pack_ranges`]), scored ([`score_window`])
//! and finally normalized ([`normalize_segments`]).

mod auto_editor;
mod scene;
mod uniform;

pub use auto_editor::AutoEditorStrategy;
pub use scene::SceneChangeStrategy;
pub use uniform::UniformSplitStrategy;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use reelcut_models::{Segment, SegmentBounds};

use crate::error::MediaResult;
use crate::tools::{FetchedMedia, SegmentDetector};

/// Ranges closer than this are merged into one window.
pub const MERGE_GAP_SECS: f64 = 1.5;

/// A raw time range reported by a detector, in source seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// One way of proposing highlight segments.
#[async_trait]
pub trait SegmentStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn select(&self, media: &FetchedMedia, bounds: &SegmentBounds) -> MediaResult<Vec<Segment>>;
}

/// Ordered strategy chain with a whole-video terminal fallback.
pub struct SegmentSelector {
    strategies: Vec<Box<dyn SegmentStrategy>>,
}

impl SegmentSelector {
    pub fn new(strategies: Vec<Box<dyn SegmentStrategy>>) -> Self {
        Self { strategies }
    }

    /// auto-editor, then the ffmpeg scene heuristic.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(AutoEditorStrategy::default()),
            Box::new(SceneChangeStrategy::default()),
        ])
    }

    /// Append a strategy to the end of the chain.
    pub fn with_strategy(mut self, strategy: Box<dyn SegmentStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }
}

#[async_trait]
impl SegmentDetector for SegmentSelector {
    async fn detect(&self, media: &FetchedMedia, bounds: &SegmentBounds) -> Vec<Segment> {
        let duration = media.info.duration;

        if duration <= bounds.min_duration {
            info!(
                video_id = %media.video_id,
                duration = duration,
                "Source shorter than minimum highlight, using whole video"
            );
            return whole_video(duration);
        }

        for strategy in &self.strategies {
            match strategy.select(media, bounds).await {
                Ok(segments) => {
                    let segments = normalize_segments(segments, duration, bounds.max_segments);
                    if segments.is_empty() {
                        debug!(strategy = strategy.name(), "strategy produced no segments");
                        continue;
                    }
                    info!(
                        video_id = %media.video_id,
                        strategy = strategy.name(),
                        count = segments.len(),
                        "Selected highlight segments"
                    );
                    return segments;
                }
                Err(e) => {
                    warn!(
                        video_id = %media.video_id,
                        strategy = strategy.name(),
                        "segment strategy failed: {}",
                        e
                    );
                }
            }
        }

        info!(video_id = %media.video_id, "No detector produced segments, using whole video");
        whole_video(duration)
    }
}

fn whole_video(duration: f64) -> Vec<Segment> {
    Segment::whole(duration).into_iter().collect()
}

/// Pack detector ranges into candidate windows within `bounds`.
///
/// Ranges are merged while the gap to the next range is at most
/// [`MERGE_GAP_SECS`] and the merged window stays within `max_duration`.
/// Ranges longer than `max_duration` are cut into `max_duration` pieces.
/// Windows shorter than `min_duration` are dropped. Each window carries the
/// number of "active" seconds it contains.
pub fn pack_ranges(ranges: &[TimeRange], bounds: &SegmentBounds) -> Vec<(TimeRange, f64)> {
    let mut sorted: Vec<TimeRange> = ranges
        .iter()
        .copied()
        .filter(|r| r.start.is_finite() && r.end.is_finite() && r.end > r.start)
        .collect();
    sorted.sort_by(|a, b| a.start.total_cmp(&b.start));

    // Split long ranges first so each piece fits a window.
    let mut pieces = Vec::with_capacity(sorted.len());
    for range in sorted {
        let mut start = range.start;
        while range.end - start > bounds.max_duration {
            pieces.push(TimeRange::new(start, start + bounds.max_duration));
            start += bounds.max_duration;
        }
        pieces.push(TimeRange::new(start, range.end));
    }

    let mut windows: Vec<(TimeRange, f64)> = Vec::new();
    for piece in pieces {
        if let Some((window, active)) = windows.last_mut() {
            let gap = piece.start - window.end;
            if gap <= MERGE_GAP_SECS && piece.end - window.start <= bounds.max_duration {
                window.end = window.end.max(piece.end);
                *active += piece.duration();
                continue;
            }
        }
        windows.push((piece, piece.duration()));
    }

    windows
        .into_iter()
        .filter(|(w, _)| w.duration() >= bounds.min_duration)
        .collect()
}

/// Heuristic score in `[0, 1]` for a candidate window.
///
/// Weighted sum of duration fit (0.5), activity ratio (0.3) and earliness
/// in the source (0.2).
pub fn score_window(window: &TimeRange, active_secs: f64, source_duration: f64, bounds: &SegmentBounds) -> f64 {
    let duration = window.duration();
    if duration <= 0.0 {
        return 0.0;
    }

    let target = (bounds.min_duration + bounds.max_duration) / 2.0;
    let half_span = ((bounds.max_duration - bounds.min_duration) / 2.0).max(1.0);
    let duration_fit = (1.0 - (duration - target).abs() / half_span).clamp(0.0, 1.0);

    let activity = (active_secs / duration).clamp(0.0, 1.0);

    let position = if source_duration > 0.0 {
        (window.start / source_duration).clamp(0.0, 1.0)
    } else {
        0.0
    };

    0.5 * duration_fit + 0.3 * activity + 0.2 * (1.0 - position)
}

/// Turn packed windows into scored segments.
pub fn windows_to_segments(
    windows: &[(TimeRange, f64)],
    source_duration: f64,
    bounds: &SegmentBounds,
) -> Vec<Segment> {
    windows
        .iter()
        .filter_map(|(w, active)| {
            Segment::new(w.start, w.end, score_window(w, *active, source_duration, bounds))
        })
        .collect()
}

/// Clamp, de-overlap, cap and order segments.
///
/// Segments are clamped to `[0, duration]` and dropped when empty. Overlaps
/// are resolved in favour of the higher score; the best `max_segments`
/// survive and are returned in timeline order.
pub fn normalize_segments(segments: Vec<Segment>, duration: f64, max_segments: usize) -> Vec<Segment> {
    let mut candidates: Vec<Segment> = segments
        .into_iter()
        .filter_map(|s| Segment::new(s.start.max(0.0), s.end.min(duration), s.score))
        .collect();

    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.start.total_cmp(&b.start))
    });

    let mut kept: Vec<Segment> = Vec::new();
    for candidate in candidates {
        if kept.len() >= max_segments {
            break;
        }
        if kept.iter().all(|k| !k.overlaps(&candidate)) {
            kept.push(candidate);
        }
    }

    kept.sort_by(|a, b| a.start.total_cmp(&b.start));
    kept
}
