//! Highlight segments over a source timeline.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default minimum highlight duration in seconds.
pub const DEFAULT_MIN_DURATION: f64 = 10.0;
/// Default maximum highlight duration in seconds.
pub const DEFAULT_MAX_DURATION: f64 = 40.0;
/// Default cap on the number of highlights per source.
pub const DEFAULT_MAX_SEGMENTS: usize = 20;

/// A scored time range over the source media, in seconds.
///
/// `start < end` holds for every value produced through [`Segment::new`].
/// Scores are only comparable within one selection run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub score: f64,
}

impl Segment {
    /// Create a segment, rejecting empty, inverted or non-finite ranges.
    pub fn new(start: f64, end: f64, score: f64) -> Option<Self> {
        if !start.is_finite() || !end.is_finite() || end <= start {
            return None;
        }
        Some(Self {
            start: start.max(0.0),
            end,
            score: if score.is_finite() { score } else { 0.0 },
        })
    }

    /// A single segment spanning the whole source.
    pub fn whole(duration: f64) -> Option<Self> {
        Self::new(0.0, duration, 0.0)
    }

    /// Segment duration in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether two segments share any time.
    pub fn overlaps(&self, other: &Segment) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Errors raised when validating [`SegmentBounds`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BoundsError {
    #[error("minimum duration must be positive, got {0}")]
    NonPositiveMin(f64),

    #[error("maximum duration {max} is below minimum {min}")]
    MaxBelowMin { min: f64, max: f64 },

    #[error("at least one segment must be allowed")]
    ZeroSegments,
}

/// Duration and count limits applied by the segment selector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SegmentBounds {
    #[serde(default = "default_min_duration")]
    pub min_duration: f64,

    #[serde(default = "default_max_duration")]
    pub max_duration: f64,

    #[serde(default = "default_max_segments")]
    pub max_segments: usize,
}

fn default_min_duration() -> f64 {
    DEFAULT_MIN_DURATION
}
fn default_max_duration() -> f64 {
    DEFAULT_MAX_DURATION
}
fn default_max_segments() -> usize {
    DEFAULT_MAX_SEGMENTS
}

impl Default for SegmentBounds {
    fn default() -> Self {
        Self {
            min_duration: DEFAULT_MIN_DURATION,
            max_duration: DEFAULT_MAX_DURATION,
            max_segments: DEFAULT_MAX_SEGMENTS,
        }
    }
}

impl SegmentBounds {
    pub fn new(min_duration: f64, max_duration: f64, max_segments: usize) -> Result<Self, BoundsError> {
        let bounds = Self {
            min_duration,
            max_duration,
            max_segments,
        };
        bounds.validate()?;
        Ok(bounds)
    }

    pub fn validate(&self) -> Result<(), BoundsError> {
        if self.min_duration.is_nan() || self.min_duration <= 0.0 {
            return Err(BoundsError::NonPositiveMin(self.min_duration));
        }
        if self.max_duration < self.min_duration {
            return Err(BoundsError::MaxBelowMin {
                min: self.min_duration,
                max: self.max_duration,
            });
        }
        if self.max_segments == 0 {
            return Err(BoundsError::ZeroSegments);
        }
        Ok(())
    }

    /// Whether a duration falls inside `[min_duration, max_duration]`.
    pub fn accepts(&self, duration: f64) -> bool {
        duration >= self.min_duration && duration <= self.max_duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_rejects_inverted_range() {
        assert!(Segment::new(5.0, 5.0, 1.0).is_none());
        assert!(Segment::new(6.0, 5.0, 1.0).is_none());
        assert!(Segment::new(f64::NAN, 5.0, 1.0).is_none());
        assert!(Segment::new(0.0, 5.0, 1.0).is_some());
    }

    #[test]
    fn test_segment_overlap() {
        let a = Segment::new(0.0, 10.0, 0.0).unwrap();
        let b = Segment::new(10.0, 20.0, 0.0).unwrap();
        let c = Segment::new(5.0, 15.0, 0.0).unwrap();
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
    }

    #[test]
    fn test_whole_segment() {
        let seg = Segment::whole(60.0).unwrap();
        assert_eq!(seg.start, 0.0);
        assert_eq!(seg.duration(), 60.0);
        assert!(Segment::whole(0.0).is_none());
    }

    #[test]
    fn test_bounds_validation() {
        assert!(SegmentBounds::new(20.0, 40.0, 5).is_ok());
        assert_eq!(
            SegmentBounds::new(20.0, 10.0, 5),
            Err(BoundsError::MaxBelowMin { min: 20.0, max: 10.0 })
        );
        assert_eq!(
            SegmentBounds::new(0.0, 10.0, 5),
            Err(BoundsError::NonPositiveMin(0.0))
        );
        assert_eq!(SegmentBounds::new(1.0, 10.0, 0), Err(BoundsError::ZeroSegments));
    }

    #[test]
    fn test_bounds_deserialize_defaults() {
        let bounds: SegmentBounds = serde_json::from_str("{\"max_segments\": 3}").unwrap();
        assert_eq!(bounds.min_duration, DEFAULT_MIN_DURATION);
        assert_eq!(bounds.max_duration, DEFAULT_MAX_DURATION);
        assert_eq!(bounds.max_segments, 3);
        assert!(bounds.accepts(20.0));
        assert!(!bounds.accepts(41.0));
    }
}
