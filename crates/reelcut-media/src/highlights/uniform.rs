//! Seeded varied-length split, for sources where detectors find nothing.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use reelcut_models::{Segment, SegmentBounds};

use super::SegmentStrategy;
use crate::error::MediaResult;
use crate::tools::FetchedMedia;

/// Average seconds of source per planned clip.
const SECS_PER_CLIP: f64 = 20.0;

/// Cuts the source into consecutive clips of random length within bounds.
#[derive(Debug, Clone)]
pub struct UniformSplitStrategy {
    seed: u64,
}

impl Default for UniformSplitStrategy {
    fn default() -> Self {
        Self { seed: 42 }
    }
}

impl UniformSplitStrategy {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

#[async_trait]
impl SegmentStrategy for UniformSplitStrategy {
    fn name(&self) -> &'static str {
        "uniform-split"
    }

    async fn select(&self, media: &FetchedMedia, bounds: &SegmentBounds) -> MediaResult<Vec<Segment>> {
        Ok(plan_uniform_split(media.info.duration, bounds, self.seed))
    }
}

/// Plan consecutive clips covering the start of the source.
///
/// Clip count is `min(max_segments, max(2, duration / 20))`. Each clip but the
/// last draws its length from `[min, min(max, remaining / 2)]`; the last takes
/// what remains, capped at `max`. A remainder shorter than `min` extends the
/// previous clip.
pub fn plan_uniform_split(duration: f64, bounds: &SegmentBounds, seed: u64) -> Vec<Segment> {
    if duration <= bounds.min_duration {
        return Segment::whole(duration).into_iter().collect();
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let num_clips = bounds.max_segments.min(((duration / SECS_PER_CLIP) as usize).max(2));

    let mut lengths: Vec<f64> = Vec::with_capacity(num_clips);
    let mut remaining = duration;

    for i in 0..num_clips {
        if i == num_clips - 1 {
            if remaining >= bounds.min_duration {
                lengths.push(remaining.min(bounds.max_duration));
            } else if let Some(last) = lengths.last_mut() {
                *last += remaining;
            }
            break;
        }

        let max_length = bounds.max_duration.min(remaining * 0.5);
        if max_length <= bounds.min_duration {
            lengths.push(remaining.min(bounds.max_duration));
            break;
        }

        let length = rng.random_range(bounds.min_duration..max_length);
        lengths.push(length);
        remaining -= length;

        if remaining < bounds.min_duration {
            break;
        }
    }

    let mut segments = Vec::with_capacity(lengths.len());
    let mut start = 0.0;
    for length in lengths {
        let end = (start + length).min(duration);
        if let Some(segment) = Segment::new(start, end, 0.0) {
            segments.push(segment);
        }
        start = end;
    }
    segments
}
