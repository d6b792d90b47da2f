//! Capability traits over the external tools.
//!
//! The pipeline only talks to these traits, so orchestration can be tested
//! against in-memory fakes without spawning real binaries.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use reelcut_models::{Segment, SegmentBounds, TranscriptUnit, VideoId};

use crate::error::MediaResult;
use crate::probe::VideoInfo;

/// A downloaded source video.
#[derive(Debug, Clone)]
pub struct FetchedMedia {
    pub url: String,
    pub video_id: VideoId,
    pub path: PathBuf,
    pub info: VideoInfo,
}

/// Downloads a URL to a local media file.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, dest_dir: &Path) -> MediaResult<FetchedMedia>;
}

/// Produces highlight segments for a source.
///
/// Detection never fails outright: implementations degrade to a
/// whole-video segment.
#[async_trait]
pub trait SegmentDetector: Send + Sync {
    async fn detect(&self, media: &FetchedMedia, bounds: &SegmentBounds) -> Vec<Segment>;
}

/// Produces clip-local transcript units for a media file.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, media: &Path, work_dir: &Path) -> MediaResult<Vec<TranscriptUnit>>;
}

/// Encode, burn-in and composition operations of the media engine.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    async fn probe(&self, path: &Path) -> MediaResult<VideoInfo>;

    /// Cut `segment` out of `source`, re-encoded at mobile width.
    async fn extract_clip(&self, source: &Path, segment: &Segment, output: &Path) -> MediaResult<()>;

    /// Burn an ASS subtitle file into `clip`.
    async fn burn_subtitles(&self, clip: &Path, subtitles: &Path, output: &Path) -> MediaResult<()>;

    /// Stack `clip` above a looping `background` (or black) in a 1080x1920 frame.
    async fn composite(&self, clip: &Path, background: Option<&Path>, output: &Path) -> MediaResult<()>;
}
