//! Source and clip identifiers.

use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::utils::extract_youtube_id;

/// Identifier of a fetched source video.
///
/// The YouTube id when the URL carries one, otherwise a timestamped
/// generated id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    /// Derive an id from a source URL.
    pub fn from_url(url: &str) -> Self {
        match extract_youtube_id(url) {
            Ok(id) => Self(id),
            Err(_) => Self::generated(),
        }
    }

    /// A fresh `video_<timestamp>_<short uuid>` id.
    pub fn generated() -> Self {
        let stamp = Utc::now().format("%Y%m%d%H%M%S");
        let short = Uuid::new_v4().simple().to_string();
        Self(format!("video_{}_{}", stamp, &short[..8]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of one highlight clip of a source video.
///
/// Displays as `<video_id>_<n>` (1-based). The run token keeps the
/// working directories of concurrent runs apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct ClipId {
    pub video_id: VideoId,
    pub index: usize,
    pub run: Uuid,
}

impl ClipId {
    pub fn new(video_id: VideoId, index: usize) -> Self {
        Self {
            video_id,
            index,
            run: Uuid::new_v4(),
        }
    }

    /// Directory name for this clip's intermediate artifacts.
    pub fn work_dir_name(&self) -> String {
        let run = self.run.simple().to_string();
        format!("{}_{}", self, &run[..8])
    }

    /// File name of the final composited output.
    pub fn final_file_name(&self) -> String {
        format!("final_{}.mp4", self)
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.video_id, self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_id_from_youtube_url() {
        let id = VideoId::from_url("https://youtu.be/dQw4w9WgXcQ");
        assert_eq!(id.as_str(), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_video_id_fallback_is_generated() {
        let id = VideoId::from_url("https://example.com/clip.mp4");
        assert!(id.as_str().starts_with("video_"));
        assert_ne!(id, VideoId::from_url("https://example.com/clip.mp4"));
    }

    #[test]
    fn test_clip_id_names() {
        let clip = ClipId::new(VideoId::from("abc"), 2);
        assert_eq!(clip.to_string(), "abc_2");
        assert_eq!(clip.final_file_name(), "final_abc_2.mp4");
        assert!(clip.work_dir_name().starts_with("abc_2_"));

        let other = ClipId::new(VideoId::from("abc"), 2);
        assert_ne!(clip.work_dir_name(), other.work_dir_name());
    }
}
