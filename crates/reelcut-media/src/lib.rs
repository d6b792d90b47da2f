#![deny(unreachable_patterns)]
//! External tool wrappers for the reelcut pipeline.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building and a runner with progress and timeout
//! - yt-dlp download with a format-fallback ladder
//! - Highlight selection as an ordered strategy chain
//! - Whisper transcription grouped into caption lines
//! - Styled ASS subtitle rendering and burn-in
//! - Vertical 1080x1920 composition over a looping background
//!
//! Orchestration code depends only on the traits in [`tools`].

pub mod command;
pub mod compose;
pub mod download;
pub mod engine;
pub mod error;
pub mod highlights;
pub mod probe;
pub mod progress;
pub mod retry;
pub mod subtitles;
pub mod tools;
pub mod transcribe;

pub use command::{check_ffmpeg, check_ffprobe, check_ytdlp, require_tool, FfmpegCommand, FfmpegRunner};
pub use compose::{build_composite_command, composite_with_fallback, CompositedClip, StackLayout};
pub use download::YtDlpFetcher;
pub use engine::FfmpegEngine;
pub use error::{MediaError, MediaResult};
pub use highlights::{
    AutoEditorStrategy, SceneChangeStrategy, SegmentSelector, SegmentStrategy, UniformSplitStrategy,
};
pub use probe::{probe_video, VideoInfo};
pub use progress::FfmpegProgress;
pub use retry::{retry_async, RetryConfig};
pub use subtitles::{
    burn_in, burn_in_with_fallback, RenderedClip, SubtitleEvent, SubtitleHeader, SubtitleRenderer,
    SubtitleTrack,
};
pub use tools::{FetchedMedia, Fetcher, MediaEngine, SegmentDetector, Transcriber};
pub use transcribe::WhisperTranscriber;
