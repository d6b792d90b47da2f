//! Shared data models for the reelcut pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Highlight segments and selection bounds
//! - Transcript words and phrase-level units
//! - Subtitle style presets
//! - Encoding configuration
//! - Clip identifiers derived from source URLs

pub mod clip;
pub mod encoding;
pub mod segment;
pub mod style;
pub mod timestamp;
pub mod transcript;
pub mod utils;

// Re-export common types
pub use clip::{ClipId, VideoId};
pub use encoding::EncodingConfig;
pub use segment::{BoundsError, Segment, SegmentBounds};
pub use style::{StyleParseError, StylePreset};
pub use transcript::{TranscriptUnit, TranscriptWord};
pub use utils::{extract_youtube_id, is_supported_url, YoutubeIdError, YoutubeIdResult};
