//! Pipeline configuration.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use reelcut_models::{EncodingConfig, SegmentBounds, StylePreset};

use crate::error::{PipelineError, PipelineResult};

/// Extensions accepted when picking a background from a folder.
pub const BACKGROUND_EXTENSIONS: &[&str] = &["mp4", "mov", "avi"];

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root for downloads and per-clip intermediates
    pub work_dir: PathBuf,
    /// Where final outputs are written
    pub output_dir: PathBuf,
    /// Looping background for the bottom box, or a folder to pick one from.
    /// Black when unset, missing or an empty folder.
    pub background: Option<PathBuf>,
    /// Maximum clips in flight
    pub max_concurrent: usize,
    /// Highlight duration and count limits
    pub bounds: SegmentBounds,
    /// Subtitle animation preset
    pub style: StylePreset,
    /// Seed for randomized styling and uniform splits
    pub seed: u64,
    /// Whisper model name
    pub whisper_model: String,
    /// Transcription language; auto-detected when unset
    pub language: Option<String>,
    /// Caption line length in characters
    pub max_chars: usize,
    /// Append the seeded uniform split to the detector chain
    pub uniform_split: bool,
    /// Remove a clip's intermediates after it succeeds
    pub cleanup: bool,
    /// Kill any single ffmpeg call after this many seconds
    pub ffmpeg_timeout_secs: Option<u64>,
    /// Output encoding
    pub encoding: EncodingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("work"),
            output_dir: PathBuf::from("output"),
            background: None,
            max_concurrent: 2,
            bounds: SegmentBounds::default(),
            style: StylePreset::default(),
            seed: 42,
            whisper_model: "small".to_string(),
            language: None,
            max_chars: 12,
            uniform_split: false,
            cleanup: false,
            ffmpeg_timeout_secs: None,
            encoding: EncodingConfig::default(),
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_flag(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

impl PipelineConfig {
    /// Create config from `REELCUT_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let mut bounds = defaults.bounds;
        if let Some(min) = env_parse("REELCUT_MIN_DURATION") {
            bounds.min_duration = min;
        }
        if let Some(max) = env_parse("REELCUT_MAX_DURATION") {
            bounds.max_duration = max;
        }
        if let Some(count) = env_parse("REELCUT_MAX_CLIPS") {
            bounds.max_segments = count;
        }

        let mut encoding = defaults.encoding.clone();
        if let Some(crf) = env_parse("REELCUT_CRF") {
            encoding.crf = crf;
        }
        if let Ok(preset) = std::env::var("REELCUT_PRESET") {
            encoding.preset = preset;
        }

        Self {
            work_dir: std::env::var("REELCUT_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            output_dir: std::env::var("REELCUT_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            background: std::env::var("REELCUT_BACKGROUND").ok().map(PathBuf::from),
            max_concurrent: env_parse("REELCUT_MAX_CONCURRENT").unwrap_or(defaults.max_concurrent),
            bounds,
            style: std::env::var("REELCUT_STYLE")
                .map(|s| StylePreset::from_name_or_default(&s))
                .unwrap_or(defaults.style),
            seed: env_parse("REELCUT_SEED").unwrap_or(defaults.seed),
            whisper_model: std::env::var("REELCUT_WHISPER_MODEL").unwrap_or(defaults.whisper_model),
            language: std::env::var("REELCUT_LANGUAGE").ok().filter(|s| !s.is_empty()),
            max_chars: env_parse("REELCUT_MAX_CHARS").unwrap_or(defaults.max_chars),
            uniform_split: env_flag("REELCUT_UNIFORM_SPLIT").unwrap_or(defaults.uniform_split),
            cleanup: env_flag("REELCUT_CLEANUP").unwrap_or(defaults.cleanup),
            ffmpeg_timeout_secs: env_parse("REELCUT_FFMPEG_TIMEOUT"),
            encoding,
        }
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> PipelineResult<()> {
        self.bounds
            .validate()
            .map_err(|e| PipelineError::config(e.to_string()))?;
        if self.max_concurrent == 0 {
            return Err(PipelineError::config("max_concurrent must be at least 1"));
        }
        if self.max_chars == 0 {
            return Err(PipelineError::config("max_chars must be at least 1"));
        }
        Ok(())
    }

    /// Background video for one clip.
    ///
    /// A file is used as-is. For a folder, one video is drawn with the
    /// configured seed mixed with `salt`, so reruns pick the same files.
    pub async fn pick_background(&self, salt: u64) -> Option<PathBuf> {
        let path = self.background.as_ref()?;
        let metadata = tokio::fs::metadata(path).await.ok()?;
        if metadata.is_file() {
            return Some(path.clone());
        }

        let mut candidates = background_candidates(path).await;
        if candidates.is_empty() {
            return None;
        }
        let mut rng = StdRng::seed_from_u64(self.seed ^ salt.wrapping_mul(0x9E37_79B9_7F4A_7C15));
        let pick = rng.random_range(0..candidates.len());
        Some(candidates.swap_remove(pick))
    }
}

/// Videos directly inside `dir`, sorted by path.
async fn background_candidates(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return found;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let is_video = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| BACKGROUND_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if is_video && path.is_file() {
            found.push(path);
        }
    }
    found.sort();
    found
}
