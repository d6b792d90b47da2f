//! Pipeline error types.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use reelcut_media::MediaError;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Pipeline stage a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Setup,
    Fetch,
    Detect,
    Extract,
    Transcribe,
    Burn,
    Composite,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Setup => "setup",
            Stage::Fetch => "fetch",
            Stage::Detect => "detect",
            Stage::Extract => "extract",
            Stage::Transcribe => "transcribe",
            Stage::Burn => "burn",
            Stage::Composite => "composite",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Fetch failed for {url}: {source}")]
    FetchFailure {
        url: String,
        #[source]
        source: MediaError,
    },

    #[error("Segment detection failed: {0}")]
    SegmentDetectionFailure(String),

    #[error("Transcription failed: {0}")]
    TranscriptionFailure(#[source] MediaError),

    #[error("{stage} failed: {source}")]
    ExternalToolFailure {
        stage: Stage,
        #[source]
        source: MediaError,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn fetch(url: impl Into<String>, source: MediaError) -> Self {
        Self::FetchFailure {
            url: url.into(),
            source,
        }
    }

    pub fn tool(stage: Stage, source: MediaError) -> Self {
        Self::ExternalToolFailure { stage, source }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Stage responsible for the failure.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::FetchFailure { .. } => Stage::Fetch,
            PipelineError::SegmentDetectionFailure(_) => Stage::Detect,
            PipelineError::TranscriptionFailure(_) => Stage::Transcribe,
            PipelineError::ExternalToolFailure { stage, .. } => *stage,
            PipelineError::Config(_) | PipelineError::Io(_) => Stage::Setup,
        }
    }
}
