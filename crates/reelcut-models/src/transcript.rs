//! Timestamped transcript text.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A single recognized word, clip-local seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TranscriptWord {
    pub start: f64,
    pub end: f64,
    pub word: String,
}

impl TranscriptWord {
    pub fn new(start: f64, end: f64, word: impl Into<String>) -> Self {
        Self {
            start,
            end,
            word: word.into(),
        }
    }
}

/// A phrase-level caption line aligned to the clip timeline.
///
/// Units are ordered by `start`. Non-overlap is assumed, not enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TranscriptUnit {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl TranscriptUnit {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    /// Unit duration in seconds, never negative.
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// Whitespace-delimited words of the unit text.
    pub fn words(&self) -> Vec<&str> {
        self.text.split_whitespace().collect()
    }

    /// Whether the unit carries no visible text.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}
