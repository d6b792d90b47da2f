//! Structured clip logging and subscriber setup.

use tracing::{error, info, warn, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reelcut_models::ClipId;

use crate::error::Stage;

/// Install the global subscriber: colored text by default, JSON when
/// `LOG_FORMAT=json`. `RUST_LOG` refines the filter.
pub fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

/// Logger that tags every line with the clip id and current stage.
#[derive(Debug, Clone)]
pub struct ClipLogger {
    clip_id: String,
    stage: Stage,
}

impl ClipLogger {
    pub fn new(clip_id: &ClipId) -> Self {
        Self {
            clip_id: clip_id.to_string(),
            stage: Stage::Setup,
        }
    }

    /// Logger for work that has no clip yet, keyed by URL or video id.
    pub fn from_string(clip_id: &str, stage: Stage) -> Self {
        Self {
            clip_id: clip_id.to_string(),
            stage,
        }
    }

    /// Move to the next stage.
    pub fn enter(&mut self, stage: Stage) {
        self.stage = stage;
        info!(clip_id = %self.clip_id, stage = %self.stage, "Stage started");
    }

    pub fn log_progress(&self, message: &str) {
        info!(clip_id = %self.clip_id, stage = %self.stage, "{}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(clip_id = %self.clip_id, stage = %self.stage, "{}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(clip_id = %self.clip_id, stage = %self.stage, "Clip failed: {}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(clip_id = %self.clip_id, "Clip completed: {}", message);
    }

    pub fn clip_id(&self) -> &str {
        &self.clip_id
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn create_span(&self) -> Span {
        tracing::info_span!("clip", clip_id = %self.clip_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelcut_models::VideoId;

    #[test]
    fn test_clip_logger_tracks_stage() {
        let clip = ClipId::new(VideoId::from("abc"), 2);
        let mut logger = ClipLogger::new(&clip);
        assert_eq!(logger.clip_id(), "abc_2");
        assert_eq!(logger.stage(), Stage::Setup);

        logger.enter(Stage::Burn);
        assert_eq!(logger.stage(), Stage::Burn);
    }

    #[test]
    fn test_clip_logger_from_string() {
        let logger = ClipLogger::from_string("https://youtu.be/x", Stage::Fetch);
        assert_eq!(logger.clip_id(), "https://youtu.be/x");
        assert_eq!(logger.stage(), Stage::Fetch);
    }
}
