//! Per-clip pipeline: extract, transcribe, composite, burn subtitles.
//!
//! Subtitles are laid out on the 1080x1920 canvas, so they are burned into
//! the composited frame. Every intermediate file of a clip lives in
//! `<work_dir>/<video_id>/<clip_work_dir>/`, so clips running concurrently
//! never share a path.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, Instrument};

use reelcut_media::subtitles::{burn_in_with_fallback, SubtitleRenderer};
use reelcut_media::{
    composite_with_fallback, FfmpegEngine, Fetcher, MediaEngine, SegmentDetector, SegmentSelector, Transcriber,
    UniformSplitStrategy, WhisperTranscriber, YtDlpFetcher,
};
use reelcut_models::{ClipId, Segment};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult, Stage};
use crate::logging::ClipLogger;

const RAW_CLIP: &str = "clip.mp4";
const STACKED_CLIP: &str = "stacked.mp4";
const ASS_FILE: &str = "subtitles.ass";
const SRT_FILE: &str = "subtitles.srt";

/// The external capabilities a run depends on.
#[derive(Clone)]
pub struct PipelineServices {
    pub fetcher: Arc<dyn Fetcher>,
    pub detector: Arc<dyn SegmentDetector>,
    pub transcriber: Arc<dyn Transcriber>,
    pub engine: Arc<dyn MediaEngine>,
}

impl PipelineServices {
    /// Services backed by yt-dlp, auto-editor, whisper and ffmpeg.
    pub fn from_config(config: &PipelineConfig) -> Self {
        let mut selector = SegmentSelector::standard();
        if config.uniform_split {
            selector = selector.with_strategy(Box::new(UniformSplitStrategy::new(config.seed)));
        }
        debug!(strategies = ?selector.strategy_names(), "Segment selector ready");

        let transcriber = WhisperTranscriber::new(config.whisper_model.clone())
            .with_language(config.language.clone())
            .with_max_chars(config.max_chars);

        let mut engine = FfmpegEngine::new(config.encoding.clone());
        if let Some(secs) = config.ffmpeg_timeout_secs {
            engine = engine.with_timeout(secs);
        }

        Self {
            fetcher: Arc::new(YtDlpFetcher::new()),
            detector: Arc::new(selector),
            transcriber: Arc::new(transcriber),
            engine: Arc::new(engine),
        }
    }
}

/// One clip to produce from a fetched source.
#[derive(Debug, Clone)]
pub struct ClipJob {
    pub clip_id: ClipId,
    pub source: PathBuf,
    pub segment: Segment,
}

/// A finished clip.
#[derive(Debug, Clone, Serialize)]
pub struct ClipOutput {
    pub clip_id: ClipId,
    pub path: PathBuf,
    pub segment: Segment,
    /// Caption lines burned in
    pub subtitle_lines: usize,
    /// Burned with the plain retry track
    pub simplified_subtitles: bool,
    /// Black-padded layout used after the stacked composite failed
    pub padded_layout: bool,
    /// Why the clip has no subtitles, if transcription failed
    pub transcription_error: Option<String>,
}

/// Runs the stages of one clip in order.
#[derive(Clone)]
pub struct ClipPipeline {
    config: Arc<PipelineConfig>,
    services: PipelineServices,
    renderer: SubtitleRenderer,
}

impl ClipPipeline {
    pub fn new(config: Arc<PipelineConfig>, services: PipelineServices) -> Self {
        let renderer = SubtitleRenderer::new(config.seed);
        Self {
            config,
            services,
            renderer,
        }
    }

    /// Directory holding a clip's intermediates.
    pub fn clip_work_dir(&self, clip_id: &ClipId) -> PathBuf {
        self.config
            .work_dir
            .join(clip_id.video_id.as_str())
            .join(clip_id.work_dir_name())
    }

    pub async fn run(&self, job: &ClipJob) -> PipelineResult<ClipOutput> {
        let mut logger = ClipLogger::new(&job.clip_id);
        let span = logger.create_span();

        let result = self.run_stages(job, &mut logger).instrument(span).await;
        if let Err(e) = &result {
            logger.log_error(&e.to_string());
        }
        result
    }

    async fn run_stages(&self, job: &ClipJob, logger: &mut ClipLogger) -> PipelineResult<ClipOutput> {
        let engine = self.services.engine.as_ref();
        let clip_dir = self.clip_work_dir(&job.clip_id);
        tokio::fs::create_dir_all(&clip_dir).await?;
        tokio::fs::create_dir_all(&self.config.output_dir).await?;

        logger.enter(Stage::Extract);
        let raw = clip_dir.join(RAW_CLIP);
        engine
            .extract_clip(&job.source, &job.segment, &raw)
            .await
            .map_err(|e| PipelineError::tool(Stage::Extract, e))?;

        logger.enter(Stage::Transcribe);
        let (units, transcription_error) = match self.services.transcriber.transcribe(&raw, &clip_dir).await {
            Ok(units) => (units, None),
            Err(e) => {
                let err = PipelineError::TranscriptionFailure(e);
                logger.log_warning(&format!("{}, continuing without subtitles", err));
                (Vec::new(), Some(err.to_string()))
            }
        };

        let track = self.renderer.render(&units, self.config.style);
        let plain = self.renderer.render_plain(&units, self.config.style);
        if !track.is_empty() {
            tokio::fs::write(clip_dir.join(SRT_FILE), track.to_srt()).await?;
        }

        logger.enter(Stage::Composite);
        let output = self.config.output_dir.join(job.clip_id.final_file_name());
        // nothing to burn: the composite is the final file
        let stacked = if track.is_empty() {
            output.clone()
        } else {
            clip_dir.join(STACKED_CLIP)
        };
        let background = self.config.pick_background(job.clip_id.index as u64).await;
        let composited = composite_with_fallback(engine, &raw, background.as_deref(), &stacked)
            .await
            .map_err(|e| PipelineError::tool(Stage::Composite, e))?;
        if composited.padded_fallback {
            logger.log_warning("Stacked composite rejected, used padded layout instead");
        }

        logger.enter(Stage::Burn);
        let rendered = burn_in_with_fallback(
            engine,
            &composited.path,
            &track,
            &plain,
            &clip_dir.join(ASS_FILE),
            &output,
        )
        .await
        .map_err(|e| PipelineError::tool(Stage::Burn, e))?;
        if rendered.simplified {
            logger.log_warning("Styled subtitles rejected, burned plain track instead");
        }

        if self.config.cleanup {
            remove_intermediates(&clip_dir, logger).await;
        }

        logger.log_completion(&output.display().to_string());
        Ok(ClipOutput {
            clip_id: job.clip_id.clone(),
            path: rendered.path,
            segment: job.segment,
            subtitle_lines: units.len(),
            simplified_subtitles: rendered.simplified,
            padded_layout: composited.padded_fallback,
            transcription_error,
        })
    }
}

async fn remove_intermediates(clip_dir: &Path, logger: &ClipLogger) {
    if let Err(e) = tokio::fs::remove_dir_all(clip_dir).await {
        logger.log_warning(&format!("Failed to remove {}: {}", clip_dir.display(), e));
    }
}
