//! Batch driver.
//!
//! Every URL runs as its own task. Clips from all URLs share one admission
//! gate, so at most `max_concurrent` clip pipelines are in flight. A failing
//! clip or URL is recorded in the report and never stops the others.
//!
//! Downloads and outputs are named after the video id, so each video is
//! processed by one task only.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use reelcut_models::{extract_youtube_id, ClipId, VideoId};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult, Stage};
use crate::logging::ClipLogger;
use crate::pipeline::{ClipJob, ClipOutput, ClipPipeline, PipelineServices};

/// A clip (or a whole URL) that produced no output.
#[derive(Debug, Clone, Serialize)]
pub struct ClipFailure {
    /// Clip id, or the video id when no clip could be planned
    pub clip_id: String,
    pub stage: Stage,
    pub message: String,
}

impl ClipFailure {
    fn from_error(clip_id: impl Into<String>, err: &PipelineError) -> Self {
        Self {
            clip_id: clip_id.into(),
            stage: err.stage(),
            message: err.to_string(),
        }
    }
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outputs: Vec<ClipOutput>,
    pub failures: Vec<ClipFailure>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Human-readable summary, one line per clip.
    pub fn summary(&self) -> String {
        let elapsed = (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0;
        let mut out = format!(
            "Finished in {:.1}s: {} clip(s) written, {} failure(s)\n",
            elapsed,
            self.outputs.len(),
            self.failures.len()
        );
        for output in &self.outputs {
            let mut notes = Vec::new();
            match (&output.transcription_error, output.simplified_subtitles) {
                (Some(_), _) => notes.push("no subtitles"),
                (None, true) => notes.push("plain subtitles"),
                (None, false) => {}
            }
            if output.padded_layout {
                notes.push("padded layout");
            }
            let note = if notes.is_empty() {
                String::new()
            } else {
                format!(" ({})", notes.join(", "))
            };
            out.push_str(&format!("  ok   {} -> {}{}\n", output.clip_id, output.path.display(), note));
        }
        for failure in &self.failures {
            out.push_str(&format!(
                "  FAIL {} [{}] {}\n",
                failure.clip_id, failure.stage, failure.message
            ));
        }
        out
    }
}

type ClipResult = Result<ClipOutput, ClipFailure>;

/// Drives URLs through fetch, selection and the per-clip pipeline.
pub struct BatchDriver {
    config: Arc<PipelineConfig>,
    services: PipelineServices,
    gate: Arc<Semaphore>,
}

impl BatchDriver {
    pub fn new(config: PipelineConfig, services: PipelineServices) -> Self {
        let gate = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        Self {
            config: Arc::new(config),
            services,
            gate,
        }
    }

    pub async fn run(&self, urls: Vec<String>) -> BatchReport {
        let started_at = Utc::now();
        let urls = dedupe_by_video(urls);
        info!(
            urls = urls.len(),
            max_concurrent = self.config.max_concurrent,
            "Starting batch"
        );

        let handles: Vec<(String, JoinHandle<Vec<ClipResult>>)> = urls
            .into_iter()
            .map(|url| {
                let config = Arc::clone(&self.config);
                let services = self.services.clone();
                let gate = Arc::clone(&self.gate);
                let task_url = url.clone();
                let handle = tokio::spawn(async move { process_url(config, services, gate, task_url).await });
                (url, handle)
            })
            .collect();

        let mut outputs = Vec::new();
        let mut failures = Vec::new();
        for (url, joined) in join_all(handles.into_iter().map(|(url, h)| async move { (url, h.await) })).await {
            match joined {
                Ok(results) => {
                    for result in results {
                        match result {
                            Ok(output) => outputs.push(output),
                            Err(failure) => failures.push(failure),
                        }
                    }
                }
                Err(e) => {
                    error!(url = %url, "URL task panicked: {}", e);
                    failures.push(ClipFailure {
                        clip_id: url,
                        stage: Stage::Setup,
                        message: format!("task aborted: {}", e),
                    });
                }
            }
        }

        let report = BatchReport {
            started_at,
            finished_at: Utc::now(),
            outputs,
            failures,
        };
        info!(
            outputs = report.outputs.len(),
            failures = report.failures.len(),
            "Batch complete"
        );
        report
    }
}

async fn process_url(
    config: Arc<PipelineConfig>,
    services: PipelineServices,
    gate: Arc<Semaphore>,
    url: String,
) -> Vec<ClipResult> {
    let mut logger = ClipLogger::from_string(&url, Stage::Fetch);

    let media = match services.fetcher.fetch(&url, &config.work_dir).await {
        Ok(media) => media,
        Err(e) => {
            let err = PipelineError::fetch(&url, e);
            logger.log_error(&err.to_string());
            return vec![Err(ClipFailure::from_error(VideoId::from_url(&url).to_string(), &err))];
        }
    };

    logger.enter(Stage::Detect);
    let segments = services.detector.detect(&media, &config.bounds).await;
    if segments.is_empty() {
        let err = PipelineError::SegmentDetectionFailure(format!(
            "no usable segment in {:.1}s source",
            media.info.duration
        ));
        logger.log_error(&err.to_string());
        return vec![Err(ClipFailure::from_error(media.video_id.to_string(), &err))];
    }
    logger.log_progress(&format!("{} segment(s) selected", segments.len()));

    let pipeline = ClipPipeline::new(Arc::clone(&config), services);
    let mut results = Vec::with_capacity(segments.len());
    let mut handles: Vec<(ClipId, JoinHandle<ClipResult>)> = Vec::with_capacity(segments.len());

    for (i, segment) in segments.into_iter().enumerate() {
        let job = ClipJob {
            clip_id: ClipId::new(media.video_id.clone(), i + 1),
            source: media.path.clone(),
            segment,
        };

        let Ok(permit) = Arc::clone(&gate).acquire_owned().await else {
            warn!(clip_id = %job.clip_id, "Admission gate closed");
            results.push(Err(ClipFailure::from_error(
                job.clip_id.to_string(),
                &PipelineError::config("admission gate closed"),
            )));
            continue;
        };

        let pipeline = pipeline.clone();
        let clip_id = job.clip_id.clone();
        let handle = tokio::spawn(async move {
            let _permit = permit;
            pipeline
                .run(&job)
                .await
                .map_err(|e| ClipFailure::from_error(job.clip_id.to_string(), &e))
        });
        handles.push((clip_id, handle));
    }

    for (clip_id, handle) in handles {
        results.push(match handle.await {
            Ok(result) => result,
            Err(e) => Err(ClipFailure {
                clip_id: clip_id.to_string(),
                stage: Stage::Setup,
                message: format!("task aborted: {}", e),
            }),
        });
    }
    results
}

/// Keep the first URL naming each video.
///
/// YouTube URLs compare by video id, so `youtu.be/x` and `watch?v=x` are
/// one entry. Other URLs compare as trimmed strings.
pub fn dedupe_by_video(urls: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.into_iter()
        .filter(|url| {
            let key = extract_youtube_id(url).unwrap_or_else(|_| url.trim().to_string());
            let first = seen.insert(key);
            if !first {
                warn!(url = %url, "Skipping duplicate video");
            }
            first
        })
        .collect()
}

/// Read URLs from a file, one per line. Blank lines and `#` comments are skipped.
pub async fn read_urls_file(path: &Path) -> PipelineResult<Vec<String>> {
    let contents = tokio::fs::read_to_string(path).await?;
    Ok(parse_urls(&contents))
}

pub fn parse_urls(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
