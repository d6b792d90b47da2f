//! Batch and clip pipeline behaviour against in-memory tool fakes.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reelcut_media::{
    FetchedMedia, Fetcher, MediaEngine, MediaError, MediaResult, SegmentDetector, Transcriber, VideoInfo,
};
use reelcut_models::{ClipId, Segment, SegmentBounds, StylePreset, TranscriptUnit, VideoId};
use reelcut_worker::{BatchDriver, ClipJob, ClipPipeline, PipelineConfig, PipelineServices, Stage};

fn info(duration: f64) -> VideoInfo {
    sized(duration, 1920, 1080)
}

fn sized(duration: f64, width: u32, height: u32) -> VideoInfo {
    VideoInfo {
        duration,
        width,
        height,
        fps: 30.0,
        codec: "h264".to_string(),
        size: 1,
        has_audio: true,
    }
}

/// Writes a placeholder source file; URLs containing "broken" fail.
struct FakeFetcher;

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, url: &str, dest_dir: &Path) -> MediaResult<FetchedMedia> {
        if url.contains("broken") {
            return Err(MediaError::download_failed("yt-dlp failed: ERROR: Video unavailable"));
        }
        let video_id = VideoId::from_url(url);
        let dir = dest_dir.join(video_id.as_str());
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join("source.mp4");
        tokio::fs::write(&path, b"source").await?;
        Ok(FetchedMedia {
            url: url.to_string(),
            video_id,
            path,
            info: info(60.0),
        })
    }
}

struct FixedDetector(Vec<Segment>);

#[async_trait]
impl SegmentDetector for FixedDetector {
    async fn detect(&self, _media: &FetchedMedia, _bounds: &SegmentBounds) -> Vec<Segment> {
        self.0.clone()
    }
}

struct FakeTranscriber {
    fail: bool,
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, _media: &Path, _work_dir: &Path) -> MediaResult<Vec<TranscriptUnit>> {
        if self.fail {
            return Err(MediaError::transcription_failed("whisper failed: CUDA out of memory"));
        }
        Ok(vec![
            TranscriptUnit::new(0.0, 1.2, "HELLO WORLD"),
            TranscriptUnit::new(1.4, 2.6, "SECOND LINE"),
        ])
    }
}

/// Copies files around instead of encoding, with scripted failures.
///
/// Composited files are probed at 1080x1920, everything else at the
/// extracted 1080x608.
#[derive(Default)]
struct FakeEngine {
    burn_failures: AtomicUsize,
    composite_fails_for: Option<String>,
    stacked_fails: bool,
    burned: Mutex<Vec<String>>,
    burn_inputs: Mutex<Vec<PathBuf>>,
    composite_calls: Mutex<Vec<Option<PathBuf>>>,
    composited: Mutex<Vec<PathBuf>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[async_trait]
impl MediaEngine for FakeEngine {
    async fn probe(&self, path: &Path) -> MediaResult<VideoInfo> {
        if self.composited.lock().unwrap().iter().any(|p| p == path) {
            Ok(sized(10.0, 1080, 1920))
        } else {
            Ok(sized(10.0, 1080, 608))
        }
    }

    async fn extract_clip(&self, _source: &Path, _segment: &Segment, output: &Path) -> MediaResult<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        tokio::fs::write(output, b"clip").await?;
        Ok(())
    }

    async fn burn_subtitles(&self, clip: &Path, subtitles: &Path, output: &Path) -> MediaResult<()> {
        let ass = tokio::fs::read_to_string(subtitles).await?;
        self.burned.lock().unwrap().push(ass);
        self.burn_inputs.lock().unwrap().push(clip.to_path_buf());
        let remaining = self.burn_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.burn_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(MediaError::ffmpeg_failed("libass error", None, Some(1)));
        }
        tokio::fs::copy(clip, output).await?;
        Ok(())
    }

    async fn composite(&self, clip: &Path, background: Option<&Path>, output: &Path) -> MediaResult<()> {
        self.composite_calls
            .lock()
            .unwrap()
            .push(background.map(Path::to_path_buf));
        if let Some(needle) = &self.composite_fails_for {
            if output.to_string_lossy().contains(needle.as_str()) {
                return Err(MediaError::ffmpeg_failed("vstack failed", None, Some(1)));
            }
        }
        if self.stacked_fails && background.is_some() {
            return Err(MediaError::ffmpeg_failed("background decode failed", None, Some(1)));
        }
        tokio::fs::copy(clip, output).await?;
        self.composited.lock().unwrap().push(output.to_path_buf());
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

fn segments(n: usize) -> Vec<Segment> {
    (0..n)
        .map(|i| Segment::new(i as f64 * 20.0, i as f64 * 20.0 + 15.0, 1.0).unwrap())
        .collect()
}

fn config(root: &Path) -> PipelineConfig {
    PipelineConfig {
        work_dir: root.join("work"),
        output_dir: root.join("out"),
        style: StylePreset::Bounce,
        ..Default::default()
    }
}

fn services(engine: Arc<FakeEngine>, transcriber_fails: bool, clips: usize) -> PipelineServices {
    PipelineServices {
        fetcher: Arc::new(FakeFetcher),
        detector: Arc::new(FixedDetector(segments(clips))),
        transcriber: Arc::new(FakeTranscriber {
            fail: transcriber_fails,
        }),
        engine,
    }
}

fn job(root: &Path) -> ClipJob {
    ClipJob {
        clip_id: ClipId::new(VideoId::from("dQw4w9WgXcQ"), 1),
        source: root.join("source.mp4"),
        segment: Segment::new(0.0, 15.0, 1.0).unwrap(),
    }
}

#[tokio::test]
async fn transcription_failure_still_produces_output() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine::default());
    let pipeline = ClipPipeline::new(
        Arc::new(config(dir.path())),
        services(Arc::clone(&engine), true, 1),
    );

    let output = pipeline.run(&job(dir.path())).await.unwrap();

    assert!(output.path.ends_with("final_dQw4w9WgXcQ_1.mp4"));
    assert!(output.path.exists());
    assert_eq!(output.subtitle_lines, 0);
    assert!(output.transcription_error.unwrap().contains("CUDA out of memory"));
    // empty track: nothing to burn, the composite is written straight to the output
    assert!(engine.burned.lock().unwrap().is_empty());
    assert_eq!(*engine.composited.lock().unwrap(), vec![output.path.clone()]);
}

#[tokio::test]
async fn subtitles_are_burned_into_the_composited_frame() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine::default());
    let pipeline = ClipPipeline::new(
        Arc::new(config(dir.path())),
        services(Arc::clone(&engine), false, 1),
    );

    let output = pipeline.run(&job(dir.path())).await.unwrap();

    assert!(output.path.ends_with("final_dQw4w9WgXcQ_1.mp4"));
    assert!(output.path.exists());
    let inputs = engine.burn_inputs.lock().unwrap();
    assert_eq!(inputs.len(), 1);
    assert!(inputs[0].ends_with("stacked.mp4"));
    assert!(engine.composited.lock().unwrap().contains(&inputs[0]));
    assert!(engine.burned.lock().unwrap()[0].contains("PlayResY: 1920"));
}

#[tokio::test]
async fn stacked_composite_failure_falls_back_to_padded_layout() {
    let dir = tempfile::tempdir().unwrap();
    let background = dir.path().join("bg.mp4");
    tokio::fs::write(&background, b"bg").await.unwrap();
    let mut cfg = config(dir.path());
    cfg.background = Some(background.clone());

    let engine = Arc::new(FakeEngine {
        stacked_fails: true,
        ..Default::default()
    });
    let pipeline = ClipPipeline::new(Arc::new(cfg), services(Arc::clone(&engine), false, 1));

    let output = pipeline.run(&job(dir.path())).await.unwrap();

    assert!(output.padded_layout);
    assert!(!output.simplified_subtitles);
    assert!(output.path.exists());
    assert_eq!(*engine.composite_calls.lock().unwrap(), vec![Some(background), None]);
    assert_eq!(engine.burned.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn composite_failure_without_background_is_not_retried() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine {
        composite_fails_for: Some("dQw4w9WgXcQ_1".to_string()),
        ..Default::default()
    });
    let pipeline = ClipPipeline::new(
        Arc::new(config(dir.path())),
        services(Arc::clone(&engine), false, 1),
    );

    let err = pipeline.run(&job(dir.path())).await.unwrap_err();

    assert_eq!(err.stage(), Stage::Composite);
    assert_eq!(engine.composite_calls.lock().unwrap().len(), 1);
    assert!(engine.burned.lock().unwrap().is_empty());
}

#[tokio::test]
async fn burn_failure_retries_once_with_plain_track() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine {
        burn_failures: AtomicUsize::new(1),
        ..Default::default()
    });
    let pipeline = ClipPipeline::new(
        Arc::new(config(dir.path())),
        services(Arc::clone(&engine), false, 1),
    );

    let output = pipeline.run(&job(dir.path())).await.unwrap();

    assert!(output.simplified_subtitles);
    assert_eq!(output.subtitle_lines, 2);
    let burned = engine.burned.lock().unwrap();
    assert_eq!(burned.len(), 2);
    assert!(burned[0].contains("\\fscx125"));
    assert!(!burned[1].contains('{'));
    assert!(burned[1].contains(",,HELLO WORLD\n"));
}

#[tokio::test]
async fn second_burn_failure_fails_the_clip_at_burn_stage() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine {
        burn_failures: AtomicUsize::new(2),
        ..Default::default()
    });
    let pipeline = ClipPipeline::new(
        Arc::new(config(dir.path())),
        services(Arc::clone(&engine), false, 1),
    );

    let err = pipeline.run(&job(dir.path())).await.unwrap_err();
    assert_eq!(err.stage(), Stage::Burn);
    assert_eq!(engine.burned.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn cleanup_removes_intermediates_only_on_success() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path());
    cfg.cleanup = true;
    let engine = Arc::new(FakeEngine::default());
    let pipeline = ClipPipeline::new(Arc::new(cfg), services(Arc::clone(&engine), false, 1));

    let job = job(dir.path());
    let clip_dir = pipeline.clip_work_dir(&job.clip_id);
    let output = pipeline.run(&job).await.unwrap();

    assert!(output.path.exists());
    assert!(!clip_dir.exists());
}

#[tokio::test]
async fn failing_clip_does_not_stop_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine {
        composite_fails_for: Some("dQw4w9WgXcQ_2".to_string()),
        ..Default::default()
    });
    let driver = BatchDriver::new(config(dir.path()), services(Arc::clone(&engine), false, 3));

    let report = driver
        .run(vec![
            "https://youtu.be/dQw4w9WgXcQ".to_string(),
            "https://youtu.be/broken00000".to_string(),
        ])
        .await;

    assert_eq!(report.outputs.len(), 2);
    assert_eq!(report.failures.len(), 2);

    let composite = report
        .failures
        .iter()
        .find(|f| f.stage == Stage::Composite)
        .unwrap();
    assert_eq!(composite.clip_id, "dQw4w9WgXcQ_2");
    assert!(composite.message.contains("vstack failed"));

    let fetch = report.failures.iter().find(|f| f.stage == Stage::Fetch).unwrap();
    assert!(fetch.message.contains("Video unavailable"));

    let mut names: Vec<String> = report
        .outputs
        .iter()
        .map(|o| o.path.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["final_dQw4w9WgXcQ_1.mp4", "final_dQw4w9WgXcQ_3.mp4"]);
    assert!(report.summary().contains("FAIL dQw4w9WgXcQ_2 [composite]"));
}

#[tokio::test]
async fn repeated_video_is_processed_once() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine::default());
    let driver = BatchDriver::new(config(dir.path()), services(Arc::clone(&engine), false, 2));

    let report = driver
        .run(vec![
            "https://youtu.be/dQw4w9WgXcQ".to_string(),
            "https://youtu.be/dQw4w9WgXcQ".to_string(),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
        ])
        .await;

    assert!(report.is_success());
    let mut names: Vec<String> = report
        .outputs
        .iter()
        .map(|o| o.path.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["final_dQw4w9WgXcQ_1.mp4", "final_dQw4w9WgXcQ_2.mp4"]);
}

#[tokio::test]
async fn admission_gate_bounds_clips_in_flight() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path());
    cfg.max_concurrent = 2;
    let engine = Arc::new(FakeEngine::default());
    let driver = BatchDriver::new(cfg, services(Arc::clone(&engine), false, 4));

    let report = driver
        .run(vec![
            "https://youtu.be/aaaaaaaaaaa".to_string(),
            "https://youtu.be/bbbbbbbbbbb".to_string(),
        ])
        .await;

    assert!(report.is_success());
    assert_eq!(report.outputs.len(), 8);
    assert!(engine.max_in_flight.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn no_segments_is_reported_as_detection_failure() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(FakeEngine::default());
    let driver = BatchDriver::new(config(dir.path()), services(engine, false, 0));

    let report = driver.run(vec!["https://youtu.be/ccccccccccc".to_string()]).await;

    assert!(report.outputs.is_empty());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].stage, Stage::Detect);
    assert_eq!(report.failures[0].clip_id, "ccccccccccc");
}
