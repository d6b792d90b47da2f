//! Burning a subtitle track into a clip.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::SubtitleTrack;
use crate::error::{MediaError, MediaResult};
use crate::tools::MediaEngine;

/// Outcome of a burn-in step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedClip {
    /// Subtitled file, or the input clip when nothing was burned.
    pub path: PathBuf,
    /// Whether subtitles were burned at all.
    pub subtitled: bool,
    /// Whether the plain retry track was used.
    pub simplified: bool,
}

impl RenderedClip {
    fn unchanged(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            subtitled: false,
            simplified: false,
        }
    }
}

/// Write `track` to `ass_path` and burn it into `clip`.
///
/// An empty track skips the encode and returns `clip` as-is. The clip frame
/// must match the track's play resolution, otherwise libass rescales every
/// font size and position.
pub async fn burn_in(
    engine: &dyn MediaEngine,
    clip: &Path,
    track: &SubtitleTrack,
    ass_path: &Path,
    output: &Path,
) -> MediaResult<RenderedClip> {
    if track.is_empty() {
        debug!(clip = %clip.display(), "No subtitle events, skipping burn-in");
        return Ok(RenderedClip::unchanged(clip));
    }

    let frame = engine.probe(clip).await?;
    let header = &track.header;
    if (frame.width, frame.height) != (header.play_res_x, header.play_res_y) {
        return Err(MediaError::InvalidVideo(format!(
            "{} is {}x{}, subtitles are laid out for {}x{}",
            clip.display(),
            frame.width,
            frame.height,
            header.play_res_x,
            header.play_res_y
        )));
    }

    tokio::fs::write(ass_path, track.to_ass()).await?;
    engine.burn_subtitles(clip, ass_path, output).await?;

    Ok(RenderedClip {
        path: output.to_path_buf(),
        subtitled: true,
        simplified: false,
    })
}

/// [`burn_in`], retried once with `plain` when the tool rejects `track`.
///
/// Only external tool failures trigger the retry; a second failure is
/// returned to the caller.
pub async fn burn_in_with_fallback(
    engine: &dyn MediaEngine,
    clip: &Path,
    track: &SubtitleTrack,
    plain: &SubtitleTrack,
    ass_path: &Path,
    output: &Path,
) -> MediaResult<RenderedClip> {
    match burn_in(engine, clip, track, ass_path, output).await {
        Err(e) if e.is_tool_failure() => {
            warn!(
                clip = %clip.display(),
                "Styled subtitle burn failed, retrying with plain track: {}", e
            );
            let plain_path = ass_path.with_extension("plain.ass");
            let mut rendered = burn_in(engine, clip, plain, &plain_path, output).await?;
            rendered.simplified = rendered.subtitled;
            Ok(rendered)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::VideoInfo;
    use crate::subtitles::SubtitleRenderer;
    use async_trait::async_trait;
    use reelcut_models::{Segment, StylePreset, TranscriptUnit};
    use std::sync::Mutex;

    /// Fails the first `failures` burns, recording every subtitle file it saw.
    struct FlakyBurner {
        failures: Mutex<u32>,
        seen: Mutex<Vec<String>>,
        frame: (u32, u32),
    }

    impl FlakyBurner {
        fn new(failures: u32) -> Self {
            Self {
                failures: Mutex::new(failures),
                seen: Mutex::new(Vec::new()),
                frame: (1080, 1920),
            }
        }
    }

    #[async_trait]
    impl MediaEngine for FlakyBurner {
        async fn probe(&self, _path: &Path) -> MediaResult<VideoInfo> {
            Ok(VideoInfo {
                duration: 10.0,
                width: self.frame.0,
                height: self.frame.1,
                fps: 30.0,
                codec: "h264".to_string(),
                size: 1,
                has_audio: true,
            })
        }

        async fn extract_clip(&self, _s: &Path, _seg: &Segment, _o: &Path) -> MediaResult<()> {
            unreachable!()
        }

        async fn burn_subtitles(&self, _clip: &Path, subtitles: &Path, _output: &Path) -> MediaResult<()> {
            self.seen
                .lock()
                .unwrap()
                .push(std::fs::read_to_string(subtitles).unwrap());
            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(MediaError::ffmpeg_failed("libass choked", None, Some(1)));
            }
            Ok(())
        }

        async fn composite(&self, _c: &Path, _b: Option<&Path>, _o: &Path) -> MediaResult<()> {
            unreachable!()
        }
    }

    fn tracks() -> (SubtitleTrack, SubtitleTrack) {
        let units = vec![TranscriptUnit::new(0.0, 1.0, "hello world")];
        let renderer = SubtitleRenderer::new(1);
        (
            renderer.render(&units, StylePreset::Bounce),
            renderer.render_plain(&units, StylePreset::Bounce),
        )
    }

    #[tokio::test]
    async fn test_empty_track_skips_burn() {
        let dir = tempfile::tempdir().unwrap();
        let engine = FlakyBurner::new(0);
        let clip = dir.path().join("clip.mp4");

        let rendered = burn_in(
            &engine,
            &clip,
            &SubtitleTrack::empty(StylePreset::Fade),
            &dir.path().join("subs.ass"),
            &dir.path().join("out.mp4"),
        )
        .await
        .unwrap();

        assert_eq!(rendered.path, clip);
        assert!(!rendered.subtitled);
        assert!(engine.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_burn_requires_frame_at_play_resolution() {
        let dir = tempfile::tempdir().unwrap();
        // a 16:9 clip scaled to canvas width
        let engine = FlakyBurner {
            frame: (1080, 608),
            ..FlakyBurner::new(0)
        };
        let (styled, plain) = tracks();
        assert_eq!((styled.header.play_res_x, styled.header.play_res_y), (1080, 1920));

        let err = burn_in_with_fallback(
            &engine,
            &dir.path().join("clip.mp4"),
            &styled,
            &plain,
            &dir.path().join("subs.ass"),
            &dir.path().join("out.mp4"),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, MediaError::InvalidVideo(_)));
        assert!(err.to_string().contains("1080x608"));
        assert!(engine.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fallback_retries_once_with_plain_track() {
        let dir = tempfile::tempdir().unwrap();
        let engine = FlakyBurner::new(1);
        let (styled, plain) = tracks();

        let rendered = burn_in_with_fallback(
            &engine,
            &dir.path().join("clip.mp4"),
            &styled,
            &plain,
            &dir.path().join("subs.ass"),
            &dir.path().join("out.mp4"),
        )
        .await
        .unwrap();

        assert!(rendered.subtitled);
        assert!(rendered.simplified);
        let seen = engine.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].contains("\\fscx125"));
        assert!(!seen[1].contains("\\fscx125"));
        assert!(seen[1].contains(",,hello world\n"));
    }

    #[tokio::test]
    async fn test_fallback_gives_up_after_second_failure() {
        let dir = tempfile::tempdir().unwrap();
        let engine = FlakyBurner::new(5);
        let (styled, plain) = tracks();

        let err = burn_in_with_fallback(
            &engine,
            &dir.path().join("clip.mp4"),
            &styled,
            &plain,
            &dir.path().join("subs.ass"),
            &dir.path().join("out.mp4"),
        )
        .await
        .unwrap_err();

        assert!(err.is_tool_failure());
        assert_eq!(engine.seen.lock().unwrap().len(), 2);
    }
}
