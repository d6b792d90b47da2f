//! FFmpeg-backed [`MediaEngine`].

use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info};

use reelcut_models::encoding::CANVAS_WIDTH;
use reelcut_models::{EncodingConfig, Segment};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::compose::build_composite_command;
use crate::error::{MediaError, MediaResult};
use crate::probe::{probe_video, VideoInfo};
use crate::subtitles::escape_filter_path;
use crate::tools::MediaEngine;

/// Runs every encode step through the ffmpeg CLI.
#[derive(Debug, Clone, Default)]
pub struct FfmpegEngine {
    encoding: EncodingConfig,
    timeout_secs: Option<u64>,
}

impl FfmpegEngine {
    pub fn new(encoding: EncodingConfig) -> Self {
        Self {
            encoding,
            timeout_secs: None,
        }
    }

    /// Kill any single ffmpeg call that runs longer than `secs`.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn encoding(&self) -> &EncodingConfig {
        &self.encoding
    }

    fn runner(&self) -> FfmpegRunner {
        match self.timeout_secs {
            Some(secs) => FfmpegRunner::new().with_timeout(secs),
            None => FfmpegRunner::new(),
        }
    }

    /// Command for cutting `segment` at mobile width with even height.
    pub fn extract_command(&self, source: &Path, segment: &Segment, output: &Path) -> FfmpegCommand {
        FfmpegCommand::new(source, output)
            .seek(segment.start)
            .duration(segment.duration())
            .video_filter(format!("scale={}:-2", CANVAS_WIDTH))
            .encoding(&self.encoding)
    }

    /// Command for burning an ASS file into a composited clip, audio copied
    /// through. Its output is the final file, so it carries `+faststart`.
    pub fn burn_command(&self, clip: &Path, subtitles: &Path, output: &Path) -> FfmpegCommand {
        let filter = format!(
            "subtitles='{}'",
            escape_filter_path(&subtitles.to_string_lossy())
        );
        let cmd = FfmpegCommand::new(clip, output)
            .video_filter(filter)
            .output_args(["-c:v", self.encoding.codec.as_str(), "-preset", self.encoding.preset.as_str()])
            .output_args(["-crf".to_string(), self.encoding.crf.to_string()])
            .output_args(["-pix_fmt", "yuv420p", "-c:a", "copy"]);
        if self.encoding.faststart {
            cmd.output_args(["-movflags", "+faststart"])
        } else {
            cmd
        }
    }
}

#[async_trait]
impl MediaEngine for FfmpegEngine {
    async fn probe(&self, path: &Path) -> MediaResult<VideoInfo> {
        probe_video(path).await
    }

    async fn extract_clip(&self, source: &Path, segment: &Segment, output: &Path) -> MediaResult<()> {
        if !source.exists() {
            return Err(MediaError::FileNotFound(source.to_path_buf()));
        }
        debug!(
            source = %source.display(),
            start = segment.start,
            end = segment.end,
            "Extracting clip"
        );
        self.runner()
            .run(&self.extract_command(source, segment, output))
            .await?;
        Ok(())
    }

    async fn burn_subtitles(&self, clip: &Path, subtitles: &Path, output: &Path) -> MediaResult<()> {
        self.runner()
            .run(&self.burn_command(clip, subtitles, output))
            .await?;
        debug!(output = %output.display(), "Subtitles burned");
        Ok(())
    }

    async fn composite(&self, clip: &Path, background: Option<&Path>, output: &Path) -> MediaResult<()> {
        let info = probe_video(clip).await?;
        let background = background.filter(|p| p.exists());
        let cmd = build_composite_command(clip, &info, background, output, &self.encoding);

        let total = info.duration;
        self.runner()
            .run_with_progress(&cmd, move |p| {
                debug!(percent = format!("{:.0}", p.percentage(total)), speed = p.speed, "Compositing");
            })
            .await?;
        info!(
            output = %output.display(),
            duration = info.duration,
            background = background.is_some(),
            "Composite written"
        );
        Ok(())
    }
}
