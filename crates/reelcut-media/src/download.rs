//! Video download using yt-dlp.
//!
//! Each attempt asks for a simpler format than the one before, so sources
//! without separate 1080p streams still produce a file.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

use reelcut_models::VideoId;

use crate::command::require_tool;
use crate::error::{last_stderr_line, MediaError, MediaResult};
use crate::probe::{probe_video, VideoInfo};
use crate::retry::{retry_async, RetryConfig};
use crate::tools::{FetchedMedia, Fetcher};

/// Format selectors tried in order, best first.
pub const FORMAT_LADDER: &[&str] = &[
    "bestvideo[height<=1080]+bestaudio/best[height<=1080]",
    "best[height<=720]/best",
    "worst",
];

/// Pause between download attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// File name of the downloaded source inside its video directory.
pub const SOURCE_FILE_NAME: &str = "source.mp4";

/// [`Fetcher`] backed by the yt-dlp CLI.
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    binary: String,
    retry_delay: Duration,
}

impl Default for YtDlpFetcher {
    fn default() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl YtDlpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Download `url` to `output_path`, walking down [`FORMAT_LADDER`] on failure.
    ///
    /// An existing non-empty file at `output_path` is reused.
    pub async fn download_video(&self, url: &str, output_path: &Path) -> MediaResult<()> {
        if let Ok(metadata) = tokio::fs::metadata(output_path).await {
            if metadata.len() > 0 {
                info!(output = %output_path.display(), "Using existing video file");
                return Ok(());
            }
            warn!(output = %output_path.display(), "Existing file is empty, re-downloading");
            tokio::fs::remove_file(output_path).await?;
        }

        require_tool(&self.binary)?;

        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        info!(url = %url, output = %output_path.display(), "Downloading video");

        let config = RetryConfig::new("yt-dlp download")
            .with_max_retries(FORMAT_LADDER.len() as u32 - 1)
            .with_fixed_delay(self.retry_delay);

        retry_async(&config, |attempt| {
            let format = FORMAT_LADDER[(attempt as usize).min(FORMAT_LADDER.len() - 1)];
            self.run_attempt(url, output_path, format)
        })
        .await
        .map_err(|(e, attempts)| {
            MediaError::download_failed(format!("{} (after {} attempts)", e, attempts))
        })?;

        let file_size = tokio::fs::metadata(output_path).await?.len();
        info!(
            output = %output_path.display(),
            size_mb = file_size as f64 / (1024.0 * 1024.0),
            "Downloaded video successfully"
        );

        Ok(())
    }

    async fn run_attempt(&self, url: &str, output_path: &Path, format: &str) -> MediaResult<()> {
        debug!(format = %format, "yt-dlp attempt");

        let output = Command::new(&self.binary)
            .args(build_download_args(url, output_path, format))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("yt-dlp stderr: {}", stderr);
            return Err(MediaError::download_failed(format!(
                "yt-dlp failed: {}",
                last_stderr_line(&stderr)
            )));
        }

        match tokio::fs::metadata(output_path).await {
            Ok(m) if m.len() > 0 => Ok(()),
            _ => Err(MediaError::download_failed("Output file not created")),
        }
    }
}

#[async_trait]
impl Fetcher for YtDlpFetcher {
    async fn fetch(&self, url: &str, dest_dir: &Path) -> MediaResult<FetchedMedia> {
        let video_id = VideoId::from_url(url);
        let path = dest_dir.join(video_id.as_str()).join(SOURCE_FILE_NAME);

        self.download_video(url, &path).await?;
        let info = probe_video(&path).await?;
        ensure_has_duration(&info, &path)?;

        Ok(FetchedMedia {
            url: url.to_string(),
            video_id,
            path,
            info,
        })
    }
}

/// Reject sources ffprobe could not time. Nothing downstream can cut them.
fn ensure_has_duration(info: &VideoInfo, path: &Path) -> MediaResult<()> {
    if info.duration.is_finite() && info.duration > 0.0 {
        Ok(())
    } else {
        Err(MediaError::InvalidVideo(format!(
            "{} has no usable duration ({})",
            path.display(),
            info.duration
        )))
    }
}

/// yt-dlp arguments for one attempt.
pub fn build_download_args(url: &str, output_path: &Path, format: &str) -> Vec<String> {
    vec![
        "-f".to_string(),
        format.to_string(),
        "--merge-output-format".to_string(),
        "mp4".to_string(),
        "--no-playlist".to_string(),
        "--retries".to_string(),
        "3".to_string(),
        "--no-progress".to_string(),
        "-o".to_string(),
        output_path.to_string_lossy().to_string(),
        url.to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_download_args() {
        let args = build_download_args("https://youtu.be/x", Path::new("/tmp/a.mp4"), FORMAT_LADDER[0]);
        assert_eq!(args[1], "bestvideo[height<=1080]+bestaudio/best[height<=1080]");
        assert!(args.contains(&"--no-playlist".to_string()));
        assert_eq!(args.last().unwrap(), "https://youtu.be/x");
    }

    #[test]
    fn test_ladder_ends_with_worst() {
        assert_eq!(FORMAT_LADDER.len(), 3);
        assert_eq!(*FORMAT_LADDER.last().unwrap(), "worst");
    }

    fn probed(duration: f64) -> VideoInfo {
        VideoInfo {
            duration,
            width: 1920,
            height: 1080,
            fps: 30.0,
            codec: "h264".to_string(),
            size: 1024,
            has_audio: true,
        }
    }

    #[test]
    fn test_zero_duration_source_is_invalid() {
        let path = Path::new("/w/abc/source.mp4");
        assert!(ensure_has_duration(&probed(61.2), path).is_ok());
        for duration in [0.0, -1.0, f64::NAN] {
            let err = ensure_has_duration(&probed(duration), path).unwrap_err();
            assert!(matches!(err, MediaError::InvalidVideo(_)), "{duration}");
        }
    }

    #[tokio::test]
    async fn test_existing_file_skips_download() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("source.mp4");
        tokio::fs::write(&path, b"not empty").await.unwrap();

        // A missing binary would fail if the download actually ran.
        let fetcher = YtDlpFetcher::new().with_binary("definitely-not-yt-dlp");
        fetcher.download_video("https://youtu.be/x", &path).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_binary_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("source.mp4");

        let fetcher = YtDlpFetcher::new().with_binary("definitely-not-yt-dlp");
        let err = fetcher.download_video("https://youtu.be/x", &path).await.unwrap_err();
        assert!(matches!(err, MediaError::ToolNotFound(_)));
    }
}
