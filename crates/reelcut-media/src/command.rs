//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use reelcut_models::EncodingConfig;

use crate::error::{last_stderr_line, MediaError, MediaResult};
use crate::progress::{is_progress_line, parse_progress_line, FfmpegProgress};

/// Number of trailing log lines attached to a failure.
const STDERR_TAIL_LINES: usize = 20;

/// One `-i` input with its input-side options.
#[derive(Debug, Clone)]
struct FfmpegInput {
    args: Vec<String>,
    path: String,
}

/// Builder for FFmpeg commands.
///
/// Input options (`seek`, `duration`, `stream_loop`, `input_arg`) apply to the
/// most recently added input.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    inputs: Vec<FfmpegInput>,
    output: String,
    output_args: Vec<String>,
    overwrite: bool,
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command with a single input.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            inputs: vec![FfmpegInput {
                args: Vec::new(),
                path: input.as_ref().to_string_lossy().to_string(),
            }],
            output: output.as_ref().to_string_lossy().to_string(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Create a command whose output is discarded (`-f null -`), for analysis passes.
    pub fn analyze(input: impl AsRef<Path>) -> Self {
        Self::new(input, "-").output_arg("-f").output_arg("null")
    }

    /// Append another input.
    pub fn add_input(mut self, input: impl AsRef<Path>) -> Self {
        self.inputs.push(FfmpegInput {
            args: Vec::new(),
            path: input.as_ref().to_string_lossy().to_string(),
        });
        self
    }

    /// Append a lavfi source input (e.g. `color=c=black:s=1080x4`).
    pub fn add_lavfi_input(mut self, source: impl Into<String>) -> Self {
        self.inputs.push(FfmpegInput {
            args: vec!["-f".to_string(), "lavfi".to_string()],
            path: source.into(),
        });
        self
    }

    /// Add an argument before the latest `-i`.
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        if let Some(input) = self.inputs.last_mut() {
            input.args.push(arg.into());
        }
        self
    }

    /// Add an output argument (after all inputs).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set seek position on the latest input.
    pub fn seek(self, seconds: f64) -> Self {
        self.input_arg("-ss").input_arg(format!("{:.3}", seconds))
    }

    /// Limit the duration read from the latest input.
    pub fn duration(self, seconds: f64) -> Self {
        self.input_arg("-t").input_arg(format!("{:.3}", seconds))
    }

    /// Loop the latest input indefinitely.
    pub fn stream_loop(self) -> Self {
        self.input_arg("-stream_loop").input_arg("-1")
    }

    /// Limit the output duration.
    pub fn output_duration(self, seconds: f64) -> Self {
        self.output_arg("-t").output_arg(format!("{:.3}", seconds))
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Set filter complex.
    pub fn filter_complex(self, filter: impl Into<String>) -> Self {
        self.output_arg("-filter_complex").output_arg(filter)
    }

    /// Map a stream or filter label into the output.
    pub fn map(self, spec: impl Into<String>) -> Self {
        self.output_arg("-map").output_arg(spec)
    }

    /// Drop the video stream.
    pub fn no_video(self) -> Self {
        self.output_arg("-vn")
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Set audio sample rate and channel count.
    pub fn audio_format(self, sample_rate: u32, channels: u8) -> Self {
        self.output_arg("-ar")
            .output_arg(sample_rate.to_string())
            .output_arg("-ac")
            .output_arg(channels.to_string())
    }

    /// Apply codec, quality and container settings.
    pub fn encoding(self, encoding: &EncodingConfig) -> Self {
        self.output_args(encoding.to_ffmpeg_args())
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Output path as passed to FFmpeg.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-v".to_string());
        args.push(self.log_level.clone());

        // Progress output to stderr
        args.push("-progress".to_string());
        args.push("pipe:2".to_string());
        args.push("-nostats".to_string());

        for input in &self.inputs {
            args.extend(input.args.iter().cloned());
            args.push("-i".to_string());
            args.push(input.path.clone());
        }

        args.extend(self.output_args.iter().cloned());
        args.push(self.output.clone());

        args
    }
}

/// Log lines captured from a finished FFmpeg run, progress records excluded.
#[derive(Debug, Clone, Default)]
pub struct FfmpegOutput {
    pub log: Vec<String>,
}

/// Runner for FFmpeg commands with progress tracking and timeout.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRunner {
    timeout_secs: Option<u64>,
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill FFmpeg if it runs longer than `secs`.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Run an FFmpeg command.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<FfmpegOutput> {
        self.run_with_progress(cmd, |_| {}).await
    }

    /// Run an FFmpeg command with progress callback.
    pub async fn run_with_progress<F>(
        &self,
        cmd: &FfmpegCommand,
        progress_callback: F,
    ) -> MediaResult<FfmpegOutput>
    where
        F: Fn(FfmpegProgress) + Send + 'static,
    {
        check_ffmpeg()?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::ffmpeg_failed("FFmpeg stderr not captured", None, None))?;
        let mut reader = BufReader::new(stderr).lines();

        // Progress records are reported; everything else is kept as log.
        let reader_handle = tokio::spawn(async move {
            let mut current = FfmpegProgress::default();
            let mut log = Vec::new();

            while let Ok(Some(line)) = reader.next_line().await {
                if is_progress_line(&line) {
                    if let Some(progress) = parse_progress_line(&line, &mut current) {
                        progress_callback(progress);
                    }
                } else {
                    log.push(line);
                }
            }
            log
        });

        let status = self.wait_for_completion(&mut child).await;
        let log = reader_handle.await.unwrap_or_default();
        let status = status?;

        if status.success() {
            Ok(FfmpegOutput { log })
        } else {
            let tail_start = log.len().saturating_sub(STDERR_TAIL_LINES);
            let tail = log[tail_start..].join("\n");
            Err(MediaError::ffmpeg_failed(
                format!("FFmpeg exited with {}: {}", status, last_stderr_line(&tail)),
                Some(tail),
                status.code(),
            ))
        }
    }

    async fn wait_for_completion(&self, child: &mut Child) -> MediaResult<std::process::ExitStatus> {
        match self.timeout_secs {
            Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), child.wait()).await {
                Ok(status) => Ok(status?),
                Err(_) => {
                    warn!("FFmpeg timed out after {} seconds, killing process", secs);
                    let _ = child.kill().await;
                    Err(MediaError::Timeout(secs))
                }
            },
            None => Ok(child.wait().await?),
        }
    }
}

/// Resolve an external tool on `PATH`.
pub fn require_tool(name: &str) -> MediaResult<PathBuf> {
    which::which(name).map_err(|_| MediaError::ToolNotFound(name.to_string()))
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    require_tool("ffmpeg")
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    require_tool("ffprobe")
}

/// Check if yt-dlp is available.
pub fn check_ytdlp() -> MediaResult<PathBuf> {
    require_tool("yt-dlp")
}
