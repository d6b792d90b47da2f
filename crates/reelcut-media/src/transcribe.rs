//! Speech-to-text through the whisper CLI.
//!
//! Audio is extracted to 16 kHz mono WAV, transcribed with word timestamps,
//! and the words are grouped into short caption lines.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use reelcut_models::{TranscriptUnit, TranscriptWord};

use crate::command::{require_tool, FfmpegCommand, FfmpegRunner};
use crate::error::{last_stderr_line, MediaError, MediaResult};
use crate::tools::Transcriber;

/// A caption line closes once its summed word durations exceed this.
pub const MAX_LINE_DURATION: f64 = 2.5;
/// Silence longer than this starts a new caption line.
pub const MAX_LINE_GAP: f64 = 1.5;
/// Default caption line length in characters.
pub const DEFAULT_MAX_CHARS: usize = 12;

/// [`Transcriber`] backed by the openai-whisper CLI.
#[derive(Debug, Clone)]
pub struct WhisperTranscriber {
    binary: String,
    model: String,
    language: Option<String>,
    max_chars: usize,
}

impl Default for WhisperTranscriber {
    fn default() -> Self {
        Self {
            binary: "whisper".to_string(),
            model: "small".to_string(),
            language: None,
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

impl WhisperTranscriber {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars.max(1);
        self
    }

    fn build_args(&self, audio: &Path, output_dir: &Path) -> Vec<String> {
        let mut args = vec![
            audio.to_string_lossy().to_string(),
            "--model".to_string(),
            self.model.clone(),
            "--word_timestamps".to_string(),
            "True".to_string(),
            "--output_format".to_string(),
            "json".to_string(),
            "--output_dir".to_string(),
            output_dir.to_string_lossy().to_string(),
            "--verbose".to_string(),
            "False".to_string(),
        ];
        if let Some(language) = &self.language {
            args.push("--language".to_string());
            args.push(language.clone());
        }
        args
    }
}

#[async_trait]
impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, media: &Path, work_dir: &Path) -> MediaResult<Vec<TranscriptUnit>> {
        require_tool(&self.binary)?;
        tokio::fs::create_dir_all(work_dir).await?;

        let audio = extract_audio(media, work_dir).await?;

        let output = Command::new(&self.binary)
            .args(self.build_args(&audio, work_dir))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MediaError::transcription_failed(format!(
                "whisper failed: {}",
                last_stderr_line(&stderr)
            )));
        }

        let json_path = audio.with_extension("json");
        let json = tokio::fs::read(&json_path).await.map_err(|e| {
            MediaError::transcription_failed(format!(
                "whisper output {} unreadable: {}",
                json_path.display(),
                e
            ))
        })?;

        let words = parse_whisper_json(&json)?;
        let units = group_into_lines(&words, self.max_chars);
        info!(
            media = %media.display(),
            words = words.len(),
            lines = units.len(),
            "Transcription complete"
        );
        Ok(units)
    }
}

/// Extract 16 kHz mono PCM audio for the speech engine.
pub async fn extract_audio(media: &Path, work_dir: &Path) -> MediaResult<PathBuf> {
    let audio = work_dir.join("audio.wav");
    let cmd = FfmpegCommand::new(media, &audio)
        .no_video()
        .audio_codec("pcm_s16le")
        .audio_format(16_000, 1);

    FfmpegRunner::new()
        .run(&cmd)
        .await
        .map_err(|e| MediaError::transcription_failed(format!("audio extraction failed: {}", e)))?;

    debug!(audio = %audio.display(), "Extracted audio");
    Ok(audio)
}

#[derive(Debug, Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    #[serde(default)]
    text: String,
    #[serde(default)]
    words: Vec<WhisperWord>,
}

#[derive(Debug, Deserialize)]
struct WhisperWord {
    word: String,
    start: f64,
    end: f64,
}

/// Parse whisper JSON into upper-cased words.
///
/// Segments without word timings contribute their words spread evenly
/// across the segment span.
pub fn parse_whisper_json(json: &[u8]) -> MediaResult<Vec<TranscriptWord>> {
    let output: WhisperOutput = serde_json::from_slice(json)
        .map_err(|e| MediaError::transcription_failed(format!("invalid whisper JSON: {}", e)))?;

    let mut words = Vec::new();
    for segment in output.segments {
        if segment.words.is_empty() {
            let tokens: Vec<&str> = segment.text.split_whitespace().collect();
            if tokens.is_empty() {
                continue;
            }
            let step = (segment.end - segment.start).max(0.0) / tokens.len() as f64;
            for (i, token) in tokens.iter().enumerate() {
                let start = segment.start + step * i as f64;
                words.push(TranscriptWord::new(start, start + step, token.to_uppercase()));
            }
            continue;
        }

        for word in segment.words {
            let text = word.word.trim();
            if text.is_empty() {
                continue;
            }
            words.push(TranscriptWord::new(word.start, word.end, text.to_uppercase()));
        }
    }
    Ok(words)
}

/// Group words into caption lines.
///
/// A line closes after the word that pushes its summed word duration past
/// [`MAX_LINE_DURATION`] or its text past `max_chars`. A silence longer than
/// [`MAX_LINE_GAP`] closes the line before the next word.
pub fn group_into_lines(words: &[TranscriptWord], max_chars: usize) -> Vec<TranscriptUnit> {
    let mut units = Vec::new();
    let mut line: Vec<&TranscriptWord> = Vec::new();
    let mut spoken = 0.0;

    let flush = |line: &mut Vec<&TranscriptWord>, units: &mut Vec<TranscriptUnit>| {
        if let (Some(first), Some(last)) = (line.first(), line.last()) {
            let text = line.iter().map(|w| w.word.as_str()).collect::<Vec<_>>().join(" ");
            units.push(TranscriptUnit::new(first.start, last.end, text));
        }
        line.clear();
    };

    for (idx, word) in words.iter().enumerate() {
        if idx > 0 && word.start - words[idx - 1].end > MAX_LINE_GAP {
            flush(&mut line, &mut units);
            spoken = 0.0;
        }

        line.push(word);
        spoken += (word.end - word.start).max(0.0);

        let chars = line.iter().map(|w| w.word.chars().count()).sum::<usize>() + line.len() - 1;
        if spoken > MAX_LINE_DURATION || chars > max_chars {
            flush(&mut line, &mut units);
            spoken = 0.0;
        }
    }
    flush(&mut line, &mut units);

    units
}
