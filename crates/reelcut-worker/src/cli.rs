//! Command-line interface.

use clap::Parser;
use std::path::PathBuf;

use reelcut_models::StylePreset;

use crate::batch::read_urls_file;
use crate::config::PipelineConfig;
use crate::error::PipelineResult;

/// Cut highlights from videos into captioned vertical shorts.
#[derive(Debug, Parser)]
#[command(name = "reelcut", version, about)]
pub struct Cli {
    /// Video URL to process (repeatable)
    #[arg(long = "url", value_name = "URL")]
    pub urls: Vec<String>,

    /// File with one URL per line; blank lines and `#` comments are ignored
    #[arg(long, env = "REELCUT_URLS_FILE")]
    pub urls_file: Option<PathBuf>,

    /// Directory for final outputs
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Directory for downloads and intermediates
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Background video looped under each clip, or a folder of mp4/mov/avi
    /// files to pick from
    #[arg(long)]
    pub background: Option<PathBuf>,

    /// Maximum clips processed at once
    #[arg(long)]
    pub max_concurrent: Option<usize>,

    /// Minimum highlight length in seconds
    #[arg(long)]
    pub min_duration: Option<f64>,

    /// Maximum highlight length in seconds
    #[arg(long)]
    pub max_duration: Option<f64>,

    /// Maximum highlights per video
    #[arg(long)]
    pub max_clips: Option<usize>,

    /// Subtitle preset: plain-emphasis, highlighted-word, typewriter, fade, bounce, wave
    #[arg(long)]
    pub style: Option<StylePreset>,

    /// Seed for randomized styling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Whisper model name
    #[arg(long)]
    pub whisper_model: Option<String>,

    /// Spoken language, auto-detected when omitted
    #[arg(long)]
    pub language: Option<String>,

    /// Caption line length in characters
    #[arg(long)]
    pub max_chars: Option<usize>,

    /// Fall back to a seeded uniform split when detectors find nothing
    #[arg(long)]
    pub uniform_split: bool,

    /// Remove a clip's intermediates after it succeeds
    #[arg(long)]
    pub cleanup: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Overlay the flags that were given on top of `config`.
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(dir) = &self.work_dir {
            config.work_dir = dir.clone();
        }
        if let Some(background) = &self.background {
            config.background = Some(background.clone());
        }
        if let Some(n) = self.max_concurrent {
            config.max_concurrent = n;
        }
        if let Some(min) = self.min_duration {
            config.bounds.min_duration = min;
        }
        if let Some(max) = self.max_duration {
            config.bounds.max_duration = max;
        }
        if let Some(count) = self.max_clips {
            config.bounds.max_segments = count;
        }
        if let Some(style) = self.style {
            config.style = style;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(model) = &self.whisper_model {
            config.whisper_model = model.clone();
        }
        if let Some(language) = &self.language {
            config.language = Some(language.clone());
        }
        if let Some(max_chars) = self.max_chars {
            config.max_chars = max_chars;
        }
        config.uniform_split |= self.uniform_split;
        config.cleanup |= self.cleanup;
    }

    /// `--url` values followed by the URLs file, in order.
    pub async fn collect_urls(&self) -> PipelineResult<Vec<String>> {
        let mut urls: Vec<String> = self
            .urls
            .iter()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .collect();
        if let Some(path) = &self.urls_file {
            urls.extend(read_urls_file(path).await?);
        }
        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "reelcut",
            "--url",
            "https://youtu.be/a",
            "--url",
            "https://youtu.be/b",
            "--style",
            "bounce",
            "--max-concurrent",
            "4",
            "--min-duration",
            "20",
            "--cleanup",
        ]);
        let mut config = PipelineConfig::default();
        cli.apply(&mut config);

        assert_eq!(cli.urls.len(), 2);
        assert_eq!(config.style, StylePreset::Bounce);
        assert_eq!(config.max_concurrent, 4);
        assert_eq!(config.bounds.min_duration, 20.0);
        assert_eq!(config.bounds.max_duration, 40.0);
        assert!(config.cleanup);
        assert!(!config.uniform_split);
    }

    #[test]
    fn test_unknown_style_is_rejected() {
        assert!(Cli::try_parse_from(["reelcut", "--style", "sparkle"]).is_err());
    }

    #[tokio::test]
    async fn test_collect_urls_merges_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        tokio::fs::write(&path, "# list\nhttps://youtu.be/b\n").await.unwrap();

        let cli = Cli::parse_from([
            "reelcut",
            "--url",
            "https://youtu.be/a",
            "--urls-file",
            path.to_str().unwrap(),
        ]);
        assert_eq!(
            cli.collect_urls().await.unwrap(),
            vec!["https://youtu.be/a", "https://youtu.be/b"]
        );
    }
}
