//! Batch worker for reelcut.
//!
//! This crate provides:
//! - Pipeline configuration from the environment and CLI flags
//! - The per-clip pipeline (extract, transcribe, burn subtitles, composite)
//! - The batch driver with a shared admission gate and a final report
//! - Structured clip logging

pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;

pub use batch::{dedupe_by_video, read_urls_file, BatchDriver, BatchReport, ClipFailure};
pub use cli::Cli;
pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult, Stage};
pub use logging::{init_tracing, ClipLogger};
pub use pipeline::{ClipJob, ClipOutput, ClipPipeline, PipelineServices};
