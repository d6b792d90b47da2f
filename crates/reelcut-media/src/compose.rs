//! Vertical composition: clip on top, separator bar, looping background below.

use std::path::{Path, PathBuf};
use tracing::warn;

use reelcut_models::encoding::{CANVAS_HEIGHT, CANVAS_WIDTH};
use reelcut_models::EncodingConfig;

use crate::command::FfmpegCommand;
use crate::error::MediaResult;
use crate::probe::VideoInfo;
use crate::tools::MediaEngine;

/// Separator bar height in pixels.
pub const SEPARATOR_HEIGHT: u32 = 4;
/// Separator bar colour.
pub const SEPARATOR_COLOR: &str = "0x333333";

const TOP_MIN_RATIO: f64 = 0.25;
const TOP_MAX_RATIO: f64 = 0.35;

/// Heights of the three stacked boxes. They always sum to the canvas height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackLayout {
    pub top: u32,
    pub separator: u32,
    pub bottom: u32,
}

impl StackLayout {
    /// Size the top box to the source aspect at canvas width, within 25-35 %
    /// of the canvas height.
    pub fn for_source(width: u32, height: u32) -> Self {
        let min_top = (CANVAS_HEIGHT as f64 * TOP_MIN_RATIO).ceil();
        let max_top = (CANVAS_HEIGHT as f64 * TOP_MAX_RATIO).floor();

        let scaled = if width == 0 || height == 0 {
            min_top
        } else {
            CANVAS_WIDTH as f64 * height as f64 / width as f64
        };

        let mut top = scaled.clamp(min_top, max_top).ceil() as u32;
        if top % 2 == 1 {
            top += 1;
        }

        Self {
            top,
            separator: SEPARATOR_HEIGHT,
            bottom: CANVAS_HEIGHT - top - SEPARATOR_HEIGHT,
        }
    }

    pub fn total_height(&self) -> u32 {
        self.top + self.separator + self.bottom
    }
}

fn fill_box(label_in: &str, height: u32, label_out: &str) -> String {
    format!(
        "[{label_in}]scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h},setsar=1[{label_out}]",
        w = CANVAS_WIDTH,
        h = height
    )
}

/// Filter graph for the stacked layout. Inputs: 0 clip, 1 separator, 2 background.
pub fn stack_filter(layout: &StackLayout) -> String {
    format!(
        "{};{};[top][1:v][bottom]vstack=inputs=3[v]",
        fill_box("0:v", layout.top, "top"),
        fill_box("2:v", layout.bottom, "bottom"),
    )
}

/// Filter graph for a clip with no background: top box on a black canvas.
pub fn padded_filter(layout: &StackLayout) -> String {
    format!(
        "[0:v]scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h},pad={w}:{ch}:0:0:black,setsar=1[v]",
        w = CANVAS_WIDTH,
        h = layout.top,
        ch = CANVAS_HEIGHT
    )
}

/// Build the single ffmpeg call that produces the final vertical output.
pub fn build_composite_command(
    clip: &Path,
    info: &VideoInfo,
    background: Option<&Path>,
    output: &Path,
    encoding: &EncodingConfig,
) -> FfmpegCommand {
    let layout = StackLayout::for_source(info.width, info.height);

    let cmd = match background {
        Some(background) => FfmpegCommand::new(clip, output)
            .add_lavfi_input(format!(
                "color=c={}:s={}x{}:r={}",
                SEPARATOR_COLOR,
                CANVAS_WIDTH,
                SEPARATOR_HEIGHT,
                frame_rate(info.fps)
            ))
            .add_input(background)
            .stream_loop()
            .filter_complex(stack_filter(&layout)),
        None => FfmpegCommand::new(clip, output).filter_complex(padded_filter(&layout)),
    };

    cmd.map("[v]")
        .map("0:a?")
        .output_duration(info.duration)
        .encoding(encoding)
}

/// Outcome of the composite step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositedClip {
    pub path: PathBuf,
    /// Whether the black-padded layout replaced a failed stacked one.
    pub padded_fallback: bool,
}

/// Composite `clip` over `background`, retrying once without the background
/// when the stacked encode fails.
///
/// Without a background there is nothing simpler to fall back to, so the
/// first failure is returned.
pub async fn composite_with_fallback(
    engine: &dyn MediaEngine,
    clip: &Path,
    background: Option<&Path>,
    output: &Path,
) -> MediaResult<CompositedClip> {
    match engine.composite(clip, background, output).await {
        Ok(()) => Ok(CompositedClip {
            path: output.to_path_buf(),
            padded_fallback: false,
        }),
        Err(e) if background.is_some() && e.is_tool_failure() => {
            warn!(
                clip = %clip.display(),
                "Stacked composite failed, retrying with padded layout: {}", e
            );
            engine.composite(clip, None, output).await?;
            Ok(CompositedClip {
                path: output.to_path_buf(),
                padded_fallback: true,
            })
        }
        Err(e) => Err(e),
    }
}

fn frame_rate(fps: f64) -> String {
    if fps.is_finite() && fps > 0.0 {
        format!("{:.3}", fps)
    } else {
        "30".to_string()
    }
}
