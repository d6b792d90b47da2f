//! Scene-change heuristic on top of ffmpeg's `select` filter.

use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;

use reelcut_models::{Segment, SegmentBounds};

use super::{pack_ranges, windows_to_segments, SegmentStrategy, TimeRange};
use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;
use crate::tools::FetchedMedia;

static PTS_TIME: OnceLock<Regex> = OnceLock::new();

fn pts_time_regex() -> &'static Regex {
    PTS_TIME.get_or_init(|| Regex::new(r"pts_time:\s*([0-9]+(?:\.[0-9]+)?)").expect("valid regex"))
}

/// Splits the source at detected shot changes and packs shots into windows.
///
/// Never fails: tool errors produce an empty result so the chain moves on.
#[derive(Debug, Clone)]
pub struct SceneChangeStrategy {
    threshold: f64,
}

impl Default for SceneChangeStrategy {
    fn default() -> Self {
        Self { threshold: 0.3 }
    }
}

impl SceneChangeStrategy {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    fn build_command(&self, media: &FetchedMedia) -> FfmpegCommand {
        FfmpegCommand::analyze(&media.path)
            .log_level("info")
            .output_arg("-an")
            .video_filter(format!("select='gt(scene,{})',showinfo", self.threshold))
    }
}

#[async_trait]
impl SegmentStrategy for SceneChangeStrategy {
    fn name(&self) -> &'static str {
        "scene-change"
    }

    async fn select(&self, media: &FetchedMedia, bounds: &SegmentBounds) -> MediaResult<Vec<Segment>> {
        let output = match FfmpegRunner::new().run(&self.build_command(media)).await {
            Ok(output) => output,
            Err(e) => {
                warn!(video_id = %media.video_id, "scene detection failed: {}", e);
                return Ok(Vec::new());
            }
        };

        let cuts = parse_scene_cuts(&output.log);
        let shots = shots_from_cuts(&cuts, media.info.duration);
        let windows = pack_ranges(&shots, bounds);
        Ok(windows_to_segments(&windows, media.info.duration, bounds))
    }
}

/// Extract cut timestamps from `showinfo` log lines, sorted and de-duplicated.
pub fn parse_scene_cuts(log: &[String]) -> Vec<f64> {
    let re = pts_time_regex();
    let mut cuts: Vec<f64> = log
        .iter()
        .filter(|line| line.contains("showinfo"))
        .filter_map(|line| re.captures(line))
        .filter_map(|caps| caps.get(1)?.as_str().parse().ok())
        .collect();
    cuts.sort_by(f64::total_cmp);
    cuts.dedup_by(|a, b| (*a - *b).abs() < 1e-3);
    cuts
}

/// Shots between consecutive cuts over `[0, duration]`.
pub fn shots_from_cuts(cuts: &[f64], duration: f64) -> Vec<TimeRange> {
    let mut bounds = vec![0.0];
    bounds.extend(cuts.iter().copied().filter(|t| *t > 0.0 && *t < duration));
    bounds.push(duration);

    bounds
        .windows(2)
        .map(|w| TimeRange::new(w[0], w[1]))
        .filter(|r| r.end > r.start)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scene_cuts() {
        let log = vec![
            "[Parsed_showinfo_1 @ 0x5581] n:   0 pts: 153600 pts_time:12.5    duration:512".to_string(),
            "[Parsed_showinfo_1 @ 0x5581] n:   1 pts: 368640 pts_time:3       duration:512".to_string(),
            "Stream #0:0: Video: h264".to_string(),
            "[Parsed_showinfo_1 @ 0x5581] n:   2 pts: 153600 pts_time:12.5".to_string(),
        ];
        assert_eq!(parse_scene_cuts(&log), vec![3.0, 12.5]);
    }

    #[test]
    fn test_shots_from_cuts_cover_source() {
        let shots = shots_from_cuts(&[10.0, 25.0, 70.0], 60.0);
        assert_eq!(
            shots,
            vec![
                TimeRange::new(0.0, 10.0),
                TimeRange::new(10.0, 25.0),
                TimeRange::new(25.0, 60.0),
            ]
        );
        assert_eq!(shots_from_cuts(&[], 60.0), vec![TimeRange::new(0.0, 60.0)]);
    }

    #[test]
    fn test_shots_pack_into_bounded_windows() {
        let bounds = SegmentBounds::new(20.0, 40.0, 10).unwrap();
        let shots = shots_from_cuts(&[10.0, 25.0], 60.0);
        let windows = pack_ranges(&shots, &bounds);
        assert!(!windows.is_empty());
        assert!(windows.iter().all(|(w, _)| bounds.accepts(w.duration())));
    }

    #[test]
    fn test_filter_uses_threshold() {
        let strategy = SceneChangeStrategy::new(0.4);
        let media = crate::tools::FetchedMedia {
            url: String::new(),
            video_id: reelcut_models::VideoId::from("x"),
            path: "in.mp4".into(),
            info: crate::probe::VideoInfo {
                duration: 10.0,
                width: 1,
                height: 1,
                fps: 30.0,
                codec: String::new(),
                size: 0,
                has_audio: false,
            },
        };
        let args = strategy.build_command(&media).build_args();
        assert!(args.contains(&"select='gt(scene,0.4)',showinfo".to_string()));
    }
}
