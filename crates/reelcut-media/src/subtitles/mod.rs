//! Styled subtitle tracks.
//!
//! [`SubtitleRenderer`] turns transcript units into a [`SubtitleTrack`] of ASS
//! dialogue events. Every override tag is computed by a pure function of the
//! unit text, its index, the preset and the renderer seed, so rendering the
//! same input twice gives byte-identical output.
//!
//! | Preset | Events | Animation |
//! |---|---|---|
//! | plain-emphasis | one per word | random palette colour, random `\move`, 300 ms fade |
//! | highlighted-word | one per unit | bold accent on words 0, 4, 8... |
//! | typewriter | one per unit | `\k` reveal per character |
//! | fade | one per unit | 300 ms fade |
//! | bounce | one per word | staggered scale/rotation keyframes |
//! | wave | one per unit | rotation one way at 1 s, back by 3 s |

mod ass;
mod burn;
mod presets;

pub use ass::{escape_filter_path, Rgb};
pub use burn::{burn_in, burn_in_with_fallback, RenderedClip};
pub use presets::{sanitize_text, ACCENT_COLOR, BOUNCE_COLORS, EMPHASIS_PALETTE, FADE_MS};

use reelcut_models::encoding::{CANVAS_HEIGHT, CANVAS_WIDTH};
use reelcut_models::{StylePreset, TranscriptUnit};

/// Font every preset renders with.
pub const DEFAULT_FONT: &str = "Poppins";

/// Global formatting shared by all events of a track.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleHeader {
    pub play_res_x: u32,
    pub play_res_y: u32,
    pub font_name: String,
    pub font_size: u32,
    pub primary_color: Rgb,
    pub outline_color: Rgb,
    pub outline_width: u32,
    /// Numpad alignment of the default style.
    pub alignment: u8,
}

impl SubtitleHeader {
    /// Canvas, font and colour defaults for a preset.
    pub fn for_preset(preset: StylePreset) -> Self {
        let (font_size, primary_color, outline_width) = match preset {
            StylePreset::PlainEmphasis => (42, Rgb::WHITE, 3),
            StylePreset::HighlightedWord => (36, Rgb::WHITE, 3),
            StylePreset::Typewriter => (36, Rgb::WHITE, 2),
            StylePreset::Fade => (42, Rgb::WHITE, 3),
            StylePreset::Bounce => (38, Rgb(0xFF, 0x00, 0xFF), 3),
            StylePreset::Wave => (32, Rgb(0x00, 0xFF, 0x00), 2),
        };

        Self {
            play_res_x: CANVAS_WIDTH,
            play_res_y: CANVAS_HEIGHT,
            font_name: DEFAULT_FONT.to_string(),
            font_size,
            primary_color,
            outline_color: Rgb::BLACK,
            outline_width,
            alignment: 5,
        }
    }
}

/// One dialogue line: a time span and its directive-bearing text.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleEvent {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// An ordered set of styled events plus their header.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleTrack {
    pub header: SubtitleHeader,
    pub events: Vec<SubtitleEvent>,
}

impl SubtitleTrack {
    pub fn empty(preset: StylePreset) -> Self {
        Self {
            header: SubtitleHeader::for_preset(preset),
            events: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Serialize as an ASS script.
    pub fn to_ass(&self) -> String {
        ass::build_ass_document(self)
    }

    /// Serialize as SRT with all override tags removed.
    pub fn to_srt(&self) -> String {
        ass::build_srt_document(self)
    }
}

/// Renders transcript units with a preset and a fixed seed.
#[derive(Debug, Clone, Copy)]
pub struct SubtitleRenderer {
    seed: u64,
}

impl Default for SubtitleRenderer {
    fn default() -> Self {
        Self { seed: 42 }
    }
}

impl SubtitleRenderer {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Render units into a styled track.
    ///
    /// Blank units yield a single event with empty text. An empty unit list
    /// yields an empty track.
    pub fn render(&self, units: &[TranscriptUnit], preset: StylePreset) -> SubtitleTrack {
        let header = SubtitleHeader::for_preset(preset);
        let mut events = Vec::with_capacity(units.len());

        for (index, unit) in units.iter().enumerate() {
            events.extend(presets::render_unit(unit, index, preset, self.seed, &header));
        }

        SubtitleTrack { header, events }
    }

    /// Render units as plain, unanimated text, one event per unit.
    ///
    /// Used as the retry track when burning the animated one fails.
    pub fn render_plain(&self, units: &[TranscriptUnit], preset: StylePreset) -> SubtitleTrack {
        SubtitleTrack {
            header: SubtitleHeader::for_preset(preset),
            events: units
                .iter()
                .map(|u| SubtitleEvent {
                    start: u.start,
                    end: u.end,
                    text: sanitize_text(u.text.trim()),
                })
                .collect(),
        }
    }
}
