//! Per-preset override directives.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use reelcut_models::{StylePreset, TranscriptUnit};

use super::ass::Rgb;
use super::{SubtitleEvent, SubtitleHeader};

/// Fade-in and fade-out length in milliseconds.
pub const FADE_MS: u32 = 300;

/// Colours plain-emphasis words may be tinted with.
pub const EMPHASIS_PALETTE: [Rgb; 6] = [
    Rgb(0xFF, 0xFF, 0x00),
    Rgb(0x00, 0xFF, 0xFF),
    Rgb(0xFF, 0x00, 0xFF),
    Rgb(0x00, 0xFF, 0x00),
    Rgb(0xFF, 0x8C, 0x00),
    Rgb(0xFF, 0x3B, 0x30),
];

/// Bold accent used by highlighted-word.
pub const ACCENT_COLOR: Rgb = Rgb(0xFF, 0xD7, 0x00);

/// Bounce word colours, cycled by word index.
pub const BOUNCE_COLORS: [Rgb; 3] = [
    Rgb(0xFF, 0xFF, 0x00),
    Rgb(0x00, 0xFF, 0xFF),
    Rgb(0xFF, 0x69, 0xB4),
];

const MARGIN_X: u32 = 120;
const MARGIN_Y: u32 = 240;
const TYPEWRITER_MAX_CS: u32 = 4;
const BOUNCE_DELAY_MS: u32 = 80;
const BOUNCE_STAGGER_MS: u32 = 50;
const BOUNCE_PHASE_MS: u32 = 150;
const CHAR_WIDTH_RATIO: f64 = 0.6;
const LINE_HEIGHT_RATIO: f64 = 1.2;

/// Neutralize characters the renderer would read as override syntax.
pub fn sanitize_text(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '{' => '(',
            '}' => ')',
            '\\' => '/',
            '\n' | '\r' => ' ',
            other => other,
        })
        .collect()
}

pub(super) fn render_unit(
    unit: &TranscriptUnit,
    unit_index: usize,
    preset: StylePreset,
    seed: u64,
    header: &SubtitleHeader,
) -> Vec<SubtitleEvent> {
    let text = sanitize_text(unit.text.trim());
    let words: Vec<&str> = text.split_whitespace().collect();

    if words.is_empty() {
        return vec![event(unit.start, unit.end, String::new())];
    }

    match preset {
        StylePreset::PlainEmphasis => plain_emphasis(unit, unit_index, &words, seed, header),
        StylePreset::HighlightedWord => vec![event(unit.start, unit.end, highlighted(&words))],
        StylePreset::Typewriter => vec![event(unit.start, unit.end, typewriter(&text, unit.duration()))],
        StylePreset::Fade => vec![event(unit.start, unit.end, format!("{{{}}}{}", fade_tag(), text))],
        StylePreset::Bounce => bounce(unit, &words, header),
        StylePreset::Wave => vec![event(
            unit.start,
            unit.end,
            format!("{{\\t(0,1000,\\frz8)\\t(1000,3000,\\frz-8)}}{}", text),
        )],
    }
}

fn event(start: f64, end: f64, text: String) -> SubtitleEvent {
    SubtitleEvent { start, end, text }
}

fn fade_tag() -> String {
    format!("\\fad({FADE_MS},{FADE_MS})")
}

/// Per-word generator, independent of how many words came before.
fn word_rng(seed: u64, unit_index: usize, word_index: usize) -> StdRng {
    let key = ((unit_index as u64) << 32) | word_index as u64;
    StdRng::seed_from_u64(splitmix64(seed ^ splitmix64(key)))
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

fn plain_emphasis(
    unit: &TranscriptUnit,
    unit_index: usize,
    words: &[&str],
    seed: u64,
    header: &SubtitleHeader,
) -> Vec<SubtitleEvent> {
    let step = unit.duration() / words.len() as f64;
    let max_x = header.play_res_x.saturating_sub(MARGIN_X).max(MARGIN_X);
    let max_y = header.play_res_y.saturating_sub(MARGIN_Y).max(MARGIN_Y);

    words
        .iter()
        .enumerate()
        .map(|(i, word)| {
            let mut rng = word_rng(seed, unit_index, i);
            let mut tags = fade_tag();

            if rng.random_bool(0.5) {
                let color = EMPHASIS_PALETTE[rng.random_range(0..EMPHASIS_PALETTE.len())];
                tags.push_str(&format!("\\1c{}", color.to_inline()));
            }
            if rng.random_bool(0.5) {
                let (x1, y1) = (rng.random_range(MARGIN_X..=max_x), rng.random_range(MARGIN_Y..=max_y));
                let (x2, y2) = (rng.random_range(MARGIN_X..=max_x), rng.random_range(MARGIN_Y..=max_y));
                tags.push_str(&format!("\\an5\\move({x1},{y1},{x2},{y2})"));
            }

            let start = unit.start + step * i as f64;
            let end = if i + 1 == words.len() { unit.end } else { start + step };
            event(start, end, format!("{{{tags}}}{word}"))
        })
        .collect()
}

fn highlighted(words: &[&str]) -> String {
    words
        .iter()
        .enumerate()
        .map(|(i, word)| {
            if i % 4 == 0 {
                format!("{{\\b1\\1c{}}}{}{{\\r}}", ACCENT_COLOR.to_inline(), word)
            } else {
                word.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Karaoke reveal: each character gets `min(4cs, duration / chars)`, at least 1cs.
fn typewriter(text: &str, duration: f64) -> String {
    let chars = text.chars().count().max(1) as u32;
    let duration_cs = (duration * 100.0).round().max(0.0) as u32;
    let per_char = (duration_cs / chars).min(TYPEWRITER_MAX_CS).max(1);

    let mut out = String::from("{\\2a&HFF&}");
    for c in text.chars() {
        out.push_str(&format!("{{\\k{per_char}}}"));
        out.push(c);
    }
    out
}

fn bounce(unit: &TranscriptUnit, words: &[&str], header: &SubtitleHeader) -> Vec<SubtitleEvent> {
    let positions = layout_words(words, header);

    words
        .iter()
        .zip(positions)
        .enumerate()
        .map(|(i, (word, (x, y)))| {
            let color = BOUNCE_COLORS[i % BOUNCE_COLORS.len()];
            let o = BOUNCE_DELAY_MS + BOUNCE_STAGGER_MS * i as u32;
            let mid = o + BOUNCE_PHASE_MS;
            let done = mid + BOUNCE_PHASE_MS;
            let text = format!(
                "{{\\an5\\pos({x},{y})\\1c{}\\t({o},{mid},\\fscx125\\fscy125\\frz-6)\\t({mid},{done},\\fscx100\\fscy100\\frz0)}}{word}",
                color.to_inline()
            );
            event(unit.start, unit.end, text)
        })
        .collect()
}

/// Centre points for words laid out in rows that fit the safe width.
fn layout_words(words: &[&str], header: &SubtitleHeader) -> Vec<(i64, i64)> {
    let char_width = header.font_size as f64 * CHAR_WIDTH_RATIO;
    let line_height = header.font_size as f64 * LINE_HEIGHT_RATIO;
    let max_width = (header.play_res_x.saturating_sub(2 * MARGIN_X)) as f64;
    let widths: Vec<f64> = words.iter().map(|w| w.chars().count() as f64 * char_width).collect();

    // rows of word indices
    let mut rows: Vec<Vec<usize>> = vec![Vec::new()];
    let mut row_width = 0.0;
    for (i, width) in widths.iter().enumerate() {
        let needed = if row_width > 0.0 { row_width + char_width + width } else { *width };
        if needed > max_width && row_width > 0.0 {
            rows.push(vec![i]);
            row_width = *width;
        } else {
            if let Some(row) = rows.last_mut() {
                row.push(i);
            }
            row_width = needed;
        }
    }

    let center_x = header.play_res_x as f64 / 2.0;
    let center_y = header.play_res_y as f64 / 2.0;
    let first_row_y = center_y - (rows.len() as f64 - 1.0) * line_height / 2.0;

    let mut positions = vec![(0, 0); words.len()];
    for (r, row) in rows.iter().enumerate() {
        let total: f64 = row.iter().map(|&i| widths[i]).sum::<f64>() + char_width * (row.len() as f64 - 1.0);
        let mut x = center_x - total / 2.0;
        let y = first_row_y + r as f64 * line_height;
        for &i in row {
            positions[i] = ((x + widths[i] / 2.0).round() as i64, y.round() as i64);
            x += widths[i] + char_width;
        }
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_text() {
        assert_eq!(sanitize_text("a{b}\\c\nd"), "a(b)/c d");
    }

    #[test]
    fn test_typewriter_caps_per_char() {
        assert_eq!(typewriter("ab", 10.0), "{\\2a&HFF&}{\\k4}a{\\k4}b");
        // 0.1s over 20 chars would be 0.5cs each
        assert!(typewriter("abcdefghijklmnopqrst", 0.1).contains("{\\k1}a"));
    }

    #[test]
    fn test_word_rng_is_stable() {
        let a: u32 = word_rng(9, 3, 1).random();
        let b: u32 = word_rng(9, 3, 1).random();
        let c: u32 = word_rng(9, 3, 2).random();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_layout_wraps_long_lines() {
        let header = SubtitleHeader::for_preset(StylePreset::Bounce);
        let words = vec!["SUPERCALIFRAGILISTIC"; 6];
        let positions = layout_words(&words, &header);
        let rows: std::collections::BTreeSet<i64> = positions.iter().map(|p| p.1).collect();
        assert!(rows.len() > 1);
        for (x, _) in positions {
            assert!(x > 0 && x < 1080);
        }
    }

    #[test]
    fn test_layout_single_word_is_centered() {
        let header = SubtitleHeader::for_preset(StylePreset::Bounce);
        assert_eq!(layout_words(&["HI"], &header), vec![(540, 960)]);
    }
}
