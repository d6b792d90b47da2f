//! ASS and SRT serialization.

use std::fmt;

use reelcut_models::timestamp::{format_ass_time, format_srt_time};

use super::SubtitleTrack;

const STYLE_NAME: &str = "Default";

/// An opaque RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(0xFF, 0xFF, 0xFF);
    pub const BLACK: Rgb = Rgb(0x00, 0x00, 0x00);

    /// Parse `RRGGBB` with or without a leading `#`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Style-line form, `&H00BBGGRR`.
    pub fn to_ass(self) -> String {
        format!("&H00{:02X}{:02X}{:02X}", self.2, self.1, self.0)
    }

    /// Override-tag form, `&HBBGGRR&`.
    pub fn to_inline(self) -> String {
        format!("&H{:02X}{:02X}{:02X}&", self.2, self.1, self.0)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

pub(super) fn build_ass_document(track: &SubtitleTrack) -> String {
    let h = &track.header;
    let mut doc = format!(
        r#"[Script Info]
ScriptType: v4.00+
PlayResX: {w}
PlayResY: {ht}
WrapStyle: 0
ScaledBorderAndShadow: yes

[V4+ Styles]
Format: Name,Fontname,Fontsize,PrimaryColour,SecondaryColour,OutlineColour,BackColour,Bold,Italic,Underline,StrikeOut,ScaleX,ScaleY,Spacing,Angle,BorderStyle,Outline,Shadow,Alignment,MarginL,MarginR,MarginV,Encoding
Style: {name},{font},{size},{pri},{sec},{out},&H64000000,1,0,0,0,100,100,0,0,1,{ow},0,{al},60,60,60,1

[Events]
Format: Layer,Start,End,Style,Name,MarginL,MarginR,MarginV,Effect,Text
"#,
        w = h.play_res_x,
        ht = h.play_res_y,
        name = STYLE_NAME,
        font = h.font_name,
        size = h.font_size,
        pri = h.primary_color.to_ass(),
        sec = h.primary_color.to_ass(),
        out = h.outline_color.to_ass(),
        ow = h.outline_width,
        al = h.alignment,
    );

    for event in &track.events {
        doc.push_str(&format!(
            "Dialogue: 0,{},{},{},,0,0,0,,{}\n",
            format_ass_time(event.start),
            format_ass_time(event.end),
            STYLE_NAME,
            event.text
        ));
    }
    doc
}

pub(super) fn build_srt_document(track: &SubtitleTrack) -> String {
    let mut out = String::new();
    for (i, event) in track.events.iter().enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            format_srt_time(event.start),
            format_srt_time(event.end),
            strip_overrides(&event.text)
        ));
    }
    out
}

/// Remove `{...}` override blocks.
fn strip_overrides(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            c if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

/// Escape a path for use inside an ffmpeg filter argument.
pub fn escape_filter_path(path: &str) -> String {
    path.replace('\\', "/")
        .replace(':', "\\:")
        .replace('\'', "\\'")
        .replace(',', "\\,")
        .replace(';', "\\;")
        .replace('[', "\\[")
        .replace(']', "\\]")
}
