//! Subtitle animation presets.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Named subtitle animation presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum StylePreset {
    /// Per-word random colour and motion inside a fade envelope
    #[default]
    PlainEmphasis,
    /// Every fourth word in bold accent colour
    HighlightedWord,
    /// Characters revealed one by one across the unit
    Typewriter,
    /// Whole unit faded in and out
    Fade,
    /// Per-word staggered scale/rotation bounce
    Bounce,
    /// Whole unit swinging one way then the other
    Wave,
}

impl StylePreset {
    pub const ALL: &'static [StylePreset] = &[
        StylePreset::PlainEmphasis,
        StylePreset::HighlightedWord,
        StylePreset::Typewriter,
        StylePreset::Fade,
        StylePreset::Bounce,
        StylePreset::Wave,
    ];

    /// Returns the preset name as used on the command line and in filenames.
    pub fn as_name(&self) -> &'static str {
        match self {
            StylePreset::PlainEmphasis => "plain-emphasis",
            StylePreset::HighlightedWord => "highlighted-word",
            StylePreset::Typewriter => "typewriter",
            StylePreset::Fade => "fade",
            StylePreset::Bounce => "bounce",
            StylePreset::Wave => "wave",
        }
    }

    /// Parse a preset name, falling back to `plain-emphasis` when unknown.
    pub fn from_name_or_default(name: &str) -> Self {
        name.parse().unwrap_or_default()
    }

    /// Whether the preset emits one event per word rather than per unit.
    pub fn is_per_word(&self) -> bool {
        matches!(self, StylePreset::PlainEmphasis | StylePreset::Bounce)
    }
}

impl fmt::Display for StylePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_name())
    }
}

impl FromStr for StylePreset {
    type Err = StyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "plain-emphasis" => Ok(StylePreset::PlainEmphasis),
            "highlighted-word" => Ok(StylePreset::HighlightedWord),
            "typewriter" => Ok(StylePreset::Typewriter),
            "fade" => Ok(StylePreset::Fade),
            "bounce" => Ok(StylePreset::Bounce),
            "wave" => Ok(StylePreset::Wave),
            _ => Err(StyleParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown style preset: {0}")]
pub struct StyleParseError(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_names() {
        for preset in StylePreset::ALL {
            assert_eq!(preset.as_name().parse::<StylePreset>().unwrap(), *preset);
        }
    }

    #[test]
    fn test_parse_accepts_snake_case() {
        assert_eq!(
            "HIGHLIGHTED_WORD".parse::<StylePreset>().unwrap(),
            StylePreset::HighlightedWord
        );
    }

    #[test]
    fn test_unknown_falls_back_to_plain_emphasis() {
        assert!("sparkle".parse::<StylePreset>().is_err());
        assert_eq!(
            StylePreset::from_name_or_default("sparkle"),
            StylePreset::PlainEmphasis
        );
    }

    #[test]
    fn test_serde_kebab_case() {
        let json = serde_json::to_string(&StylePreset::HighlightedWord).unwrap();
        assert_eq!(json, "\"highlighted-word\"");
    }
}
