// Lesson - Validated practice configuration built from authored lesson JSON

pub mod normalize;

pub use normalize::{clamp_bpm, normalize_lesson};

use crate::sequencer::pattern::Pattern;
use crate::sequencer::transport::TransportConfig;
use std::fmt;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum LessonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Time signature (numerator/denominator)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSignature {
    pub numerator: u32,
    pub denominator: u32,
}

impl TimeSignature {
    pub fn four_four() -> Self {
        Self {
            numerator: 4,
            denominator: 4,
        }
    }

    /// Parse `"N/D"`. Zero values and a non power-of-two denominator are rejected.
    pub fn parse(text: &str) -> Option<Self> {
        let (numerator, denominator) = text.trim().split_once('/')?;
        let numerator: u32 = numerator.trim().parse().ok()?;
        let denominator: u32 = denominator.trim().parse().ok()?;

        if numerator == 0 || !denominator.is_power_of_two() {
            return None;
        }
        Some(Self {
            numerator,
            denominator,
        })
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::four_four()
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Practice screen toggles. Every flag is on unless the lesson says `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiFlags {
    pub show_metronome: bool,
    pub loop_playback: bool,
    pub show_notes: bool,
}

impl Default for UiFlags {
    fn default() -> Self {
        Self {
            show_metronome: true,
            loop_playback: true,
            show_notes: true,
        }
    }
}

/// Everything the transport, timeline and metronome are built from
#[derive(Debug, Clone, PartialEq)]
pub struct LessonConfig {
    pub title: Option<String>,
    pub time_signature: TimeSignature,
    pub transport: TransportConfig,
    pub pattern: Pattern,
    pub ui: UiFlags,
}

impl Default for LessonConfig {
    fn default() -> Self {
        normalize_lesson(&serde_json::Value::Null)
    }
}

/// Parse lesson text, failing only on invalid JSON
pub fn try_parse_lesson(text: &str) -> Result<LessonConfig, LessonError> {
    let raw: serde_json::Value = serde_json::from_str(text)?;
    Ok(normalize_lesson(&raw))
}

/// Parse lesson text. Invalid JSON yields the default lesson.
pub fn parse_lesson(text: &str) -> LessonConfig {
    try_parse_lesson(text).unwrap_or_else(|err| {
        tracing::warn!(%err, "unreadable lesson, using defaults");
        LessonConfig::default()
    })
}

/// Read and normalize a lesson file. Only I/O failures are errors.
pub fn load_lesson(path: impl AsRef<Path>) -> Result<LessonConfig, LessonError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    tracing::debug!(path = %path.display(), "lesson loaded");
    Ok(parse_lesson(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_signature_parse() {
        assert_eq!(TimeSignature::parse("3/4").map(|t| t.numerator), Some(3));
        assert_eq!(
            TimeSignature::parse(" 6 / 8 "),
            Some(TimeSignature {
                numerator: 6,
                denominator: 8
            })
        );
        assert!(TimeSignature::parse("4").is_none());
        assert!(TimeSignature::parse("0/4").is_none());
        assert!(TimeSignature::parse("4/3").is_none());
        assert!(TimeSignature::parse("x/y").is_none());
        assert_eq!(TimeSignature::four_four().to_string(), "4/4");
    }

    #[test]
    fn test_parse_invalid_json_defaults() {
        let lesson = parse_lesson("{ not json");
        assert_eq!(lesson, LessonConfig::default());
        assert!(matches!(try_parse_lesson("]"), Err(LessonError::Json(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_lesson("/definitely/not/here/lesson.json");
        assert!(matches!(result, Err(LessonError::Io(_))));
    }
}
