//! Language, mood and gesture detection for incoming text
//!
//! Everything here is pure: the same text always classifies the same way.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::Error;
use crate::face::Mood;

/// Fraction of Japanese-script characters above which text counts as Japanese
const JAPANESE_RATIO: f64 = 0.3;

/// Ordered mood triggers. Earlier moods win when several match
/// ("miss you" is love even though "miss" is also sad).
const MOOD_TRIGGERS: &[(Mood, &[&str])] = &[
    (
        Mood::Love,
        &["i love you", "love you", "miss you", "miss u", "愛してる", "大好き", "会いたい"],
    ),
    (Mood::Shy, &["shy", "blush", "embarrassed", "恥ずかしい", "照れる"]),
    (
        Mood::Happy,
        &["happy", "good", "great", "awesome", "amazing", "yay", "嬉しい", "楽しい", "最高"],
    ),
    (Mood::Sad, &["sad", "lonely", "cry", "crying", "miss", "悲しい", "寂しい", "泣"]),
    (Mood::Angry, &["angry", "mad", "annoyed", "upset", "怒", "むかつく", "腹立つ"]),
];

/// Standalone "no" or anything containing "nope"
static HEAD_SHAKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bno\b|nope").expect("head shake pattern is valid"));

/// Spoken language passed to the synthesis server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "ja")]
    Japanese,
}

impl Language {
    /// Two-letter code used on the wire
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Japanese => "ja",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Self::English),
            "ja" | "japanese" => Ok(Self::Japanese),
            other => Err(Error::Config(format!("unknown language: {other}"))),
        }
    }
}

/// Everything the orchestrator needs to know about a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub language: Language,
    pub mood: Mood,
    pub head_shake: bool,
}

/// Classify a message in one pass
#[must_use]
pub fn classify(text: &str) -> Classification {
    Classification {
        language: classify_language(text),
        mood: classify_mood(text),
        head_shake: wants_head_shake(text),
    }
}

const fn is_japanese_script(c: char) -> bool {
    matches!(c, '\u{3040}'..='\u{309F}' | '\u{30A0}'..='\u{30FF}' | '\u{4E00}'..='\u{9FFF}')
}

/// Detect whether text is mostly Japanese script
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn classify_language(text: &str) -> Language {
    let total = text.chars().count();
    if total == 0 {
        return Language::English;
    }

    let japanese = text.chars().filter(|&c| is_japanese_script(c)).count();
    if japanese as f64 / total as f64 > JAPANESE_RATIO {
        Language::Japanese
    } else {
        Language::English
    }
}

/// Pick a mood from trigger phrases, first table entry wins
#[must_use]
pub fn classify_mood(text: &str) -> Mood {
    let lower = text.to_lowercase();
    MOOD_TRIGGERS
        .iter()
        .find(|(_, triggers)| triggers.iter().any(|t| lower.contains(t)))
        .map_or(Mood::Neutral, |(mood, _)| *mood)
}

/// Whether the text says "no" and deserves a head shake
#[must_use]
pub fn wants_head_shake(text: &str) -> bool {
    HEAD_SHAKE.is_match(&text.to_lowercase())
}
