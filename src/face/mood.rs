//! Moods and their palette

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// RGB color
pub type Rgb = [u8; 3];

/// Emotional state shown on the face
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    #[default]
    Neutral,
    Happy,
    Love,
    Shy,
    Sad,
    Angry,
}

/// What gets drawn where the cheeks normally are
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoration {
    /// Plain round cheeks in the mood's color
    Cheeks(Rgb),
    /// Two hearts
    Hearts(Rgb),
    /// Two tear drops
    Tears(Rgb),
}

/// Red overlay used for the angry mood (RGBA)
pub const ANGRY_TINT: [u8; 4] = [255, 80, 80, 60];

impl Mood {
    /// All moods, neutral first
    pub const ALL: [Self; 6] = [
        Self::Neutral,
        Self::Happy,
        Self::Love,
        Self::Shy,
        Self::Sad,
        Self::Angry,
    ];

    /// Lowercase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Happy => "happy",
            Self::Love => "love",
            Self::Shy => "shy",
            Self::Sad => "sad",
            Self::Angry => "angry",
        }
    }

    /// Cheek color for this mood
    #[must_use]
    pub const fn cheek_color(self) -> Rgb {
        match self {
            Self::Neutral => [255, 180, 180],
            Self::Happy => [255, 160, 170],
            Self::Love => [255, 120, 150],
            Self::Shy => [255, 140, 160],
            Self::Sad => [160, 180, 255],
            Self::Angry => [255, 120, 120],
        }
    }

    /// Cheek decoration for this mood
    #[must_use]
    pub const fn decoration(self) -> Decoration {
        match self {
            Self::Love => Decoration::Hearts([255, 120, 150]),
            Self::Sad => Decoration::Tears([120, 160, 255]),
            other => Decoration::Cheeks(other.cheek_color()),
        }
    }

    /// Full-frame tint, if any
    #[must_use]
    pub const fn tint(self) -> Option<[u8; 4]> {
        match self {
            Self::Angry => Some(ANGRY_TINT),
            _ => None,
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == wanted)
            .ok_or_else(|| Error::Config(format!("unknown mood: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("Love".parse::<Mood>().unwrap(), Mood::Love);
        assert_eq!(" angry ".parse::<Mood>().unwrap(), Mood::Angry);
        assert!("grumpy".parse::<Mood>().is_err());
    }

    #[test]
    fn decorations_follow_mood() {
        assert!(matches!(Mood::Love.decoration(), Decoration::Hearts(_)));
        assert!(matches!(Mood::Sad.decoration(), Decoration::Tears(_)));
        assert_eq!(
            Mood::Shy.decoration(),
            Decoration::Cheeks(Mood::Shy.cheek_color())
        );
        assert!(Mood::Angry.tint().is_some());
        assert!(Mood::Happy.tint().is_none());
    }
}
