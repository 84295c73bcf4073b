//! Classifier integration tests

use teddy_companion::classify::{classify_language, classify_mood, wants_head_shake};
use teddy_companion::{Language, Mood, classify};

#[test]
fn test_mostly_japanese_text_is_japanese() {
    assert_eq!(classify_language("こんにちは、元気？"), Language::Japanese);
    assert_eq!(classify_language("大好きだよ ok"), Language::Japanese);
}

#[test]
fn test_little_japanese_text_is_english() {
    // 1 of 12 characters
    assert_eq!(classify_language("hello there愛"), Language::English);
    assert_eq!(classify_language(""), Language::English);
}

#[test]
fn test_love_outranks_sad() {
    assert_eq!(classify_mood("I miss you so much"), Mood::Love);
    assert_eq!(classify_mood("I LOVE YOU but I'm sad"), Mood::Love);
    assert_eq!(classify_mood("I miss the old days"), Mood::Sad);
}

#[test]
fn test_mood_examples() {
    assert_eq!(classify_mood("I'm feeling great today"), Mood::Happy);
    assert_eq!(classify_mood("nothing special"), Mood::Neutral);
}

#[test]
fn test_head_shake_boundaries() {
    assert!(wants_head_shake("nope"));
    assert!(wants_head_shake("no thanks"));
    assert!(wants_head_shake("it's no good"));
    assert!(wants_head_shake("No."));
    assert!(!wants_head_shake("I know this"));
    assert!(!wants_head_shake("nothing to see"));
}

#[test]
fn test_dont_go_is_not_a_no() {
    let result = classify("I love you, don't go");
    assert_eq!(result.language, Language::English);
    assert_eq!(result.mood, Mood::Love);
    assert!(!result.head_shake);
}
