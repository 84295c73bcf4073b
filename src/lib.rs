//! Teddy Companion - a talking, moving plush companion
//!
//! This library provides the core functionality for the companion:
//! - Mood and language classification of incoming text
//! - An animated face rendered at a fixed frame rate
//! - Eased head gestures on a servo
//! - Speech synthesis, transcoding and playback
//! - Telegram messaging and touch handling
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                      Inputs                          │
//! │        Telegram messages   │   Touch sensor          │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                   Dispatch                           │
//! │   Classifier  │  Voice orchestrator  │  Debounce    │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                   Outputs                            │
//! │   Face renderer  │  Servo  │  Speaker  │  Telegram  │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod channels;
pub mod classify;
pub mod config;
pub mod daemon;
pub mod dispatch;
pub mod error;
pub mod face;
pub mod motion;
pub mod voice;

pub use classify::{Classification, Language, classify};
pub use config::Config;
pub use daemon::{Daemon, Hardware};
pub use error::{Error, Result};
pub use face::{FaceState, Mood};
