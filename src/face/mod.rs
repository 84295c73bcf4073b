//! Animated bear face
//!
//! [`FaceState`] is shared between the voice orchestrator (which sets the
//! mood and the speaking flag) and the [`FaceRenderer`] loop (which animates
//! blinks and the mouth and expires moods).

pub mod display;
pub mod draw;
pub mod mood;
pub mod renderer;
pub mod state;

pub use display::{Display, FramebufferDisplay, NullDisplay, PngDisplay};
pub use draw::{FaceFrame, HEIGHT, WIDTH, draw_face};
pub use mood::Mood;
pub use renderer::{FPS, FaceRenderer};
pub use state::{FaceSnapshot, FaceState, SpeakingGuard, TickOutput, blink_scale};
