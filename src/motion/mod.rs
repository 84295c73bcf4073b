//! Head movement
//!
//! Servo adapters and eased gesture playback.

mod actuator;
mod choreography;

pub use actuator::{Actuator, LoggingActuator, PwmServo, ServoCommand};
pub use choreography::{Choreographer, Gesture, Move, eased_positions, smoothstep};
