//! Eased head gestures
//!
//! A [`Gesture`] is a list of moves played back serially on the servo.
//! Playback blocks (it sleeps between steps), so gestures run on their own
//! threads via [`Choreographer::spawn`].

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use super::actuator::{Actuator, ServoCommand};
use crate::Result;

/// Pause after centering and before releasing the servo
const SETTLE: Duration = Duration::from_millis(200);

/// One step of a gesture
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Move {
    /// Jump to a position and wait
    Set { position: f32, settle: Duration },
    /// Smoothstep from one position to another
    Ease {
        from: f32,
        to: f32,
        duration: Duration,
        steps: u32,
    },
    /// Wait before releasing, then stop driving the servo
    Release { settle: Duration },
}

/// A named, ordered list of moves
#[derive(Debug, Clone, PartialEq)]
pub struct Gesture {
    name: &'static str,
    moves: Vec<Move>,
}

impl Gesture {
    #[must_use]
    pub const fn new(name: &'static str, moves: Vec<Move>) -> Self {
        Self { name, moves }
    }

    /// Side-to-side "no", used when a message says no
    #[must_use]
    pub fn head_shake() -> Self {
        Self::swing(
            "head-shake",
            0.3,
            (Duration::from_millis(250), 20),
            (Duration::from_millis(200), 15),
        )
    }

    /// Slower, smaller shake acknowledging a touch
    #[must_use]
    pub fn poke() -> Self {
        Self::swing(
            "poke",
            0.25,
            (Duration::from_millis(400), 25),
            (Duration::from_millis(300), 20),
        )
    }

    /// Center, swing left/right twice, come back to center, release
    fn swing(
        name: &'static str,
        extent: f32,
        (swing_duration, swing_steps): (Duration, u32),
        (return_duration, return_steps): (Duration, u32),
    ) -> Self {
        let mut moves = vec![Move::Set {
            position: 0.0,
            settle: SETTLE,
        }];

        for _ in 0..2 {
            moves.push(Move::Ease {
                from: 0.0,
                to: -extent,
                duration: swing_duration,
                steps: swing_steps,
            });
            moves.push(Move::Ease {
                from: -extent,
                to: extent,
                duration: swing_duration,
                steps: swing_steps,
            });
        }

        moves.push(Move::Ease {
            from: extent,
            to: 0.0,
            duration: return_duration,
            steps: return_steps,
        });
        moves.push(Move::Release { settle: SETTLE });

        Self { name, moves }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn moves(&self) -> &[Move] {
        &self.moves
    }
}

/// Smoothstep easing, `p²(3 - 2p)`
#[must_use]
pub fn smoothstep(p: f32) -> f32 {
    let p = p.clamp(0.0, 1.0);
    p * p * (3.0 - 2.0 * p)
}

/// The `steps` positions visited when easing from `start` to `end`
///
/// The first is `start` and the last is `end`; a single step lands on `end`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn eased_positions(start: f32, end: f32, steps: u32) -> Vec<f32> {
    (0..steps)
        .map(|i| {
            let p = if steps > 1 {
                i as f32 / (steps - 1) as f32
            } else {
                1.0
            };
            start + (end - start) * smoothstep(p)
        })
        .collect()
}

/// Plays gestures on an actuator
#[derive(Clone)]
pub struct Choreographer {
    actuator: Arc<dyn Actuator>,
}

impl Choreographer {
    #[must_use]
    pub fn new(actuator: Arc<dyn Actuator>) -> Self {
        Self { actuator }
    }

    /// Ease from `start` to `end`, writing `steps` positions and sleeping
    /// `duration / steps` after each one
    ///
    /// # Errors
    ///
    /// Returns the first actuator error; remaining steps are skipped
    pub fn move_smooth(&self, start: f32, end: f32, duration: Duration, steps: u32) -> Result<()> {
        if steps == 0 {
            return Ok(());
        }

        let pause = duration / steps;
        for position in eased_positions(start, end, steps) {
            self.actuator.set(ServoCommand::at(position))?;
            std::thread::sleep(pause);
        }
        Ok(())
    }

    /// Play a gesture to completion, blocking
    ///
    /// If a move fails the rest are skipped and the servo is still released.
    ///
    /// # Errors
    ///
    /// Returns the actuator error that aborted the gesture
    pub fn perform(&self, gesture: &Gesture) -> Result<()> {
        tracing::debug!(gesture = gesture.name(), "gesture started");

        let result = gesture.moves().iter().try_for_each(|step| self.apply(*step));

        if let Err(e) = &result {
            tracing::warn!(gesture = gesture.name(), error = %e, "gesture aborted");
            if let Err(release_err) = self.actuator.set(ServoCommand::Idle) {
                tracing::warn!(error = %release_err, "failed to release servo");
            }
        } else {
            tracing::debug!(gesture = gesture.name(), "gesture finished");
        }

        result
    }

    fn apply(&self, step: Move) -> Result<()> {
        match step {
            Move::Set { position, settle } => {
                self.actuator.set(ServoCommand::at(position))?;
                std::thread::sleep(settle);
            }
            Move::Ease {
                from,
                to,
                duration,
                steps,
            } => self.move_smooth(from, to, duration, steps)?,
            Move::Release { settle } => {
                std::thread::sleep(settle);
                self.actuator.set(ServoCommand::Idle)?;
            }
        }
        Ok(())
    }

    /// Play a gesture on its own thread
    ///
    /// Nothing waits for it; failures are logged by [`Self::perform`].
    ///
    /// # Errors
    ///
    /// Returns error if the thread cannot be spawned
    pub fn spawn(&self, gesture: Gesture) -> Result<JoinHandle<()>> {
        let choreographer = self.clone();
        let handle = std::thread::Builder::new()
            .name(format!("gesture-{}", gesture.name()))
            .spawn(move || {
                let _ = choreographer.perform(&gesture);
            })?;
        Ok(handle)
    }
}
