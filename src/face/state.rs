//! Shared face state
//!
//! The renderer and the voice orchestrator run on different threads and
//! both touch this state. Every access takes the lock exactly once, so a
//! reader never sees a mood paired with another mood's expiry.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::Mood;

/// Mouth phase advance per rendered frame while speaking
pub const MOUTH_PHASE_STEP: f32 = 0.3;

/// Length of one blink cycle in seconds
pub const BLINK_PERIOD_SECS: f64 = 5.0;

#[derive(Debug)]
struct Inner {
    mood: Mood,
    mood_expiry: Instant,
    is_speaking: bool,
    mouth_phase: f32,
}

/// Point-in-time copy of the face state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceSnapshot {
    pub mood: Mood,
    pub mood_expiry: Instant,
    pub is_speaking: bool,
    pub mouth_phase: f32,
}

/// Result of one render tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutput {
    /// Mood after expiry was applied
    pub mood: Mood,
    /// Mouth openness in [0, 1]
    pub mouth_open: f32,
    pub is_speaking: bool,
}

/// Cloneable handle to the shared face state
#[derive(Debug, Clone)]
pub struct FaceState {
    inner: Arc<Mutex<Inner>>,
}

impl Default for FaceState {
    fn default() -> Self {
        Self::new()
    }
}

impl FaceState {
    /// Neutral, silent face
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                mood: Mood::Neutral,
                mood_expiry: Instant::now(),
                is_speaking: false,
                mouth_phase: 0.0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Copy the whole state
    #[must_use]
    pub fn snapshot(&self) -> FaceSnapshot {
        let inner = self.lock();
        FaceSnapshot {
            mood: inner.mood,
            mood_expiry: inner.mood_expiry,
            is_speaking: inner.is_speaking,
            mouth_phase: inner.mouth_phase,
        }
    }

    /// Show `mood` for `duration` starting now
    pub fn set_mood(&self, mood: Mood, duration: Duration) {
        self.set_mood_at(mood, duration, Instant::now());
    }

    /// Show `mood` for `duration` starting at `now`
    pub fn set_mood_at(&self, mood: Mood, duration: Duration, now: Instant) {
        let mut inner = self.lock();
        inner.mood = mood;
        inner.mood_expiry = now + duration;
    }

    pub fn set_speaking(&self, speaking: bool) {
        let mut inner = self.lock();
        inner.is_speaking = speaking;
        if !speaking {
            inner.mouth_phase = 0.0;
        }
    }

    /// Set mood and start speaking in one step
    ///
    /// The returned guard stops speaking when dropped, whichever way the
    /// caller leaves its scope.
    #[must_use = "speaking stops as soon as the guard is dropped"]
    pub fn begin_speaking(&self, mood: Mood, duration: Duration) -> SpeakingGuard {
        {
            let mut inner = self.lock();
            inner.mood = mood;
            inner.mood_expiry = Instant::now() + duration;
            inner.is_speaking = true;
        }
        SpeakingGuard {
            state: self.clone(),
        }
    }

    #[must_use]
    pub fn mood(&self) -> Mood {
        self.lock().mood
    }

    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.lock().is_speaking
    }

    /// Advance the animation by one frame
    ///
    /// Moves the mouth while speaking (and zeroes it otherwise) and drops an
    /// expired mood back to neutral.
    pub fn tick(&self, now: Instant) -> TickOutput {
        let mut inner = self.lock();

        let mouth_open = if inner.is_speaking {
            inner.mouth_phase += MOUTH_PHASE_STEP;
            (inner.mouth_phase.sin() + 1.0) / 2.0
        } else {
            inner.mouth_phase = 0.0;
            0.0
        };

        if inner.mood != Mood::Neutral && now >= inner.mood_expiry {
            tracing::debug!(mood = %inner.mood, "mood expired");
            inner.mood = Mood::Neutral;
        }

        TickOutput {
            mood: inner.mood,
            mouth_open,
            is_speaking: inner.is_speaking,
        }
    }
}

/// Clears the speaking flag on drop
#[derive(Debug)]
pub struct SpeakingGuard {
    state: FaceState,
}

impl Drop for SpeakingGuard {
    fn drop(&mut self) {
        self.state.set_speaking(false);
    }
}

/// Eye height scale for a wall-clock time in seconds
///
/// A blink happens at the start of every five second cycle: almost closed
/// for 100 ms, half open for the next 100 ms, then open.
#[must_use]
pub fn blink_scale(wall_secs: f64) -> f32 {
    let t = wall_secs.rem_euclid(BLINK_PERIOD_SECS);
    if t < 0.1 {
        0.1
    } else if t < 0.2 {
        0.4
    } else {
        1.0
    }
}
