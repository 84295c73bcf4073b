//! Face render loop

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use super::display::Display;
use super::draw::{FaceFrame, draw_face};
use super::state::{FaceState, blink_scale};
use crate::Result;

/// Target frame rate
pub const FPS: u32 = 30;

/// Log every Nth consecutive display failure after the first
const DISPLAY_ERROR_LOG_EVERY: u64 = 300;

/// Samples the face state and pushes frames to a display
pub struct FaceRenderer {
    state: FaceState,
    display: Box<dyn Display>,
    frame_interval: Duration,
    display_failures: u64,
}

impl FaceRenderer {
    #[must_use]
    pub fn new(state: FaceState, display: Box<dyn Display>) -> Self {
        Self {
            state,
            display,
            frame_interval: Duration::from_secs(1) / FPS,
            display_failures: 0,
        }
    }

    /// Render and show one frame for the given instants
    ///
    /// # Errors
    ///
    /// Returns error if the display rejects the frame
    pub fn render_once(&mut self, now: Instant, wall_secs: f64) -> Result<FaceFrame> {
        let blink = blink_scale(wall_secs);
        let tick = self.state.tick(now);
        let frame = FaceFrame {
            mood: tick.mood,
            blink,
            mouth_open: tick.mouth_open,
        };

        self.display.show(&draw_face(&frame))?;
        Ok(frame)
    }

    /// Run until `stop` is set
    ///
    /// Display errors are logged and the loop keeps going.
    pub fn run(mut self, stop: &AtomicBool) {
        tracing::info!(display = self.display.name(), fps = FPS, "face renderer started");

        while !stop.load(Ordering::Relaxed) {
            match self.render_once(Instant::now(), wall_clock_secs()) {
                Ok(_) => {
                    if self.display_failures > 0 {
                        tracing::info!(failures = self.display_failures, "display recovered");
                        self.display_failures = 0;
                    }
                }
                Err(e) => {
                    if self.display_failures % DISPLAY_ERROR_LOG_EVERY == 0 {
                        tracing::warn!(error = %e, failures = self.display_failures, "frame not shown");
                    }
                    self.display_failures += 1;
                }
            }
            std::thread::sleep(self.frame_interval);
        }

        tracing::info!("face renderer stopped");
    }

    /// Run on a dedicated thread
    ///
    /// # Errors
    ///
    /// Returns error if the thread cannot be spawned
    pub fn spawn(self, stop: Arc<AtomicBool>) -> Result<JoinHandle<()>> {
        let handle = std::thread::Builder::new()
            .name("face-renderer".to_string())
            .spawn(move || self.run(&stop))?;
        Ok(handle)
    }
}

/// Seconds since the Unix epoch
fn wall_clock_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |d| d.as_secs_f64())
}
