//! Touch handling
//!
//! A press that survives the hardware bounce filter and the one second
//! software debounce plays the poke gesture and tells the owner about it.
//! Both run in the background; the sensor thread never waits on them.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tokio::runtime::Handle;

use crate::channels::{Channel, OutgoingMessage};
use crate::motion::{Choreographer, Gesture};
use crate::{Error, Result};

/// Minimum spacing between accepted touches
pub const DEBOUNCE_WINDOW: Duration = Duration::from_secs(1);

/// How long a raw level must hold before it counts
pub const BOUNCE_FILTER: Duration = Duration::from_millis(100);

/// Sensor poll period
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// What happened to a press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchOutcome {
    Accepted,
    /// Too soon after the last accepted press
    Debounced,
}

/// Last accepted touch time, shared between sensor callbacks
#[derive(Debug)]
pub struct TouchDebouncer {
    window: Duration,
    last_accepted: Mutex<Option<Instant>>,
}

impl Default for TouchDebouncer {
    fn default() -> Self {
        Self::new(DEBOUNCE_WINDOW)
    }
}

impl TouchDebouncer {
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: Mutex::new(None),
        }
    }

    /// Accept the press at `now` unless one was accepted less than the
    /// window ago. Read and update happen under one lock.
    pub fn check(&self, now: Instant) -> bool {
        let mut last = self.last_accepted.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(previous) = *last
            && now.saturating_duration_since(previous) < self.window
        {
            return false;
        }

        *last = Some(now);
        true
    }
}

/// Reacts to touches with a poke and a notification
pub struct TouchDispatcher {
    debouncer: TouchDebouncer,
    choreographer: Choreographer,
    notifier: Arc<dyn Channel>,
    chat_id: String,
    message: String,
    runtime: Handle,
}

impl TouchDispatcher {
    /// `runtime` is where notifications are sent from; the dispatcher itself
    /// is called from a plain thread
    #[must_use]
    pub fn new(
        choreographer: Choreographer,
        notifier: Arc<dyn Channel>,
        chat_id: impl Into<String>,
        message: impl Into<String>,
        runtime: Handle,
    ) -> Self {
        Self {
            debouncer: TouchDebouncer::default(),
            choreographer,
            notifier,
            chat_id: chat_id.into(),
            message: message.into(),
            runtime,
        }
    }

    /// Handle a press happening now
    pub fn on_press(&self) -> TouchOutcome {
        self.on_press_at(Instant::now())
    }

    /// Handle a press at `now`
    pub fn on_press_at(&self, now: Instant) -> TouchOutcome {
        if !self.debouncer.check(now) {
            tracing::debug!("touch debounced");
            return TouchOutcome::Debounced;
        }

        tracing::info!("touched");

        if let Err(e) = self.choreographer.spawn(Gesture::poke()) {
            tracing::warn!(error = %e, "failed to start poke gesture");
        }

        let notifier = Arc::clone(&self.notifier);
        let message = OutgoingMessage::text(self.chat_id.clone(), self.message.clone());
        self.runtime.spawn(async move {
            if let Err(e) = notifier.send(message).await {
                tracing::warn!(channel = notifier.name(), error = %e, "failed to send poke notification");
            }
        });

        TouchOutcome::Accepted
    }
}

/// Reads the raw touch level
pub trait TouchSensor: Send {
    /// Whether the sensor is pressed right now
    ///
    /// # Errors
    ///
    /// Returns [`Error::Sensor`] if the sensor cannot be read
    fn is_pressed(&mut self) -> Result<bool>;
}

/// GPIO input exposed through sysfs, wired active-low with a pull-up
#[derive(Debug)]
pub struct SysfsTouchSensor {
    value_path: PathBuf,
}

impl SysfsTouchSensor {
    /// Use an already exported GPIO `value` file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read
    pub fn open(value_path: impl Into<PathBuf>) -> Result<Self> {
        let mut sensor = Self {
            value_path: value_path.into(),
        };
        sensor.is_pressed()?;
        tracing::debug!(path = %sensor.value_path.display(), "touch sensor opened");
        Ok(sensor)
    }

    /// Export `gpio` under `/sys/class/gpio` as an input and open it
    ///
    /// # Errors
    ///
    /// Returns error if the pin cannot be exported or configured
    pub fn export(gpio_root: &Path, gpio: u32) -> Result<Self> {
        let pin_dir = gpio_root.join(format!("gpio{gpio}"));
        if !pin_dir.exists() {
            fs::write(gpio_root.join("export"), gpio.to_string())
                .map_err(|e| Error::Sensor(format!("failed to export gpio{gpio}: {e}")))?;
        }
        fs::write(pin_dir.join("direction"), "in")
            .map_err(|e| Error::Sensor(format!("failed to set gpio{gpio} direction: {e}")))?;
        Self::open(pin_dir.join("value"))
    }
}

impl TouchSensor for SysfsTouchSensor {
    fn is_pressed(&mut self) -> Result<bool> {
        let raw = fs::read_to_string(&self.value_path)
            .map_err(|e| Error::Sensor(format!("{}: {e}", self.value_path.display())))?;
        // Active low
        Ok(raw.trim() == "0")
    }
}

/// Turns a noisy level into clean press edges
///
/// A new level only counts once it has held for the bounce period.
#[derive(Debug, Clone)]
pub struct EdgeFilter {
    bounce: Duration,
    stable: bool,
    candidate: bool,
    candidate_since: Option<Instant>,
}

impl EdgeFilter {
    #[must_use]
    pub const fn new(bounce: Duration) -> Self {
        Self {
            bounce,
            stable: false,
            candidate: false,
            candidate_since: None,
        }
    }

    /// Feed one sample; returns `true` on an accepted press edge
    pub fn update(&mut self, pressed: bool, now: Instant) -> bool {
        if pressed == self.stable {
            self.candidate_since = None;
            return false;
        }

        match self.candidate_since {
            Some(since) if self.candidate == pressed => {
                if now.saturating_duration_since(since) >= self.bounce {
                    self.stable = pressed;
                    self.candidate_since = None;
                    return pressed;
                }
            }
            _ => {
                self.candidate = pressed;
                self.candidate_since = Some(now);
            }
        }
        false
    }
}

/// Poll `sensor` on its own thread, calling `on_press` for each press
///
/// Read errors are logged once per run of failures and polling continues.
///
/// # Errors
///
/// Returns error if the thread cannot be spawned
pub fn spawn_touch_watcher<S, F>(
    mut sensor: S,
    on_press: F,
    stop: Arc<AtomicBool>,
) -> Result<JoinHandle<()>>
where
    S: TouchSensor + 'static,
    F: Fn() + Send + 'static,
{
    let handle = std::thread::Builder::new()
        .name("touch-sensor".to_string())
        .spawn(move || {
            let mut filter = EdgeFilter::new(BOUNCE_FILTER);
            let mut failing = false;

            while !stop.load(Ordering::Relaxed) {
                match sensor.is_pressed() {
                    Ok(pressed) => {
                        failing = false;
                        if filter.update(pressed, Instant::now()) {
                            on_press();
                        }
                    }
                    Err(e) => {
                        if !failing {
                            tracing::warn!(error = %e, "touch sensor read failed");
                        }
                        failing = true;
                    }
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            tracing::debug!("touch watcher stopped");
        })?;
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debouncer_window() {
        let debouncer = TouchDebouncer::default();
        let start = Instant::now();

        assert!(debouncer.check(start));
        assert!(!debouncer.check(start + Duration::from_millis(500)));
        assert!(debouncer.check(start + Duration::from_millis(1_500)));
        assert!(!debouncer.check(start + Duration::from_millis(2_000)));
    }

    #[test]
    fn dropped_press_does_not_extend_window() {
        let debouncer = TouchDebouncer::default();
        let start = Instant::now();

        assert!(debouncer.check(start));
        assert!(!debouncer.check(start + Duration::from_millis(900)));
        assert!(debouncer.check(start + Duration::from_millis(1_000)));
    }

    #[test]
    fn edge_filter_ignores_bounce() {
        let mut filter = EdgeFilter::new(BOUNCE_FILTER);
        let t = Instant::now();
        let ms = |n| t + Duration::from_millis(n);

        // Chatter shorter than the bounce period
        assert!(!filter.update(true, ms(0)));
        assert!(!filter.update(false, ms(30)));
        assert!(!filter.update(true, ms(60)));
        assert!(!filter.update(true, ms(120)));
        // Held long enough
        assert!(filter.update(true, ms(160)));
        // Still held: no new edge
        assert!(!filter.update(true, ms(500)));
        // Release then press again
        assert!(!filter.update(false, ms(600)));
        assert!(!filter.update(false, ms(700)));
        assert!(!filter.update(true, ms(800)));
        assert!(filter.update(true, ms(900)));
    }

    #[test]
    fn sysfs_sensor_is_active_low() {
        let dir = tempfile::tempdir().unwrap();
        let value = dir.path().join("value");
        fs::write(&value, "1\n").unwrap();

        let mut sensor = SysfsTouchSensor::open(&value).unwrap();
        assert!(!sensor.is_pressed().unwrap());

        fs::write(&value, "0\n").unwrap();
        assert!(sensor.is_pressed().unwrap());
    }

    #[test]
    fn missing_value_file_is_sensor_error() {
        assert!(matches!(
            SysfsTouchSensor::open("/nonexistent/gpio23/value"),
            Err(Error::Sensor(_))
        ));
    }
}
