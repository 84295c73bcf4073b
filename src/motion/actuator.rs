//! Head servo adapters

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{Error, Result};

/// PWM period for hobby servos (50 Hz)
const PERIOD_NS: u64 = 20_000_000;

/// Pulse width at the center position
const CENTER_PULSE_NS: f32 = 1_500_000.0;

/// Pulse width change from center to either extreme
const PULSE_RANGE_NS: f32 = 500_000.0;

/// What the servo should do
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ServoCommand {
    /// Hold a normalized position in [-1, 1]
    Position(f32),
    /// Stop driving the servo so it goes limp and quiet
    Idle,
}

impl ServoCommand {
    /// Position command clamped to [-1, 1]
    #[must_use]
    pub fn at(position: f32) -> Self {
        Self::Position(position.clamp(-1.0, 1.0))
    }
}

/// Something that can move the head
pub trait Actuator: Send + Sync {
    /// Apply a command
    ///
    /// # Errors
    ///
    /// Returns error if the driver rejects the write
    fn set(&self, command: ServoCommand) -> Result<()>;
}

/// Servo on a Linux sysfs PWM channel (`/sys/class/pwm/pwmchipN/pwmM`)
pub struct PwmServo {
    channel_dir: PathBuf,
    enabled: AtomicBool,
}

impl PwmServo {
    /// Export and configure a PWM channel
    ///
    /// # Errors
    ///
    /// Returns error if the channel cannot be exported or configured
    pub fn open(chip_dir: impl AsRef<Path>, channel: u32) -> Result<Self> {
        let chip_dir = chip_dir.as_ref();
        let channel_dir = chip_dir.join(format!("pwm{channel}"));

        if !channel_dir.exists() {
            write_attr(&chip_dir.join("export"), &channel.to_string())?;
        }

        let servo = Self {
            channel_dir,
            enabled: AtomicBool::new(false),
        };
        servo.write("period", &PERIOD_NS.to_string())?;
        servo.write("enable", "0")?;

        tracing::debug!(path = %servo.channel_dir.display(), "pwm servo ready");
        Ok(servo)
    }

    fn write(&self, attr: &str, value: &str) -> Result<()> {
        write_attr(&self.channel_dir.join(attr), value)
    }

    /// Duty cycle for a normalized position
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn duty_cycle_ns(position: f32) -> u64 {
        (CENTER_PULSE_NS + position.clamp(-1.0, 1.0) * PULSE_RANGE_NS).round() as u64
    }
}

impl Actuator for PwmServo {
    fn set(&self, command: ServoCommand) -> Result<()> {
        match command {
            ServoCommand::Position(position) => {
                self.write("duty_cycle", &Self::duty_cycle_ns(position).to_string())?;
                if !self.enabled.swap(true, Ordering::SeqCst) {
                    self.write("enable", "1")?;
                }
            }
            ServoCommand::Idle => {
                if self.enabled.swap(false, Ordering::SeqCst) {
                    self.write("enable", "0")?;
                }
            }
        }
        Ok(())
    }
}

fn write_attr(path: &Path, value: &str) -> Result<()> {
    std::fs::write(path, value)
        .map_err(|e| Error::Actuator(format!("{}: {e}", path.display())))
}

/// Actuator that only logs (no servo attached)
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingActuator;

impl Actuator for LoggingActuator {
    fn set(&self, command: ServoCommand) -> Result<()> {
        tracing::trace!(?command, "servo");
        Ok(())
    }
}
