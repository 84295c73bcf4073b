//! Daemon - the companion service
//!
//! Wires the face, head, voice and Telegram together and runs until
//! interrupted.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::channels::{Channel, TelegramChannel};
use crate::config::HardwareConfig;
use crate::dispatch::{MessageDispatcher, SysfsTouchSensor, TouchDispatcher, spawn_touch_watcher};
use crate::face::{Display, FaceRenderer, FaceState, FramebufferDisplay, NullDisplay};
use crate::motion::{Actuator, Choreographer, LoggingActuator, PwmServo};
use crate::voice::{
    CpalPlayer, NullPlayer, Player, SYNTHESIS_TIMEOUT, SynthesisClient, Transcoder,
    VoiceOrchestrator, default_transcoder,
};
use crate::{Config, Result};

/// Pause between Telegram long polls
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// sysfs GPIO root
const GPIO_ROOT: &str = "/sys/class/gpio";

/// Device handles, opened once at startup
pub struct Hardware {
    pub display: Box<dyn Display>,
    pub actuator: Arc<dyn Actuator>,
    pub player: Arc<dyn Player>,
    pub touch: Option<SysfsTouchSensor>,
}

impl Hardware {
    /// Stand-ins for every device
    #[must_use]
    pub fn headless() -> Self {
        Self {
            display: Box::new(NullDisplay),
            actuator: Arc::new(LoggingActuator),
            player: Arc::new(NullPlayer),
            touch: None,
        }
    }

    /// Open the configured devices
    ///
    /// A device that fails to open is replaced by its stand-in with a
    /// warning, so a missing servo never keeps the bear from talking.
    #[must_use]
    pub fn open(config: &HardwareConfig) -> Self {
        if config.headless {
            tracing::info!("headless mode, no devices opened");
            return Self::headless();
        }

        let display: Box<dyn Display> = match FramebufferDisplay::open(&config.framebuffer) {
            Ok(fb) => Box::new(fb),
            Err(e) => {
                tracing::warn!(error = %e, "display unavailable, rendering to nowhere");
                Box::new(NullDisplay)
            }
        };

        let actuator: Arc<dyn Actuator> = match PwmServo::open(&config.pwm_chip, config.pwm_channel) {
            Ok(servo) => Arc::new(servo),
            Err(e) => {
                tracing::warn!(error = %e, "servo unavailable, gestures will only be logged");
                Arc::new(LoggingActuator)
            }
        };

        let player: Arc<dyn Player> = match CpalPlayer::new() {
            Ok(player) => Arc::new(player),
            Err(e) => {
                tracing::warn!(error = %e, "speaker unavailable, playback will be silent");
                Arc::new(NullPlayer)
            }
        };

        let touch = match SysfsTouchSensor::export(Path::new(GPIO_ROOT), config.touch_gpio) {
            Ok(sensor) => Some(sensor),
            Err(e) => {
                tracing::warn!(error = %e, gpio = config.touch_gpio, "touch sensor unavailable");
                None
            }
        };

        Self {
            display,
            actuator,
            player,
            touch,
        }
    }
}

/// Build the voice orchestrator from configuration
///
/// # Errors
///
/// Returns error if the synthesis endpoint is invalid
pub fn build_voice(
    config: &Config,
    face: FaceState,
    choreographer: Choreographer,
    player: Arc<dyn Player>,
) -> Result<VoiceOrchestrator> {
    let synthesizer = SynthesisClient::new(&config.voice.endpoint, SYNTHESIS_TIMEOUT)?;
    let transcoder: Arc<dyn Transcoder> = Arc::from(default_transcoder());

    tracing::debug!(transcoder = transcoder.name(), player = player.name(), "voice pipeline");

    Ok(VoiceOrchestrator::new(
        Arc::new(synthesizer),
        transcoder,
        player,
        face,
        choreographer,
        config.voice_settings(),
    ))
}

/// Check the synthesis server once and report what it can do
pub async fn probe_synthesis(client: &SynthesisClient) {
    match client.health().await {
        Ok(health) => {
            tracing::info!(
                status = %health.status,
                voice_cloning = health.voice_cloning,
                english_voice = health.english_voice,
                japanese_voice = health.japanese_voice,
                "synthesis server reachable"
            );
            if !health.voice_cloning {
                tracing::info!("voice cloning unavailable, server will use its stock voice");
            }
        }
        Err(e) => {
            tracing::warn!(
                endpoint = %client.endpoint(),
                error = %e,
                "synthesis server not reachable yet, messages will fail until it is"
            );
        }
    }
}

/// The companion daemon
pub struct Daemon {
    config: Config,
    hardware: Hardware,
}

impl Daemon {
    /// Create a daemon from configuration and opened devices
    ///
    /// # Errors
    ///
    /// Returns error if the Telegram token or authorized user is missing
    pub fn new(config: Config, hardware: Hardware) -> Result<Self> {
        config.telegram_token()?;
        config.authorized_user_id()?;
        Ok(Self { config, hardware })
    }

    /// Run the daemon until interrupted
    ///
    /// # Errors
    ///
    /// Returns error if Telegram cannot be reached at startup or a worker
    /// thread cannot be spawned
    #[allow(clippy::too_many_lines)]
    pub async fn run(self) -> Result<()> {
        let Self { config, hardware } = self;
        let token = config.telegram_token()?.to_string();
        let owner = config.authorized_user_id()?.to_string();

        tracing::info!("{}", "=".repeat(50));
        tracing::info!("teddy companion starting");
        tracing::info!("{}", "=".repeat(50));

        let face = FaceState::new();
        let choreographer = Choreographer::new(Arc::clone(&hardware.actuator));
        let voice = build_voice(&config, face.clone(), choreographer.clone(), hardware.player)?;

        let probe = SynthesisClient::new(&config.voice.endpoint, SYNTHESIS_TIMEOUT)?;
        probe_synthesis(&probe).await;

        let stop = Arc::new(AtomicBool::new(false));
        let renderer = FaceRenderer::new(face, hardware.display).spawn(Arc::clone(&stop))?;

        let (mut telegram, mut rx) = TelegramChannel::with_receiver(token);
        telegram.connect().await?;
        let poller = telegram.start_polling(POLL_INTERVAL)?;
        let telegram = Arc::new(telegram);

        let touch_watcher = match hardware.touch {
            Some(sensor) => {
                let dispatcher = TouchDispatcher::new(
                    choreographer,
                    Arc::clone(&telegram) as Arc<dyn Channel>,
                    owner.clone(),
                    config.telegram.poke_message.clone(),
                    tokio::runtime::Handle::current(),
                );
                let watcher = spawn_touch_watcher(
                    sensor,
                    move || {
                        dispatcher.on_press();
                    },
                    Arc::clone(&stop),
                )?;
                Some(watcher)
            }
            None => None,
        };

        let dispatcher = MessageDispatcher::new(owner, voice);

        tracing::info!(
            endpoint = %config.voice.endpoint,
            language = config.voice.forced_language.map_or("auto", |l| l.code()),
            touch = touch_watcher.is_some(),
            "ready to receive your messages"
        );

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("shutdown requested");
                    break;
                }
                message = rx.recv() => {
                    let Some(message) = message else {
                        tracing::warn!("Telegram polling stopped");
                        break;
                    };
                    let dispatcher = dispatcher.clone();
                    tokio::spawn(async move {
                        dispatcher.handle(&message).await;
                    });
                }
            }
        }

        stop.store(true, Ordering::Relaxed);
        poller.abort();

        let joined = tokio::task::spawn_blocking(move || {
            let _ = renderer.join();
            if let Some(watcher) = touch_watcher {
                let _ = watcher.join();
            }
        })
        .await;
        if let Err(e) = joined {
            tracing::warn!(error = %e, "worker threads did not stop cleanly");
        }

        tracing::info!("daemon stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::file::TeddyConfigFile;

    #[test]
    fn daemon_requires_owner_and_token() {
        let config = Config::from_sources(TeddyConfigFile::default(), |key| {
            (key == "TELEGRAM_BOT_TOKEN").then(|| "123:abc".to_string())
        })
        .unwrap();

        assert!(matches!(
            Daemon::new(config, Hardware::headless()),
            Err(crate::Error::Config(_))
        ));
    }

    #[test]
    fn headless_hardware_has_no_touch() {
        let config = Config::from_sources(TeddyConfigFile::default(), |key| {
            (key == "TEDDY_HEADLESS").then(|| "1".to_string())
        })
        .unwrap();

        let hardware = Hardware::open(&config.hardware);
        assert!(hardware.touch.is_none());
        assert_eq!(hardware.display.name(), "null");
        assert_eq!(hardware.player.name(), "null");
    }
}
