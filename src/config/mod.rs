//! Companion configuration
//!
//! Every setting is resolved env > TOML file > default.

pub mod file;

use std::path::PathBuf;
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};

use crate::classify::Language;
use crate::voice::VoiceSettings;
use crate::{Error, Result};

/// Default synthesis endpoint (voice server on the same host)
pub const DEFAULT_SYNTHESIS_ENDPOINT: &str = "http://127.0.0.1:5000/synthesize";

/// Default speech rate
pub const DEFAULT_VOICE_SPEED: f32 = 0.9;

/// Default touch notification
pub const DEFAULT_POKE_MESSAGE: &str = "You got poked 💕";

/// Default framebuffer for the face display
pub const DEFAULT_FRAMEBUFFER: &str = "/dev/fb1";

/// Default PWM chip for the neck servo
pub const DEFAULT_PWM_CHIP: &str = "/sys/class/pwm/pwmchip0";

/// GPIO line of the touch sensor
pub const DEFAULT_TOUCH_GPIO: u32 = 23;

/// Companion configuration
#[derive(Debug)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub voice: VoiceConfig,
    pub hardware: HardwareConfig,
}

/// Messaging configuration
#[derive(Debug)]
pub struct TelegramConfig {
    /// Bot API token, redacted in debug output
    pub token: Option<SecretString>,

    /// Sender whose messages are spoken; poke notifications go here too
    pub authorized_user_id: Option<String>,

    pub poke_message: String,
}

/// Speech configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    pub endpoint: String,
    pub speaker: String,
    pub speed: f32,
    /// Skip detection and always use this language
    pub forced_language: Option<Language>,
    pub work_dir: PathBuf,
}

/// Hardware configuration
#[derive(Debug, Clone)]
pub struct HardwareConfig {
    /// Use null/logging adapters instead of real devices
    pub headless: bool,
    pub framebuffer: PathBuf,
    pub pwm_chip: PathBuf,
    pub pwm_channel: u32,
    pub touch_gpio: u32,
}

impl Config {
    /// Load configuration from the environment and the config file
    ///
    /// # Errors
    ///
    /// Returns error if a setting has an invalid value
    pub fn load() -> Result<Self> {
        Self::from_sources(file::load_config_file(), |key| std::env::var(key).ok())
    }

    /// Merge a parsed config file with an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if a setting has an invalid value
    pub fn from_sources(
        fc: file::TeddyConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let telegram = TelegramConfig {
            token: env("TELEGRAM_BOT_TOKEN")
                .or(fc.telegram.token)
                .map(SecretString::from),
            authorized_user_id: env("TEDDY_AUTHORIZED_USER_ID").or(fc.telegram.authorized_user_id),
            poke_message: env("TEDDY_POKE_MESSAGE")
                .or(fc.telegram.poke_message)
                .unwrap_or_else(|| DEFAULT_POKE_MESSAGE.to_string()),
        };

        let speed = match env("TEDDY_VOICE_SPEED") {
            Some(raw) => parse_setting::<f32>("TEDDY_VOICE_SPEED", &raw)?,
            None => fc.voice.speed.unwrap_or(DEFAULT_VOICE_SPEED),
        };
        if !(speed.is_finite() && speed > 0.0) {
            return Err(Error::Config(format!("voice speed must be positive, got {speed}")));
        }

        let forced_language = env("TEDDY_LANGUAGE")
            .or(fc.voice.language)
            .filter(|s| !s.is_empty() && s != "auto")
            .map(|s| s.parse::<Language>())
            .transpose()?;

        let voice = VoiceConfig {
            endpoint: env("TEDDY_SYNTHESIS_URL")
                .or(fc.voice.endpoint)
                .unwrap_or_else(|| DEFAULT_SYNTHESIS_ENDPOINT.to_string()),
            speaker: env("TEDDY_SPEAKER")
                .or(fc.voice.speaker)
                .unwrap_or_else(|| "default".to_string()),
            speed,
            forced_language,
            work_dir: env("TEDDY_WORK_DIR")
                .or(fc.voice.work_dir)
                .map_or_else(std::env::temp_dir, PathBuf::from),
        };

        let headless = match env("TEDDY_HEADLESS") {
            Some(raw) => parse_flag("TEDDY_HEADLESS", &raw)?,
            None => fc.hardware.headless.unwrap_or(false),
        };
        let pwm_channel = match env("TEDDY_PWM_CHANNEL") {
            Some(raw) => parse_setting("TEDDY_PWM_CHANNEL", &raw)?,
            None => fc.hardware.pwm_channel.unwrap_or(0),
        };
        let touch_gpio = match env("TEDDY_TOUCH_GPIO") {
            Some(raw) => parse_setting("TEDDY_TOUCH_GPIO", &raw)?,
            None => fc.hardware.touch_gpio.unwrap_or(DEFAULT_TOUCH_GPIO),
        };

        let hardware = HardwareConfig {
            headless,
            framebuffer: env("TEDDY_FRAMEBUFFER")
                .or(fc.hardware.framebuffer)
                .map_or_else(|| PathBuf::from(DEFAULT_FRAMEBUFFER), PathBuf::from),
            pwm_chip: env("TEDDY_PWM_CHIP")
                .or(fc.hardware.pwm_chip)
                .map_or_else(|| PathBuf::from(DEFAULT_PWM_CHIP), PathBuf::from),
            pwm_channel,
            touch_gpio,
        };

        Ok(Self {
            telegram,
            voice,
            hardware,
        })
    }

    /// Authorized sender id, required to run the daemon
    ///
    /// # Errors
    ///
    /// Returns error if no authorized user is configured
    pub fn authorized_user_id(&self) -> Result<&str> {
        self.telegram
            .authorized_user_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                Error::Config(
                    "no authorized user; set TEDDY_AUTHORIZED_USER_ID or telegram.authorized_user_id"
                        .to_string(),
                )
            })
    }

    /// Bot token, required to run the daemon
    ///
    /// # Errors
    ///
    /// Returns error if no token is configured
    pub fn telegram_token(&self) -> Result<&str> {
        self.telegram
            .token
            .as_ref()
            .map(ExposeSecret::expose_secret)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                Error::Config("no Telegram token; set TELEGRAM_BOT_TOKEN or telegram.token".to_string())
            })
    }

    /// Settings for the voice orchestrator
    #[must_use]
    pub fn voice_settings(&self) -> VoiceSettings {
        VoiceSettings {
            speaker: self.voice.speaker.clone(),
            speed: self.voice.speed,
            forced_language: self.voice.forced_language,
            work_dir: self.voice.work_dir.clone(),
            ..VoiceSettings::default()
        }
    }
}

fn parse_setting<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| Error::Config(format!("invalid {key}={raw}: {e}")))
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(Error::Config(format!("invalid {key}={raw}: expected a boolean"))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::file::TeddyConfigFile;
    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_sources() {
        let config = Config::from_sources(TeddyConfigFile::default(), env_from(&[])).unwrap();

        assert_eq!(config.voice.endpoint, DEFAULT_SYNTHESIS_ENDPOINT);
        assert!((config.voice.speed - 0.9).abs() < f32::EPSILON);
        assert!(config.voice.forced_language.is_none());
        assert_eq!(config.telegram.poke_message, "You got poked 💕");
        assert_eq!(config.hardware.touch_gpio, 23);
        assert!(!config.hardware.headless);
        assert!(matches!(config.authorized_user_id(), Err(Error::Config(_))));
    }

    #[test]
    fn env_overrides_file() {
        let fc: TeddyConfigFile = toml::from_str(
            r#"
            [telegram]
            authorized_user_id = "111"
            [voice]
            speed = 1.2
            language = "ja"
            "#,
        )
        .unwrap();

        let config = Config::from_sources(
            fc,
            env_from(&[("TEDDY_AUTHORIZED_USER_ID", "222"), ("TEDDY_HEADLESS", "true")]),
        )
        .unwrap();

        assert_eq!(config.authorized_user_id().unwrap(), "222");
        assert!((config.voice.speed - 1.2).abs() < f32::EPSILON);
        assert_eq!(config.voice.forced_language, Some(Language::Japanese));
        assert!(config.hardware.headless);
    }

    #[test]
    fn auto_language_means_detect() {
        let config = Config::from_sources(
            TeddyConfigFile::default(),
            env_from(&[("TEDDY_LANGUAGE", "auto")]),
        )
        .unwrap();
        assert!(config.voice.forced_language.is_none());
    }

    #[test]
    fn invalid_values_are_config_errors() {
        for (key, value) in [
            ("TEDDY_VOICE_SPEED", "fast"),
            ("TEDDY_VOICE_SPEED", "-1"),
            ("TEDDY_LANGUAGE", "klingon"),
            ("TEDDY_HEADLESS", "maybe"),
            ("TEDDY_TOUCH_GPIO", "twenty"),
        ] {
            let result = Config::from_sources(TeddyConfigFile::default(), env_from(&[(key, value)]));
            assert!(matches!(result, Err(Error::Config(_))), "{key}={value}");
        }
    }

    #[test]
    fn headless_accepts_common_spellings() {
        for value in ["1", "yes", "on", "TRUE"] {
            let config = Config::from_sources(
                TeddyConfigFile::default(),
                env_from(&[("TEDDY_HEADLESS", value)]),
            )
            .unwrap();
            assert!(config.hardware.headless, "TEDDY_HEADLESS={value}");
        }
    }

    #[test]
    fn token_is_redacted_in_debug_output() {
        let config = Config::from_sources(
            TeddyConfigFile::default(),
            env_from(&[("TELEGRAM_BOT_TOKEN", "123:very-secret")]),
        )
        .unwrap();

        assert_eq!(config.telegram_token().unwrap(), "123:very-secret");
        assert!(!format!("{config:?}").contains("very-secret"));
    }
}
