//! TOML configuration file loading
//!
//! Supports `~/.config/teddy/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct TeddyConfigFile {
    /// Messaging configuration
    #[serde(default)]
    pub telegram: TelegramFileConfig,

    /// Speech configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Attached hardware
    #[serde(default)]
    pub hardware: HardwareFileConfig,
}

/// Telegram bot configuration
#[derive(Debug, Default, Deserialize)]
pub struct TelegramFileConfig {
    /// Bot API token
    pub token: Option<String>,

    /// The only user whose messages are spoken
    pub authorized_user_id: Option<String>,

    /// Text sent when the bear is touched
    pub poke_message: Option<String>,
}

/// Speech configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Synthesis endpoint (e.g. "http://192.168.1.20:5000/synthesize")
    pub endpoint: Option<String>,

    /// Speaker id passed to the synthesis server
    pub speaker: Option<String>,

    /// Speech rate
    pub speed: Option<f32>,

    /// Force one language ("en" or "ja") instead of detecting it
    pub language: Option<String>,

    /// Directory for transient audio files
    pub work_dir: Option<String>,
}

/// Hardware configuration
#[derive(Debug, Default, Deserialize)]
pub struct HardwareFileConfig {
    /// Run without display, servo, touch sensor or speaker
    pub headless: Option<bool>,

    /// Framebuffer device for the face (e.g. "/dev/fb1")
    pub framebuffer: Option<String>,

    /// sysfs PWM chip driving the neck servo (e.g. "/sys/class/pwm/pwmchip0")
    pub pwm_chip: Option<String>,

    /// PWM channel on that chip
    pub pwm_channel: Option<u32>,

    /// GPIO line of the touch sensor
    pub touch_gpio: Option<u32>,
}

/// Load the TOML config file from the standard path
///
/// Returns `TeddyConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> TeddyConfigFile {
    config_file_path().map_or_else(TeddyConfigFile::default, |path| load_config_file_from(&path))
}

/// Load a TOML config file from `path`
///
/// Returns `TeddyConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file_from(path: &Path) -> TeddyConfigFile {
    if !path.exists() {
        return TeddyConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                TeddyConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            TeddyConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/teddy/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("teddy").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_parses() {
        let file: TeddyConfigFile = toml::from_str(
            r#"
            [telegram]
            authorized_user_id = "12345"

            [voice]
            speed = 1.1
            "#,
        )
        .unwrap();

        assert_eq!(file.telegram.authorized_user_id.as_deref(), Some("12345"));
        assert!(file.telegram.token.is_none());
        assert_eq!(file.voice.speed, Some(1.1));
        assert!(file.hardware.headless.is_none());
    }

    #[test]
    fn broken_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[voice\nspeed = ").unwrap();

        let file = load_config_file_from(&path);
        assert!(file.voice.speed.is_none());
    }
}
