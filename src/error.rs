//! Error types for the companion

use thiserror::Error;

/// Result type alias for companion operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving the companion
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Network failure talking to the synthesis server or messaging API,
    /// including timeouts and non-success status codes
    #[error("transport error: {0}")]
    Transport(String),

    /// Transcoding, decoding or playback error
    #[error("media error: {0}")]
    Media(String),

    /// Servo/actuator write error
    #[error("actuator error: {0}")]
    Actuator(String),

    /// Display driver error
    #[error("display error: {0}")]
    Display(String),

    /// Touch sensor error
    #[error("sensor error: {0}")]
    Sensor(String),

    /// Channel error
    #[error("channel error: {0}")]
    Channel(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Whether this error came from the network side of a request
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Http(_))
    }
}
