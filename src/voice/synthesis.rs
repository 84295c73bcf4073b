//! Speech synthesis client
//!
//! Talks to the voice-clone server on the PC: `POST /synthesize` with a JSON
//! body returns audio bytes (MP3 from the plain TTS path, WAV when cloning
//! is enabled). `GET /health` reports what the server can do.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::classify::Language;
use crate::{Error, Result};

/// Client-side limit for one synthesis request
pub const SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(15);

/// Body of a synthesis request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisRequest {
    pub text: String,
    pub speaker: String,
    pub speed: f32,
    pub language: Language,
}

/// What the server reports from `/health`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SynthesisHealth {
    pub status: String,
    #[serde(default)]
    pub voice_cloning: bool,
    #[serde(default)]
    pub english_voice: bool,
    #[serde(default)]
    pub japanese_voice: bool,
}

/// Turns text into audio bytes
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize one utterance
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] on network failure, timeout or a
    /// non-success status
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>>;
}

/// HTTP client for the synthesis server
#[derive(Clone)]
pub struct SynthesisClient {
    client: reqwest::Client,
    endpoint: reqwest::Url,
    timeout: Duration,
}

impl SynthesisClient {
    /// Create a client for `endpoint` (e.g. `http://192.168.1.20:5000/synthesize`)
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint is not a valid URL or the HTTP client
    /// cannot be built
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint = reqwest::Url::parse(endpoint)
            .map_err(|e| Error::Config(format!("invalid synthesis endpoint {endpoint}: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    #[must_use]
    pub const fn endpoint(&self) -> &reqwest::Url {
        &self.endpoint
    }

    /// Ask the server what it supports
    ///
    /// # Errors
    ///
    /// Returns error if the server is unreachable or answers with garbage
    pub async fn health(&self) -> Result<SynthesisHealth> {
        let url = self
            .endpoint
            .join("health")
            .map_err(|e| Error::Config(format!("invalid health URL: {e}")))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        if !response.status().is_success() {
            return Err(Error::Transport(format!(
                "health check returned {}",
                response.status()
            )));
        }

        let body = response.text().await.map_err(|e| self.transport_error(&e))?;
        Ok(serde_json::from_str(&body)?)
    }

    fn transport_error(&self, e: &reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Transport(format!(
                "synthesis server timed out after {}s",
                self.timeout.as_secs_f32()
            ))
        } else {
            Error::Transport(format!("synthesis server unreachable: {e}"))
        }
    }
}

#[async_trait]
impl Synthesizer for SynthesisClient {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Transport(format!("synthesis error {status}: {body}")));
        }

        let audio = response.bytes().await.map_err(|e| self.transport_error(&e))?;
        tracing::debug!(bytes = audio.len(), "synthesis complete");
        Ok(audio.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_language_code() {
        let request = SynthesisRequest {
            text: "hi".to_string(),
            speaker: "default".to_string(),
            speed: 0.9,
            language: Language::Japanese,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["language"], "ja");
        assert_eq!(json["speaker"], "default");
    }

    #[test]
    fn rejects_bad_endpoint() {
        assert!(matches!(
            SynthesisClient::new("not a url", SYNTHESIS_TIMEOUT),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn health_parses_server_report() {
        let health: SynthesisHealth = serde_json::from_str(
            r#"{"status":"ok","openai":"enabled","voice_cloning":true,"english_voice":true,"japanese_voice":false}"#,
        )
        .unwrap();
        assert!(health.voice_cloning);
        assert!(!health.japanese_voice);
    }
}
