//! Speaking an utterance
//!
//! One `speak` call runs strictly in order: synthesize, transcode, set the
//! mood and speaking flag, optionally start the head shake, play, clear the
//! speaking flag. The flag is cleared by a guard, so a failed transcode or
//! playback still leaves the face quiet.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::classify::{Language, classify_language};
use crate::face::{FaceState, Mood};
use crate::motion::{Choreographer, Gesture};
use crate::{Error, Result};

use super::playback::Player;
use super::synthesis::{SynthesisRequest, Synthesizer};
use super::transcode::Transcoder;

/// How long a mood set by speech stays on the face
pub const MOOD_DURATION: Duration = Duration::from_secs(5);

/// Fixed parameters for every utterance
#[derive(Debug, Clone)]
pub struct VoiceSettings {
    /// Speaker id sent to the synthesis server
    pub speaker: String,
    /// Speech rate
    pub speed: f32,
    /// When set, skip language detection
    pub forced_language: Option<Language>,
    pub mood_duration: Duration,
    /// Where transient audio files go
    pub work_dir: PathBuf,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            speaker: "default".to_string(),
            speed: 0.9,
            forced_language: None,
            mood_duration: MOOD_DURATION,
            work_dir: std::env::temp_dir(),
        }
    }
}

/// Turns text into speech with a matching face and gesture
#[derive(Clone)]
pub struct VoiceOrchestrator {
    synthesizer: Arc<dyn Synthesizer>,
    transcoder: Arc<dyn Transcoder>,
    player: Arc<dyn Player>,
    face: FaceState,
    choreographer: Choreographer,
    settings: VoiceSettings,
}

impl VoiceOrchestrator {
    #[must_use]
    pub fn new(
        synthesizer: Arc<dyn Synthesizer>,
        transcoder: Arc<dyn Transcoder>,
        player: Arc<dyn Player>,
        face: FaceState,
        choreographer: Choreographer,
        settings: VoiceSettings,
    ) -> Self {
        Self {
            synthesizer,
            transcoder,
            player,
            face,
            choreographer,
            settings,
        }
    }

    /// Language used for `text`
    #[must_use]
    pub fn language_for(&self, text: &str) -> Language {
        self.settings
            .forced_language
            .unwrap_or_else(|| classify_language(text))
    }

    /// Speak `text`, logging any failure
    ///
    /// Failures never reach the caller; the face is quiet afterwards either way.
    pub async fn speak(&self, text: &str, mood: Option<Mood>, head_shake: bool) {
        if let Err(e) = self.try_speak(text, mood, head_shake).await {
            if e.is_transport() {
                tracing::warn!(error = %e, "synthesis failed, not speaking");
            } else {
                tracing::error!(error = %e, "failed to speak");
            }
        }
    }

    /// Speak `text`, returning the first failure
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if synthesis fails (nothing else
    /// happens in that case) or [`Error::Media`] if transcoding or playback
    /// fails
    pub async fn try_speak(&self, text: &str, mood: Option<Mood>, head_shake: bool) -> Result<()> {
        let language = self.language_for(text);
        let request = SynthesisRequest {
            text: text.to_string(),
            speaker: self.settings.speaker.clone(),
            speed: self.settings.speed,
            language,
        };

        tracing::info!(language = %language, chars = text.chars().count(), "synthesizing");
        let audio = self.synthesizer.synthesize(&request).await?;

        // Per-call files so overlapping utterances never share paths
        let dir = tempfile::Builder::new()
            .prefix("teddy-voice-")
            .tempdir_in(&self.settings.work_dir)?;
        let raw = dir.path().join("voice.audio");
        let wav = dir.path().join("voice.wav");

        tokio::fs::write(&raw, &audio).await?;
        self.transcoder.transcode(&raw, &wav).await?;

        let mood = mood.unwrap_or_default();
        let _speaking = self.face.begin_speaking(mood, self.settings.mood_duration);

        if head_shake
            && let Err(e) = self.choreographer.spawn(Gesture::head_shake())
        {
            tracing::warn!(error = %e, "failed to start head shake");
        }

        tracing::debug!(mood = %mood, player = self.player.name(), "playing");
        let player = Arc::clone(&self.player);
        tokio::task::spawn_blocking(move || player.play(&wav))
            .await
            .map_err(|e| Error::Media(format!("playback task failed: {e}")))??;

        tracing::info!(mood = %mood, "finished speaking");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::motion::LoggingActuator;

    struct Failing;

    #[async_trait]
    impl Synthesizer for Failing {
        async fn synthesize(&self, _request: &SynthesisRequest) -> Result<Vec<u8>> {
            Err(Error::Transport("synthesis server timed out after 15s".to_string()))
        }
    }

    struct Echo(Mutex<Vec<SynthesisRequest>>);

    #[async_trait]
    impl Synthesizer for Echo {
        async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>> {
            self.0.lock().unwrap().push(request.clone());
            Ok(b"audio".to_vec())
        }
    }

    struct CopyTranscoder;

    #[async_trait]
    impl Transcoder for CopyTranscoder {
        fn name(&self) -> &'static str {
            "copy"
        }

        async fn transcode(&self, input: &Path, output: &Path) -> Result<()> {
            tokio::fs::copy(input, output).await?;
            Ok(())
        }
    }

    struct BrokenPlayer;

    impl Player for BrokenPlayer {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn play(&self, _wav: &Path) -> Result<()> {
            Err(Error::Media("device busy".to_string()))
        }
    }

    fn orchestrator(synthesizer: Arc<dyn Synthesizer>, player: Arc<dyn Player>) -> VoiceOrchestrator {
        VoiceOrchestrator::new(
            synthesizer,
            Arc::new(CopyTranscoder),
            player,
            FaceState::new(),
            Choreographer::new(Arc::new(LoggingActuator)),
            VoiceSettings::default(),
        )
    }

    #[tokio::test]
    async fn synthesis_failure_leaves_face_untouched() {
        let voice = orchestrator(Arc::new(Failing), Arc::new(BrokenPlayer));

        let result = voice.try_speak("hello", Some(Mood::Angry), false).await;

        assert!(matches!(result, Err(Error::Transport(_))));
        assert!(!voice.face.is_speaking());
        assert_eq!(voice.face.mood(), Mood::Neutral);
    }

    #[tokio::test]
    async fn playback_failure_still_clears_speaking() {
        let voice = orchestrator(Arc::new(Echo(Mutex::default())), Arc::new(BrokenPlayer));

        let result = voice.try_speak("hello", Some(Mood::Happy), false).await;

        assert!(matches!(result, Err(Error::Media(_))));
        assert!(!voice.face.is_speaking());
        assert_eq!(voice.face.mood(), Mood::Happy);
    }

    #[tokio::test]
    async fn forced_language_skips_detection() {
        let synth = Arc::new(Echo(Mutex::default()));
        let mut voice = orchestrator(synth.clone(), Arc::new(BrokenPlayer));
        voice.settings.forced_language = Some(Language::English);

        voice.speak("こんにちは", None, false).await;

        let requests = synth.0.lock().unwrap();
        assert_eq!(requests[0].language, Language::English);
        assert_eq!(requests[0].speaker, "default");
        assert!((requests[0].speed - 0.9).abs() < f32::EPSILON);
    }
}
