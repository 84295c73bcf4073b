//! Shared test utilities

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use teddy_companion::channels::{Channel, OutgoingMessage};
use teddy_companion::motion::{Actuator, Choreographer, ServoCommand};
use teddy_companion::voice::{
    Player, SynthesisRequest, Synthesizer, Transcoder, VoiceOrchestrator, VoiceSettings,
};
use teddy_companion::{FaceState, Mood, Result};

/// Synthesizer that records requests and returns fixed bytes
#[derive(Default)]
pub struct FakeSynthesizer {
    pub requests: Mutex<Vec<SynthesisRequest>>,
}

impl FakeSynthesizer {
    pub fn requests(&self) -> Vec<SynthesisRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Synthesizer for FakeSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(b"RIFF fake audio".to_vec())
    }
}

/// Transcoder that copies input to output unchanged
pub struct CopyTranscoder;

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

/// Player that records what the face looked like while playing
pub struct RecordingPlayer {
    face: FaceState,
    duration: Duration,
    /// (is_speaking, mood, file bytes) per play
    pub plays: Mutex<Vec<(bool, Mood, Vec<u8>)>>,
    active: AtomicUsize,
    most_active: AtomicUsize,
}

impl RecordingPlayer {
    pub fn new(face: FaceState, duration: Duration) -> Self {
        Self {
            face,
            duration,
            plays: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            most_active: AtomicUsize::new(0),
        }
    }

    pub fn plays(&self) -> Vec<(bool, Mood, Vec<u8>)> {
        self.plays.lock().unwrap().clone()
    }

    /// Highest number of clips that were playing at the same moment
    pub fn most_concurrent(&self) -> usize {
        self.most_active.load(Ordering::SeqCst)
    }
}

impl Player for RecordingPlayer {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn play(&self, wav: &Path) -> Result<()> {
        let bytes = std::fs::read(wav)?;
        self.plays
            .lock()
            .unwrap()
            .push((self.face.is_speaking(), self.face.mood(), bytes));

        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.most_active.fetch_max(now_active, Ordering::SeqCst);
        std::thread::sleep(self.duration);
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Actuator that records every command
#[derive(Default)]
pub struct RecordingActuator {
    pub commands: Mutex<Vec<ServoCommand>>,
}

impl RecordingActuator {
    pub fn commands(&self) -> Vec<ServoCommand> {
        self.commands.lock().unwrap().clone()
    }
}

impl Actuator for RecordingActuator {
    fn set(&self, command: ServoCommand) -> Result<()> {
        self.commands.lock().unwrap().push(command);
        Ok(())
    }
}

/// Mock channel for testing
#[derive(Default)]
pub struct MockChannel {
    connected: bool,
    pub sent: Mutex<Vec<OutgoingMessage>>,
}

impl MockChannel {
    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Channel for MockChannel {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn connect(&mut self) -> Result<()> {
        self.connected = true;
        Ok(())
    }

    async fn send(&self, message: OutgoingMessage) -> Result<()> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Everything a voice test needs to inspect afterwards
pub struct VoiceRig {
    pub voice: VoiceOrchestrator,
    pub face: FaceState,
    pub player: Arc<RecordingPlayer>,
    pub actuator: Arc<RecordingActuator>,
    pub work_dir: tempfile::TempDir,
}

/// Orchestrator with recording fakes around `synthesizer`
pub fn voice_rig(synthesizer: Arc<dyn Synthesizer>) -> VoiceRig {
    voice_rig_with_playback(synthesizer, Duration::from_millis(50))
}

/// Like [`voice_rig`], with each clip taking `playback` to play
pub fn voice_rig_with_playback(synthesizer: Arc<dyn Synthesizer>, playback: Duration) -> VoiceRig {
    let face = FaceState::new();
    let player = Arc::new(RecordingPlayer::new(face.clone(), playback));
    let actuator = Arc::new(RecordingActuator::default());
    let work_dir = tempfile::tempdir().expect("failed to create work dir");

    let settings = VoiceSettings {
        work_dir: work_dir.path().to_path_buf(),
        ..VoiceSettings::default()
    };

    let voice = VoiceOrchestrator::new(
        synthesizer,
        Arc::new(CopyTranscoder),
        player.clone(),
        face.clone(),
        Choreographer::new(actuator.clone()),
        settings,
    );

    VoiceRig {
        voice,
        face,
        player,
        actuator,
        work_dir,
    }
}

/// Poll `condition` until it holds or `timeout` passes
pub async fn wait_for(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
