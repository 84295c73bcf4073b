//! Incoming message handling

use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::channels::IncomingMessage;
use crate::classify::{Classification, classify};
use crate::voice::VoiceOrchestrator;

/// Messages allowed to speak at the same time
pub const MAX_CONCURRENT_SPEECH: usize = 2;

/// What happened to a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Not from the owner, a bot command, or empty
    Ignored,
    /// Spoken with this classification
    Spoken(Classification),
}

/// Speaks messages from the authorized sender
///
/// Clones share one pool of speech slots, so a burst of messages queues
/// up instead of talking over itself.
#[derive(Clone)]
pub struct MessageDispatcher {
    authorized_sender: String,
    voice: VoiceOrchestrator,
    speech_slots: Arc<Semaphore>,
}

impl MessageDispatcher {
    #[must_use]
    pub fn new(authorized_sender: impl Into<String>, voice: VoiceOrchestrator) -> Self {
        Self {
            authorized_sender: authorized_sender.into(),
            voice,
            speech_slots: Arc::new(Semaphore::new(MAX_CONCURRENT_SPEECH)),
        }
    }

    /// Whether `message` should be spoken
    #[must_use]
    pub fn accepts(&self, message: &IncomingMessage) -> bool {
        if message.sender_id != self.authorized_sender {
            tracing::debug!(sender = %message.sender_id, "message from unknown sender dropped");
            return false;
        }

        let text = message.content.trim();
        !text.is_empty() && !text.starts_with('/')
    }

    /// Classify and speak one message
    ///
    /// Waits for a free speech slot first. Returns once playback is over
    /// (or has failed).
    pub async fn handle(&self, message: &IncomingMessage) -> Dispatch {
        if !self.accepts(message) {
            return Dispatch::Ignored;
        }

        let text = message.content.trim();
        let classification = classify(text);
        tracing::info!(
            from = %message.sender_name,
            mood = %classification.mood,
            language = %classification.language,
            head_shake = classification.head_shake,
            "message received"
        );

        // The semaphore is never closed
        let Ok(_slot) = self.speech_slots.acquire().await else {
            return Dispatch::Ignored;
        };
        self.voice
            .speak(text, Some(classification.mood), classification.head_shake)
            .await;

        Dispatch::Spoken(classification)
    }
}
