//! Telegram channel adapter
//!
//! Long-polls getUpdates for incoming text and uses the Bot API for sending

mod api;
pub mod dedup;
pub mod polling;
pub mod types;

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::mpsc;

use super::{Channel, IncomingMessage, OutgoingMessage};
use crate::{Error, Result};

pub use dedup::UpdateDedup;
pub use polling::{parse_updates, update_to_incoming};
pub use types::{BotUser, Update};

/// Buffered incoming messages before polling waits on the receiver
const MESSAGE_BUFFER: usize = 100;

/// Telegram channel adapter
#[derive(Clone)]
pub struct TelegramChannel {
    token: String,
    api_base: String,
    client: Client,
    message_tx: Option<mpsc::Sender<IncomingMessage>>,
    connected: bool,
}

impl TelegramChannel {
    /// Create a send-only Telegram channel adapter
    #[must_use]
    pub fn new(token: String) -> Self {
        Self {
            token,
            api_base: types::API_BASE.to_string(),
            client: Client::new(),
            message_tx: None,
            connected: false,
        }
    }

    /// Create with a message receiver for polling mode
    ///
    /// Returns the channel and a receiver for incoming messages
    #[must_use]
    pub fn with_receiver(token: String) -> (Self, mpsc::Receiver<IncomingMessage>) {
        let (tx, rx) = mpsc::channel(MESSAGE_BUFFER);
        let mut channel = Self::new(token);
        channel.message_tx = Some(tx);
        (channel, rx)
    }

    /// Point the adapter at another Bot API host (local Bot API server, tests)
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn connect(&mut self) -> Result<()> {
        let bot = self.get_me().await?;
        self.connected = true;
        tracing::info!(
            bot_id = bot.id,
            username = bot.username.as_deref().unwrap_or("?"),
            "Telegram channel connected"
        );
        Ok(())
    }

    async fn send(&self, message: OutgoingMessage) -> Result<()> {
        let chat_id: i64 = message
            .channel_id
            .parse()
            .map_err(|_| Error::Channel("Invalid chat ID".to_string()))?;

        self.send_message(chat_id, &message.content).await
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
