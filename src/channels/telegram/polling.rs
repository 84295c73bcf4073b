//! Telegram polling mode: getUpdates loop and message conversion

use std::time::Duration;

use tokio::sync::mpsc;

use super::TelegramChannel;
use super::dedup::UpdateDedup;
use super::types::{GetUpdatesRequest, LONG_POLL_SECS, TelegramResponse, Update};
use crate::channels::IncomingMessage;
use crate::{Error, Result};

/// Pause after a failed poll before trying again
const ERROR_BACKOFF: Duration = Duration::from_secs(3);

impl TelegramChannel {
    /// Spawn a background task that long-polls Telegram's getUpdates API
    ///
    /// Received text messages are forwarded into the channel created by
    /// [`TelegramChannel::with_receiver`]. `interval` is the pause between
    /// polls. Any existing webhook is deleted first.
    ///
    /// # Errors
    ///
    /// Returns error if the channel was created without a receiver
    pub fn start_polling(&self, interval: Duration) -> Result<tokio::task::JoinHandle<()>> {
        let tx = self
            .message_tx
            .clone()
            .ok_or_else(|| Error::Channel("polling requires a receiver (use with_receiver)".to_string()))?;
        let channel = self.clone();

        Ok(tokio::spawn(async move {
            channel.polling_loop(tx, interval).await;
        }))
    }

    /// Run the polling loop until the receiver is dropped
    async fn polling_loop(&self, tx: mpsc::Sender<IncomingMessage>, interval: Duration) {
        if let Err(e) = self.delete_webhook().await {
            tracing::warn!(error = %e, "failed to delete Telegram webhook before polling");
        }

        let mut offset: Option<i64> = None;
        let mut dedup = UpdateDedup::default();

        loop {
            match self.get_updates(offset).await {
                Ok(updates) => {
                    for update in &updates {
                        // Advance offset past this update
                        offset = Some(update.update_id + 1);

                        if dedup.is_duplicate(update.update_id) {
                            tracing::debug!(update_id = update.update_id, "duplicate update skipped");
                            continue;
                        }

                        if let Some(msg) = update_to_incoming(update)
                            && tx.send(msg).await.is_err()
                        {
                            tracing::info!("message receiver dropped, stopping Telegram polling");
                            return;
                        }
                    }
                    tokio::time::sleep(interval).await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Telegram getUpdates error");
                    tokio::time::sleep(ERROR_BACKOFF).await;
                }
            }
        }
    }

    /// Fetch pending updates, waiting up to the long-poll timeout
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or Telegram reports a failure
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>> {
        let request = GetUpdatesRequest {
            offset,
            timeout: LONG_POLL_SECS,
            allowed_updates: &["message"],
        };

        let response = self
            .client
            .post(self.method_url("getUpdates"))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("Telegram getUpdates error: {e}")))?;

        let body = response
            .text()
            .await
            .map_err(|e| Error::Transport(format!("Telegram getUpdates error: {e}")))?;
        parse_updates(&body)
    }
}

/// Parse a getUpdates response body
///
/// # Errors
///
/// Returns error if the body is not a successful getUpdates response
pub fn parse_updates(body: &str) -> Result<Vec<Update>> {
    let response: TelegramResponse<Vec<Update>> = serde_json::from_str(body)?;
    if !response.ok {
        return Err(Error::Channel(format!(
            "getUpdates failed: {}",
            response.description.unwrap_or_default()
        )));
    }
    Ok(response.result.unwrap_or_default())
}

/// Convert a polling update into an `IncomingMessage`
///
/// Only text messages from people are kept; bot authors, media and other
/// update kinds yield `None`.
#[must_use]
pub fn update_to_incoming(update: &Update) -> Option<IncomingMessage> {
    let msg = update.message.as_ref()?;
    let text = msg.text.as_ref()?;

    // Skip bot messages
    if msg.from.as_ref().is_some_and(|u| u.is_bot) {
        return None;
    }

    let sender_id = msg
        .from
        .as_ref()
        .map_or_else(|| msg.chat.id.to_string(), |u| u.id.to_string());

    let sender_name = msg
        .from
        .as_ref()
        .map_or_else(|| "Unknown".to_string(), |u| u.first_name.clone());

    Some(IncomingMessage {
        id: msg.message_id.to_string(),
        channel_id: msg.chat.id.to_string(),
        sender_id,
        sender_name,
        content: text.clone(),
    })
}
