//! Telegram Bot API calls

use super::TelegramChannel;
use super::types::{BotUser, SendMessageRequest, TelegramResponse};
use crate::{Error, Result};

impl TelegramChannel {
    /// URL for a Bot API method
    pub(super) fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.token)
    }

    /// Send a plain text message
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the request cannot be made and
    /// [`Error::Channel`] if Telegram rejects it
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let request = SendMessageRequest { chat_id, text };

        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("Telegram sendMessage error: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let lower = body.to_lowercase();

            if lower.contains("chat not found") || lower.contains("bot was blocked by the user") {
                return Err(Error::Channel(format!(
                    "Telegram chat {chat_id} not reachable: {body}"
                )));
            }

            return Err(Error::Channel(format!(
                "Telegram sendMessage error: {status} - {body}"
            )));
        }

        tracing::debug!(chat_id, "Telegram message sent");
        Ok(())
    }

    /// Verify the token and fetch the bot account
    ///
    /// # Errors
    ///
    /// Returns error if the token is invalid or Telegram is unreachable
    pub async fn get_me(&self) -> Result<BotUser> {
        let response = self
            .client
            .get(self.method_url("getMe"))
            .send()
            .await
            .map_err(|e| Error::Transport(format!("Telegram getMe error: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Channel("Invalid Telegram bot token".to_string()));
        }

        let body: TelegramResponse<BotUser> = response
            .json()
            .await
            .map_err(|e| Error::Channel(format!("Telegram getMe response: {e}")))?;

        body.result.filter(|_| body.ok).ok_or_else(|| {
            Error::Channel(
                body.description
                    .unwrap_or_else(|| "Telegram getMe returned no bot".to_string()),
            )
        })
    }

    /// Remove any webhook so getUpdates is allowed
    ///
    /// # Errors
    ///
    /// Returns error if the request fails
    pub async fn delete_webhook(&self) -> Result<()> {
        self.client
            .post(self.method_url("deleteWebhook"))
            .send()
            .await
            .map_err(|e| Error::Transport(format!("Telegram deleteWebhook error: {e}")))?;
        Ok(())
    }
}
