//! Raw Telegram Bot API calls

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::retry::{delay_for_attempt, is_recoverable, parse_retry_after};
use super::types::{
    API_BASE, BotUser, ChatId, DeleteMessageRequest, SendMessageRequest, SendPhotoRequest,
    TelegramResponse,
};
use crate::{Error, Result};

impl super::TelegramChannel {
    /// Call a Bot API method, retrying rate limits and server errors
    ///
    /// # Errors
    ///
    /// Returns error if the request fails, the API answers `ok: false`, or the
    /// retries run out
    pub(crate) async fn call<B, T>(&self, method: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{API_BASE}{}/{method}", self.token);
        let mut attempt = 0;

        loop {
            let response = self
                .client
                .post(&url)
                .json(body)
                .send()
                .await
                // Strip the URL so the token never reaches logs
                .map_err(|e| {
                    Error::Channel(format!("Telegram {method} error: {}", e.without_url()))
                })?;

            let status = response.status().as_u16();
            let text = response
                .text()
                .await
                .map_err(|e| {
                    Error::Channel(format!("Telegram {method} error: {}", e.without_url()))
                })?;

            if is_recoverable(status) && attempt < self.retry.max_retries {
                let delay = delay_for_attempt(&self.retry, attempt, parse_retry_after(&text));
                tracing::warn!(
                    method,
                    status,
                    attempt,
                    ?delay,
                    "Telegram API call failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            let parsed: TelegramResponse<T> = serde_json::from_str(&text).map_err(|_| {
                Error::Channel(format!("Telegram {method} error: {status} - {text}"))
            })?;

            if !parsed.ok {
                let description = parsed.description.unwrap_or_default();
                return Err(Error::Channel(format!(
                    "Telegram {method} error: {status} - {description}"
                )));
            }

            return parsed
                .result
                .ok_or_else(|| Error::Channel(format!("Telegram {method} returned no result")));
        }
    }

    /// Send a plain-text message
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails
    pub async fn send_message(
        &self,
        chat_id: &ChatId,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<()> {
        let request = SendMessageRequest {
            chat_id,
            text,
            reply_to_message_id: reply_to,
        };

        let _: serde_json::Value = self.call("sendMessage", &request).await?;
        tracing::debug!(%chat_id, "Telegram message sent");
        Ok(())
    }

    /// Send a photo (by `file_id`) with a caption
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails
    pub async fn send_photo(
        &self,
        chat_id: &ChatId,
        photo: &str,
        caption: &str,
        reply_to: Option<i64>,
    ) -> Result<()> {
        let request = SendPhotoRequest {
            chat_id,
            photo,
            caption,
            reply_to_message_id: reply_to,
        };

        let _: serde_json::Value = self.call("sendPhoto", &request).await?;
        tracing::debug!(%chat_id, "Telegram photo sent");
        Ok(())
    }

    /// Delete a message
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails, e.g. the bot is not an admin
    pub async fn delete_message_by_id(&self, chat_id: &ChatId, message_id: i64) -> Result<()> {
        let request = DeleteMessageRequest { chat_id, message_id };

        let _: bool = self.call("deleteMessage", &request).await?;
        tracing::debug!(%chat_id, message_id, "Telegram message deleted");
        Ok(())
    }

    /// Bot identity, also a cheap check that the token works
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails
    pub async fn get_me(&self) -> Result<BotUser> {
        self.call("getMe", &serde_json::json!({})).await
    }

    /// Delete webhook (switch to polling mode)
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails
    pub async fn delete_webhook(&self) -> Result<()> {
        let _: bool = self.call("deleteWebhook", &serde_json::json!({})).await?;
        tracing::info!("Telegram webhook deleted");
        Ok(())
    }
}
