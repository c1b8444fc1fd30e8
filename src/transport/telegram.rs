/// Telegram Bot API transport
///
/// Two halves: `TelegramNotifier` pushes messages out through sendMessage,
/// and `TelegramTransport` long-polls getUpdates and feeds every incoming
/// text message into the command router. Poll failures back off and retry;
/// the loop never takes the process down.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::TelegramConfig;
use crate::core::types::SessionKey;
use crate::handlers::CommandRouter;
use crate::transport::{Notifier, SendError};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const SEND_TIMEOUT_SECS: u64 = 15;
const POLL_RETRY_SECS: u64 = 5;

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Debug, Deserialize)]
struct UpdatesResponse {
    ok: bool,
    #[serde(default)]
    result: Vec<Update>,
}

#[derive(Debug, Clone, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
struct Message {
    chat: Chat,
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Chat {
    id: i64,
}

/// Sends messages to chats through the Telegram Bot API.
pub struct TelegramNotifier {
    client: Client,
    api_key: String,
}

impl TelegramNotifier {
    /// Builds a notifier for the given bot token.
    pub fn new(api_key: String) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(SEND_TIMEOUT_SECS))
                .build()?,
            api_key,
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, key: SessionKey, text: &str) -> Result<(), SendError> {
        let url = format!("{}/bot{}/sendMessage", TELEGRAM_API_BASE, self.api_key);
        let body = SendMessageRequest {
            chat_id: key.0,
            text,
            parse_mode: "HTML",
        };

        self.client
            .post(&url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        info!(session = %key, "Notification sent to Telegram chat");
        Ok(())
    }
}

/// Long-polling command loop over getUpdates.
pub struct TelegramTransport {
    client: Client,
    api_key: String,
    poll_timeout_secs: u64,
    router: Arc<CommandRouter>,
}

impl TelegramTransport {
    /// Builds the transport. The HTTP client carries no global timeout so
    /// the long poll can hold the connection open; each request sets its
    /// own deadline instead.
    pub fn new(config: &TelegramConfig, router: Arc<CommandRouter>) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().build()?,
            api_key: config.bot_token.clone(),
            poll_timeout_secs: config.poll_timeout_secs,
            router,
        })
    }

    /// Runs the update loop until the task is cancelled.
    pub async fn run(&self) -> anyhow::Result<()> {
        info!(poll_timeout_secs = self.poll_timeout_secs, "📡 Telegram update loop started");
        let mut offset: i64 = 0;

        loop {
            match self.get_updates(offset).await {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        self.handle_update(update).await;
                    }
                }
                Err(error) => {
                    warn!(error = %error, retry_secs = POLL_RETRY_SECS, "getUpdates failed, backing off");
                    tokio::time::sleep(Duration::from_secs(POLL_RETRY_SECS)).await;
                }
            }
        }
    }

    async fn handle_update(&self, update: Update) {
        let Some(message) = update.message else {
            debug!(update_id = update.update_id, "Ignoring non-message update");
            return;
        };
        let Some(text) = message.text else {
            debug!(update_id = update.update_id, "Ignoring message without text");
            return;
        };

        let key = SessionKey(message.chat.id);
        debug!(session = %key, text = %text, "Incoming message");
        self.router.dispatch(key, &text).await;
    }

    async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, reqwest::Error> {
        let url = format!("{}/bot{}/getUpdates", TELEGRAM_API_BASE, self.api_key);

        let response: UpdatesResponse = self
            .client
            .get(&url)
            .query(&[("timeout", self.poll_timeout_secs), ("offset", offset as u64)])
            .timeout(Duration::from_secs(self.poll_timeout_secs + 10))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !response.ok {
            warn!("Telegram answered getUpdates with ok=false");
        }
        Ok(response.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_update_batch() {
        let body: UpdatesResponse = serde_json::from_str(
            r#"{
                "ok": true,
                "result": [
                    {
                        "update_id": 100,
                        "message": {
                            "message_id": 7,
                            "chat": { "id": -100123, "type": "group" },
                            "text": "/status"
                        }
                    },
                    { "update_id": 101, "message": null }
                ]
            }"#,
        )
        .unwrap();

        assert!(body.ok);
        assert_eq!(body.result.len(), 2);

        let first = &body.result[0];
        assert_eq!(first.update_id, 100);
        let message = first.message.as_ref().unwrap();
        assert_eq!(message.chat.id, -100123);
        assert_eq!(message.text.as_deref(), Some("/status"));

        assert!(body.result[1].message.is_none());
    }

    #[test]
    fn send_request_serializes_html_mode() {
        let body = SendMessageRequest {
            chat_id: 42,
            text: "hello",
            parse_mode: "HTML",
        };
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["chat_id"], 42);
        assert_eq!(json["parse_mode"], "HTML");
    }
}
