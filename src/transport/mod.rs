/// Notifier port and the Telegram transport behind it
///
/// The monitoring core and the command router only know the [`Notifier`]
/// trait; everything Telegram-specific (sendMessage, getUpdates) lives in
/// [`telegram`]. Delivery failures are logged by the callers and never
/// fed back into monitoring decisions.

pub mod telegram;

pub use telegram::{TelegramNotifier, TelegramTransport};

use async_trait::async_trait;
use thiserror::Error;

use crate::core::types::SessionKey;

/// Why a message could not be delivered. Logged, never retried.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("message delivery failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Outbound message channel back to a session's chat.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers `text` to the chat behind `key`.
    async fn send(&self, key: SessionKey, text: &str) -> Result<(), SendError>;
}
