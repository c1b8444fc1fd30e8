/// Core types shared across the monitoring pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one monitored conversation.
///
/// The transport hands us one of these per chat; every piece of mutable
/// state (configuration, alert memory, dialog, monitor job) is keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey(pub i64);

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single price observation for a (chain, pair) at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    /// Price in quote-token units.
    pub price: f64,
    /// Symbol of the base token (e.g. "USDC").
    pub base_symbol: String,
    /// Symbol of the quote token.
    pub quote_symbol: String,
    /// Identifier of the DEX hosting the pool.
    pub dex_id: String,
    /// Link to the pool page.
    pub url: String,
    /// Chain the pool lives on.
    pub chain_id: String,
    /// When the observation was taken.
    pub fetched_at: DateTime<Utc>,
}

/// Decision produced by the threshold evaluator for one monitor tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Price left the configured range; the text is ready to deliver.
    PriceAlert(String),
    /// The quote fetch failed and the failure notice is due.
    FetchErrorAlert(String),
    /// Something is wrong but a recent alert already covered it.
    Suppressed,
    /// Price is inside the range; nothing to say.
    InRange,
}

impl TickOutcome {
    /// Text to deliver for this outcome, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::PriceAlert(text) | Self::FetchErrorAlert(text) => Some(text),
            Self::Suppressed | Self::InRange => None,
        }
    }
}
