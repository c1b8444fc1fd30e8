/// Quote provider port
///
/// The monitoring core only speaks this trait; the concrete DexScreener
/// adapter lives in [`dexscreener`].

pub mod dexscreener;

pub use dexscreener::DexScreenerClient;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::types::Quote;

/// Why a quote could not be obtained. Never fatal: the monitor keeps its
/// schedule and surfaces the failure as a cooldown-limited notice.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("quote request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("no pair data for {pair} on {chain}")]
    PairNotFound { chain: String, pair: String },

    #[error("provider returned an unparseable price: {0:?}")]
    BadPrice(String),

    #[error("quote request timed out after {0}s")]
    Timeout(u64),
}

/// Source of current price observations for a (chain, pair).
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Fetches the current quote for `pair_address` on `chain_id`.
    async fn fetch(&self, chain_id: &str, pair_address: &str) -> Result<Quote, FetchError>;
}
