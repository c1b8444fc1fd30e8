/// DexScreener API client for pair price data

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::core::types::Quote;
use crate::market::{FetchError, QuoteProvider};

const DEXSCREENER_API: &str = "https://api.dexscreener.com/latest/dex/pairs";

// Unknown response fields (schemaVersion, volume, txns, ...) are ignored;
// only what the alert pipeline consumes is modeled here.
#[derive(Debug, Clone, Deserialize)]
struct PairsResponse {
    pair: Option<PairData>,
    pairs: Option<Vec<PairData>>,
}

#[derive(Debug, Clone, Deserialize)]
struct PairData {
    #[serde(rename = "chainId")]
    chain_id: String,
    #[serde(rename = "dexId")]
    dex_id: String,
    url: Option<String>,
    #[serde(rename = "pairAddress")]
    pair_address: String,
    #[serde(rename = "baseToken")]
    base_token: PairToken,
    #[serde(rename = "quoteToken")]
    quote_token: PairToken,
    #[serde(rename = "priceNative")]
    price_native: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct PairToken {
    symbol: String,
}

/// HTTP client for the DexScreener pair endpoint.
pub struct DexScreenerClient {
    client: Client,
    base_url: String,
}

impl DexScreenerClient {
    /// Builds a client whose requests give up after `request_timeout_secs`.
    pub fn new(request_timeout_secs: u64) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(request_timeout_secs))
                .build()?,
            base_url: DEXSCREENER_API.to_string(),
        })
    }

    #[cfg(test)]
    fn with_base_url(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl QuoteProvider for DexScreenerClient {
    async fn fetch(&self, chain_id: &str, pair_address: &str) -> Result<Quote, FetchError> {
        let url = format!("{}/{}/{}", self.base_url, chain_id, pair_address);
        debug!(%url, "Fetching pair quote from DexScreener");

        let response = self.client.get(&url).send().await?.error_for_status()?;
        let body: PairsResponse = response.json().await?;

        let pair = body
            .pair
            .or_else(|| body.pairs.and_then(|pairs| pairs.into_iter().next()))
            .ok_or_else(|| FetchError::PairNotFound {
                chain: chain_id.to_string(),
                pair: pair_address.to_string(),
            })?;

        let raw_price = pair
            .price_native
            .ok_or_else(|| FetchError::BadPrice("missing priceNative".to_string()))?;
        let price = raw_price
            .parse::<f64>()
            .map_err(|_| FetchError::BadPrice(raw_price))?;

        info!(
            base = %pair.base_token.symbol,
            quote = %pair.quote_token.symbol,
            chain = %pair.chain_id,
            price,
            "Fetched pair quote"
        );

        Ok(Quote {
            price,
            base_symbol: pair.base_token.symbol,
            quote_symbol: pair.quote_token.symbol,
            dex_id: pair.dex_id,
            url: pair.url.unwrap_or_else(|| {
                format!(
                    "https://dexscreener.com/{}/{}",
                    pair.chain_id, pair.pair_address
                )
            }),
            chain_id: pair.chain_id,
            fetched_at: Utc::now(),
        })
    }
}
