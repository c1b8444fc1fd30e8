//! Rangewatch — DEX pair price-range alert bot.
//!
//! Polls DexScreener for each chat's configured (chain, pair) and sends a
//! Telegram alert when the price leaves the configured range. Alerts are
//! cooldown-limited and re-armed with hysteresis, and every chat owns its
//! configuration, dialog state and monitor schedule independently.

pub mod config;
pub mod core;
pub mod dialog;
pub mod handlers;
pub mod market;
pub mod monitor;
pub mod transport;

pub use crate::config::Config;
pub use crate::core::session::{SessionConfig, SessionRegistry};
pub use crate::core::types::SessionKey;
pub use crate::handlers::CommandRouter;
pub use crate::market::{DexScreenerClient, QuoteProvider};
pub use crate::monitor::MonitorScheduler;
pub use crate::transport::{Notifier, TelegramNotifier, TelegramTransport};
