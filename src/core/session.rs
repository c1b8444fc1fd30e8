/// Per-session state: configuration, alert memory and the session registry
///
/// Each chat gets an independent record guarded by one async lock, so a
/// monitor tick and a configuration commit for the same session can never
/// interleave. Sessions for different chats share nothing mutable.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::core::constants::{
    DEFAULT_ALERT_COOLDOWN_SECS, DEFAULT_CHAIN_ID, DEFAULT_CHECK_INTERVAL_SECS,
    DEFAULT_LOWER_THRESHOLD, DEFAULT_PAIR_ADDRESS, DEFAULT_UPPER_THRESHOLD,
};
use crate::core::types::SessionKey;
use crate::dialog::DialogState;

/// Live monitoring settings for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// DexScreener chain identifier, kept lower-case.
    pub chain_id: String,
    /// 0x-prefixed pair address on that chain.
    pub pair_address: String,
    /// Alert when the price drops below this.
    pub lower_threshold: f64,
    /// Alert when the price rises above this; `None` disables the upper bound.
    pub upper_threshold: Option<f64>,
    /// Seconds between monitor ticks.
    pub check_interval_secs: u64,
    /// Minimum seconds between two alerts of the same kind.
    pub alert_cooldown_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID.to_string(),
            pair_address: DEFAULT_PAIR_ADDRESS.to_string(),
            lower_threshold: DEFAULT_LOWER_THRESHOLD,
            upper_threshold: Some(DEFAULT_UPPER_THRESHOLD),
            check_interval_secs: DEFAULT_CHECK_INTERVAL_SECS,
            alert_cooldown_secs: DEFAULT_ALERT_COOLDOWN_SECS,
        }
    }
}

/// Hysteresis and cooldown memory for one session.
///
/// Both timestamps only ever move forward; they are cleared exclusively by
/// the evaluator when the price returns inside the range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertState {
    /// When the last out-of-range alert was sent.
    pub last_alert_at: Option<DateTime<Utc>>,
    /// When the last fetch-failure notice was sent.
    pub last_fetch_error_at: Option<DateTime<Utc>>,
}

/// Everything mutable that belongs to one session, behind one lock.
#[derive(Debug, Default)]
pub struct SessionData {
    pub config: SessionConfig,
    pub alerts: AlertState,
    pub dialog: DialogState,
}

impl SessionData {
    fn with_config(config: SessionConfig) -> Self {
        Self {
            config,
            alerts: AlertState::default(),
            dialog: DialogState::Idle,
        }
    }
}

/// Handle to a session record; clone freely, lock before touching.
pub type SharedSession = Arc<RwLock<SessionData>>;

/// All known sessions, keyed by chat.
///
/// Entries are created lazily on first contact and live for the process
/// lifetime; nothing is persisted across restarts.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: DashMap<SessionKey, SharedSession>,
    defaults: SessionConfig,
}

impl SessionRegistry {
    /// Creates an empty registry. New sessions start from `defaults`.
    pub fn new(defaults: SessionConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            defaults,
        }
    }

    /// Returns the session for `key`, creating it with the registry
    /// defaults if this chat has never been seen before.
    pub fn get_or_create(&self, key: SessionKey) -> SharedSession {
        if let Some(existing) = self.sessions.get(&key) {
            return Arc::clone(existing.value());
        }
        info!(session = %key, "Creating session with default configuration");
        // entry() keeps concurrent first contacts from minting two records.
        let entry = self.sessions.entry(key).or_insert_with(|| {
            Arc::new(RwLock::new(SessionData::with_config(self.defaults.clone())))
        });
        Arc::clone(entry.value())
    }

    /// Returns the session for `key` if one exists.
    pub fn get(&self, key: SessionKey) -> Option<SharedSession> {
        let session = self.sessions.get(&key).map(|entry| Arc::clone(entry.value()));
        if session.is_none() {
            debug!(session = %key, "No session recorded for key");
        }
        session
    }

    /// Number of sessions currently tracked.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether any session has been created yet.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_reuses_existing_entry() {
        let registry = SessionRegistry::new(SessionConfig::default());
        let key = SessionKey(42);

        let first = registry.get_or_create(key);
        let second = registry.get_or_create(key);

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn new_sessions_start_from_registry_defaults() {
        let defaults = SessionConfig {
            chain_id: "ethereum".to_string(),
            lower_threshold: 0.5,
            upper_threshold: None,
            ..SessionConfig::default()
        };
        let registry = SessionRegistry::new(defaults.clone());

        let session = registry.get_or_create(SessionKey(7));
        let data = session.read().await;

        assert_eq!(data.config, defaults);
        assert_eq!(data.alerts, AlertState::default());
        assert_eq!(data.dialog, DialogState::Idle);
    }

    #[test]
    fn get_does_not_create() {
        let registry = SessionRegistry::new(SessionConfig::default());
        assert!(registry.get(SessionKey(1)).is_none());
        assert!(registry.is_empty());
    }
}
