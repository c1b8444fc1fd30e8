/// Application configuration
///
/// Loaded once at startup from a TOML file; every field has a built-in
/// default so a missing file only requires the bot token from the
/// environment. `TELEGRAM_BOT_TOKEN` always wins over the file so the
/// secret can stay out of it.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::core::constants::{
    DEFAULT_ALERT_COOLDOWN_SECS, DEFAULT_CHAIN_ID, DEFAULT_CHECK_INTERVAL_SECS,
    DEFAULT_LOWER_THRESHOLD, DEFAULT_PAIR_ADDRESS, DEFAULT_UPPER_THRESHOLD,
};
use crate::core::session::SessionConfig;

const BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

/// Why startup configuration could not be produced.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("telegram bot token is not configured (set [telegram].bot_token or {BOT_TOKEN_ENV})")]
    MissingToken,

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub monitor: MonitorDefaults,
    pub http: HttpConfig,
}

/// Telegram credentials and polling behavior.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot API token; usually supplied via the environment instead.
    pub bot_token: String,
    /// Long-poll hold time for getUpdates, in seconds.
    pub poll_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            poll_timeout_secs: 30,
        }
    }
}

/// Monitoring settings new sessions start from.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorDefaults {
    pub chain_id: String,
    pub pair_address: String,
    pub lower_threshold: f64,
    /// Set to 0 to disable the upper bound, matching the /setrange dialog.
    pub upper_threshold: f64,
    pub check_interval_secs: u64,
    pub alert_cooldown_secs: u64,
}

impl Default for MonitorDefaults {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID.to_string(),
            pair_address: DEFAULT_PAIR_ADDRESS.to_string(),
            lower_threshold: DEFAULT_LOWER_THRESHOLD,
            upper_threshold: DEFAULT_UPPER_THRESHOLD,
            check_interval_secs: DEFAULT_CHECK_INTERVAL_SECS,
            alert_cooldown_secs: DEFAULT_ALERT_COOLDOWN_SECS,
        }
    }
}

/// Outbound HTTP behavior.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request deadline for quote fetches, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 15,
        }
    }
}

impl Config {
    /// Loads the configuration from `path`, falling back to built-in
    /// defaults when the file does not exist, then applies the
    /// environment override for the bot token and validates the result.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let mut config = if Path::new(path).exists() {
            let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_string(),
                source,
            })?;
            toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_string(),
                source,
            })?
        } else {
            info!(path = %path, "Config file not found, using built-in defaults");
            Self::default()
        };

        if let Ok(token) = std::env::var(BOT_TOKEN_ENV) {
            if !token.is_empty() {
                config.telegram.bot_token = token;
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram.bot_token.is_empty() {
            return Err(ConfigError::MissingToken);
        }
        if self.monitor.lower_threshold <= 0.0 {
            return Err(ConfigError::Invalid(
                "monitor.lower_threshold must be positive".to_string(),
            ));
        }
        if self.monitor.upper_threshold > 0.0
            && self.monitor.upper_threshold < self.monitor.lower_threshold
        {
            return Err(ConfigError::Invalid(
                "monitor.upper_threshold cannot be less than lower_threshold".to_string(),
            ));
        }
        if self.monitor.check_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "monitor.check_interval_secs must be positive".to_string(),
            ));
        }
        if self.monitor.alert_cooldown_secs == 0 {
            return Err(ConfigError::Invalid(
                "monitor.alert_cooldown_secs must be positive".to_string(),
            ));
        }
        if self.http.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "http.request_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Session settings every new chat starts from.
    pub fn session_defaults(&self) -> SessionConfig {
        SessionConfig {
            chain_id: self.monitor.chain_id.to_lowercase(),
            pair_address: self.monitor.pair_address.clone(),
            lower_threshold: self.monitor.lower_threshold,
            upper_threshold: (self.monitor.upper_threshold > 0.0)
                .then_some(self.monitor.upper_threshold),
            check_interval_secs: self.monitor.check_interval_secs,
            alert_cooldown_secs: self.monitor.alert_cooldown_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_file_values_over_defaults() {
        let file = write_config(
            r#"
            [telegram]
            bot_token = "123:abc"
            poll_timeout_secs = 20

            [monitor]
            chain_id = "Ethereum"
            lower_threshold = 0.98
            upper_threshold = 1.02
            check_interval_secs = 45
            "#,
        );

        let config = Config::load(file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.telegram.poll_timeout_secs, 20);
        assert_eq!(config.monitor.check_interval_secs, 45);
        // Untouched sections keep their defaults.
        assert_eq!(config.http.request_timeout_secs, 15);

        let defaults = config.session_defaults();
        assert_eq!(defaults.chain_id, "ethereum");
        assert_eq!(defaults.lower_threshold, 0.98);
        assert_eq!(defaults.upper_threshold, Some(1.02));
    }

    #[test]
    fn zero_upper_threshold_disables_the_bound() {
        let file = write_config(
            r#"
            [telegram]
            bot_token = "123:abc"

            [monitor]
            lower_threshold = 0.5
            upper_threshold = 0.0
            "#,
        );

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.session_defaults().upper_threshold, None);
    }

    #[test]
    fn rejects_inverted_default_range() {
        let file = write_config(
            r#"
            [telegram]
            bot_token = "123:abc"

            [monitor]
            lower_threshold = 2.0
            upper_threshold = 1.0
            "#,
        );

        let result = Config::load(file.path().to_str().unwrap());
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_token_is_an_error() {
        let file = write_config("[telegram]\nbot_token = \"\"\n");

        // The environment override may be set on a developer machine; this
        // test only makes sense without it.
        if std::env::var(BOT_TOKEN_ENV).is_ok() {
            return;
        }

        let result = Config::load(file.path().to_str().unwrap());
        assert!(matches!(result, Err(ConfigError::MissingToken)));
    }

    #[test]
    fn garbage_file_is_a_parse_error() {
        let file = write_config("this is not toml = [");

        let result = Config::load(file.path().to_str().unwrap());
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }
}
