/// Built-in monitoring defaults
///
/// Applied when a session is created before the user has configured
/// anything, and used as the fallback values for the config file.

/// Default DexScreener chain identifier.
pub const DEFAULT_CHAIN_ID: &str = "avalanche";

/// Default pair address monitored by a fresh session.
pub const DEFAULT_PAIR_ADDRESS: &str = "0x859592A4A469610E573f96Ef87A0e5565F9a94c8";

/// Default lower price threshold.
pub const DEFAULT_LOWER_THRESHOLD: f64 = 1.0002;

/// Default upper price threshold.
pub const DEFAULT_UPPER_THRESHOLD: f64 = 1.0003;

/// Default polling interval in seconds.
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 120;

/// Default minimum spacing between two alerts of the same kind.
pub const DEFAULT_ALERT_COOLDOWN_SECS: u64 = 300;

/// Expected length of a 0x-prefixed pair address.
pub const PAIR_ADDRESS_LEN: usize = 42;
