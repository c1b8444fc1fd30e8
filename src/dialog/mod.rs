/// Configuration dialog state machine
///
/// Each session carries one `DialogState`. The `/set*` commands move it
/// into an `Awaiting*` state; every later free-text message is fed through
/// `handle_reply`, which validates the input, commits to the session
/// configuration on success and reports whether the monitor has to be
/// restarted for the change to take effect. Bad input never produces an
/// error: the dialog stays where it is and the reply tells the user how
/// to retry.

use crate::core::constants::PAIR_ADDRESS_LEN;
use crate::core::session::SessionConfig;

/// Where a session's configuration dialog currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DialogState {
    /// No dialog in progress; free text is ignored.
    #[default]
    Idle,
    /// `/setpair` issued, waiting for the pair address.
    AwaitingPairAddress,
    /// `/setrange` issued, waiting for "lower - upper".
    AwaitingPriceRange,
    /// `/setinterval` issued, waiting for the interval in seconds.
    AwaitingCheckInterval,
    /// `/setchain` issued, waiting for the chain identifier.
    AwaitingChainId,
}

impl DialogState {
    /// True while the dialog expects a free-text reply.
    pub fn is_awaiting(&self) -> bool {
        !matches!(self, Self::Idle)
    }

    /// Question to ask the user when entering this state.
    pub fn prompt(&self) -> Option<&'static str> {
        match self {
            Self::Idle => None,
            Self::AwaitingPairAddress => {
                Some("Please send me the new DexScreener <b>pair address</b>:")
            }
            Self::AwaitingPriceRange => Some(
                "Please send me the <b>price range</b> in lower - upper format \
                 (e.g. 1.0000 - 1.0005).\n\
                 Send X - none or X - 0 if you only want a lower limit.",
            ),
            Self::AwaitingCheckInterval => {
                Some("Please send me the new <b>check interval</b> in seconds (e.g. 60, 120):")
            }
            Self::AwaitingChainId => {
                Some("Please send me the new <b>chain ID</b> (e.g. ethereum, avalanche):")
            }
        }
    }
}

/// Result of feeding one reply into an awaiting dialog.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// State the dialog moves to.
    pub next: DialogState,
    /// Text to send back to the user.
    pub reply: String,
    /// Whether a value was written into the session configuration.
    pub committed: bool,
    /// Whether the committed change requires re-registering the monitor.
    pub restart_monitor: bool,
}

impl Transition {
    fn committed(reply: String, restart_monitor: bool) -> Self {
        Self {
            next: DialogState::Idle,
            reply,
            committed: true,
            restart_monitor,
        }
    }

    fn rejected(state: DialogState, reply: String) -> Self {
        Self {
            next: state,
            reply,
            committed: false,
            restart_monitor: false,
        }
    }
}

/// True when the input is the universal cancel, valid in any awaiting state.
pub fn is_cancel(input: &str) -> bool {
    let trimmed = input.trim();
    trimmed.eq_ignore_ascii_case("/cancel") || trimmed.eq_ignore_ascii_case("cancel")
}

/// Advances the dialog with one user reply, committing into `cfg` when the
/// input validates.
pub fn handle_reply(state: DialogState, input: &str, cfg: &mut SessionConfig) -> Transition {
    let input = input.trim();
    match state {
        DialogState::Idle => Transition::rejected(state, String::new()),
        DialogState::AwaitingPairAddress => apply_pair_address(input, cfg),
        DialogState::AwaitingPriceRange => apply_price_range(input, cfg),
        DialogState::AwaitingCheckInterval => apply_check_interval(input, cfg),
        DialogState::AwaitingChainId => apply_chain_id(input, cfg),
    }
}

fn apply_pair_address(input: &str, cfg: &mut SessionConfig) -> Transition {
    if input.len() == PAIR_ADDRESS_LEN && input.starts_with("0x") {
        cfg.pair_address = input.to_string();
        Transition::committed(
            format!(
                "✅ Pair address updated to: {}. Restarting monitor to apply.",
                cfg.pair_address
            ),
            true,
        )
    } else {
        Transition::rejected(
            DialogState::AwaitingPairAddress,
            "❌ Invalid pair address format. Please send a valid 0x... address \
             (42 characters long).\nOr send /cancel to abort."
                .to_string(),
        )
    }
}

fn apply_price_range(input: &str, cfg: &mut SessionConfig) -> Transition {
    let (lower, upper) = match parse_price_range(input) {
        Ok(parsed) => parsed,
        Err(reply) => return Transition::rejected(DialogState::AwaitingPriceRange, reply),
    };

    cfg.lower_threshold = lower;
    cfg.upper_threshold = upper;

    let mut reply = format!("✅ Price thresholds updated!\nLower: ${:.6}\n", lower);
    match upper {
        Some(upper) => reply.push_str(&format!("Upper: ${:.6}\n", upper)),
        None => reply.push_str("Upper: Disabled (monitoring for drop below lower limit only)\n"),
    }
    reply.push_str("The monitor will use these new thresholds on its next check.");

    // Thresholds are read live on every tick, so no restart is needed.
    Transition::committed(reply, false)
}

fn apply_check_interval(input: &str, cfg: &mut SessionConfig) -> Transition {
    match input.parse::<u64>() {
        Ok(interval) if interval > 0 => {
            cfg.check_interval_secs = interval;
            Transition::committed(
                format!(
                    "✅ Check interval updated to: {} seconds. \
                     Restarting monitor to apply immediately.",
                    interval
                ),
                true,
            )
        }
        _ => Transition::rejected(
            DialogState::AwaitingCheckInterval,
            "❌ Invalid interval. Please send a positive integer (e.g. 60).\n\
             Or send /cancel to abort."
                .to_string(),
        ),
    }
}

fn apply_chain_id(input: &str, cfg: &mut SessionConfig) -> Transition {
    let chain = input.to_lowercase();
    if chain.is_empty() {
        return Transition::rejected(
            DialogState::AwaitingChainId,
            "❌ Chain ID cannot be empty. Please send a chain name \
             (e.g. ethereum, avalanche).\nOr send /cancel to abort."
                .to_string(),
        );
    }
    cfg.chain_id = chain;
    Transition::committed(
        format!(
            "✅ Chain ID updated to: {}. Restarting monitor to apply.",
            cfg.chain_id
        ),
        true,
    )
}

/// Parses "lower - upper" into thresholds. An upper of "0" or "none"
/// (any case) disables the upper bound. The error value is the reply to
/// send back to the user.
fn parse_price_range(input: &str) -> Result<(f64, Option<f64>), String> {
    let parts: Vec<&str> = input.split('-').map(str::trim).collect();
    if parts.len() != 2 {
        return Err(
            "❌ Invalid format. Please send the range as lower - upper \
             (e.g. 1.0000 - 1.0005).\nOr send /cancel to abort."
                .to_string(),
        );
    }

    let lower = parts[0]
        .parse::<f64>()
        .ok()
        .filter(|value| *value > 0.0)
        .ok_or_else(invalid_price_reply)?;

    let upper = match parts[1].to_lowercase().as_str() {
        "0" | "none" => None,
        raw => {
            let value = raw
                .parse::<f64>()
                .ok()
                .filter(|value| *value > 0.0)
                .ok_or_else(invalid_price_reply)?;
            if value < lower {
                return Err(format!(
                    "❌ Upper threshold (${:.6}) cannot be less than the lower \
                     threshold (${:.6}).\nPlease send a valid range.\n\
                     Or send /cancel to abort.",
                    value, lower
                ));
            }
            Some(value)
        }
    };

    Ok((lower, upper))
}

fn invalid_price_reply() -> String {
    "❌ Invalid price value. Please ensure both values are positive numbers.\n\
     Example: 1.0000 - 1.0005 or 1.0000 - none.\n\
     Or send /cancel to abort."
        .to_string()
}
