/// Threshold evaluator
///
/// Pure decision logic for one monitor tick: given the latest observation
/// and the session's alert memory, decide whether to alert, stay quiet, or
/// re-arm. Alerts of either kind are rate-limited by the session cooldown,
/// and an out-of-range alert is only re-armed once the price has fully
/// returned inside the range (hysteresis), so the next excursion alerts
/// immediately instead of waiting out a timer.
///
/// Delivery is someone else's job; this module only produces the decision
/// and the message text.

use chrono::{DateTime, Utc};

use crate::core::session::{AlertState, SessionConfig};
use crate::core::types::{Quote, TickOutcome};
use crate::market::FetchError;

/// Evaluates one observation against the session's thresholds, updating
/// the alert memory in place.
pub fn evaluate(
    observation: Result<&Quote, &FetchError>,
    cfg: &SessionConfig,
    state: &mut AlertState,
    now: DateTime<Utc>,
) -> TickOutcome {
    let quote = match observation {
        Ok(quote) => quote,
        Err(_) => {
            if cooldown_expired(state.last_fetch_error_at, cfg.alert_cooldown_secs, now) {
                state.last_fetch_error_at = Some(now);
                return TickOutcome::FetchErrorAlert(fetch_error_text());
            }
            return TickOutcome::Suppressed;
        }
    };

    let in_range = quote.price >= cfg.lower_threshold
        && cfg
            .upper_threshold
            .map_or(true, |upper| quote.price <= upper);

    if !in_range {
        if cooldown_expired(state.last_alert_at, cfg.alert_cooldown_secs, now) {
            state.last_alert_at = Some(now);
            return TickOutcome::PriceAlert(price_alert_text(quote, cfg));
        }
        return TickOutcome::Suppressed;
    }

    // Back in range: clear the memory so the next excursion alerts
    // immediately, and forget any pending fetch-error cooldown.
    if state.last_alert_at.is_some() {
        state.last_alert_at = None;
        state.last_fetch_error_at = None;
    }
    TickOutcome::InRange
}

/// A stamped alert only blocks the next one for `cooldown_secs`; strictly
/// longer gaps re-alert.
fn cooldown_expired(last: Option<DateTime<Utc>>, cooldown_secs: u64, now: DateTime<Utc>) -> bool {
    match last {
        None => true,
        Some(last) => (now - last).num_seconds() > cooldown_secs as i64,
    }
}

fn price_alert_text(quote: &Quote, cfg: &SessionConfig) -> String {
    let range = match cfg.upper_threshold {
        Some(upper) => format!("${:.6} - ${:.6}", cfg.lower_threshold, upper),
        None => format!("below ${:.6}", cfg.lower_threshold),
    };

    format!(
        "🚨 <b>PRICE ALERT!</b> 🚨\n\n\
         The price of {base} got out of range {range}!\n\
         Current price: <b>${price:.6} {quote_symbol}</b>\n\
         Pool: <a href=\"{url}\">{base}/{quote_symbol} on {dex}</a>\n\
         Chain: {chain}",
        base = quote.base_symbol,
        range = range,
        price = quote.price,
        quote_symbol = quote.quote_symbol,
        url = quote.url,
        dex = quote.dex_id,
        chain = capitalize(&quote.chain_id),
    )
}

fn fetch_error_text() -> String {
    "⚠️ <b>Warning:</b> Could not fetch price data from DexScreener. \
     The monitor will retry."
        .to_string()
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn cfg() -> SessionConfig {
        SessionConfig {
            lower_threshold: 1.0002,
            upper_threshold: Some(1.0003),
            alert_cooldown_secs: 300,
            ..SessionConfig::default()
        }
    }

    fn quote(price: f64) -> Quote {
        Quote {
            price,
            base_symbol: "USDC".to_string(),
            quote_symbol: "USDT".to_string(),
            dex_id: "blackhole".to_string(),
            url: "https://dexscreener.com/avalanche/0xpool".to_string(),
            chain_id: "avalanche".to_string(),
            fetched_at: t0(),
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn at(offset_secs: i64) -> DateTime<Utc> {
        t0() + Duration::seconds(offset_secs)
    }

    #[test]
    fn in_range_prices_never_arm_an_alert() {
        let cfg = cfg();
        let mut state = AlertState::default();

        for price in [1.0002, 1.00025, 1.0003] {
            let outcome = evaluate(Ok(&quote(price)), &cfg, &mut state, t0());
            assert_eq!(outcome, TickOutcome::InRange);
            assert_eq!(state.last_alert_at, None);
        }
    }

    #[test]
    fn out_of_range_alerts_and_stamps_when_unarmed() {
        let cfg = cfg();
        let mut state = AlertState::default();

        let outcome = evaluate(Ok(&quote(0.9999)), &cfg, &mut state, t0());

        match outcome {
            TickOutcome::PriceAlert(text) => {
                assert!(text.contains("PRICE ALERT"));
                assert!(text.contains("USDC"));
                assert!(text.contains("Avalanche"));
            }
            other => panic!("expected PriceAlert, got {:?}", other),
        }
        assert_eq!(state.last_alert_at, Some(t0()));
    }

    #[test]
    fn alerts_above_the_upper_threshold_too() {
        let cfg = cfg();
        let mut state = AlertState::default();

        let outcome = evaluate(Ok(&quote(1.001)), &cfg, &mut state, t0());
        assert!(matches!(outcome, TickOutcome::PriceAlert(_)));
    }

    #[test]
    fn one_sided_range_ignores_high_prices() {
        let cfg = SessionConfig {
            upper_threshold: None,
            ..cfg()
        };
        let mut state = AlertState::default();

        assert_eq!(
            evaluate(Ok(&quote(5.0)), &cfg, &mut state, t0()),
            TickOutcome::InRange
        );
        assert!(matches!(
            evaluate(Ok(&quote(0.5)), &cfg, &mut state, t0()),
            TickOutcome::PriceAlert(_)
        ));
    }

    #[test]
    fn cooldown_suppresses_until_strictly_elapsed() {
        let cfg = cfg();
        let mut state = AlertState::default();

        assert!(matches!(
            evaluate(Ok(&quote(0.9999)), &cfg, &mut state, t0()),
            TickOutcome::PriceAlert(_)
        ));

        // Still inside the cooldown window, including the exact boundary.
        for offset in [60, 299, 300] {
            assert_eq!(
                evaluate(Ok(&quote(0.9999)), &cfg, &mut state, at(offset)),
                TickOutcome::Suppressed
            );
            assert_eq!(state.last_alert_at, Some(t0()));
        }

        // One second past the cooldown a fresh alert fires and re-stamps.
        assert!(matches!(
            evaluate(Ok(&quote(0.9999)), &cfg, &mut state, at(301)),
            TickOutcome::PriceAlert(_)
        ));
        assert_eq!(state.last_alert_at, Some(at(301)));
    }

    #[test]
    fn returning_in_range_rearms_immediately() {
        let cfg = cfg();
        let mut state = AlertState::default();

        assert!(matches!(
            evaluate(Ok(&quote(0.9999)), &cfg, &mut state, t0()),
            TickOutcome::PriceAlert(_)
        ));

        // Price recovers: memory is cleared.
        assert_eq!(
            evaluate(Ok(&quote(1.00025)), &cfg, &mut state, at(10)),
            TickOutcome::InRange
        );
        assert_eq!(state.last_alert_at, None);

        // Next excursion alerts straight away, well inside the old cooldown.
        assert!(matches!(
            evaluate(Ok(&quote(0.9999)), &cfg, &mut state, at(20)),
            TickOutcome::PriceAlert(_)
        ));
    }

    #[test]
    fn fetch_errors_are_cooldown_limited() {
        let cfg = cfg();
        let mut state = AlertState::default();
        let error = FetchError::BadPrice("n/a".to_string());

        assert!(matches!(
            evaluate(Err(&error), &cfg, &mut state, t0()),
            TickOutcome::FetchErrorAlert(_)
        ));
        assert_eq!(state.last_fetch_error_at, Some(t0()));

        assert_eq!(
            evaluate(Err(&error), &cfg, &mut state, at(60)),
            TickOutcome::Suppressed
        );

        assert!(matches!(
            evaluate(Err(&error), &cfg, &mut state, at(301)),
            TickOutcome::FetchErrorAlert(_)
        ));
    }

    #[test]
    fn recovery_clears_fetch_error_memory_with_the_alert() {
        let cfg = cfg();
        let mut state = AlertState::default();
        let error = FetchError::BadPrice("n/a".to_string());

        evaluate(Err(&error), &cfg, &mut state, t0());
        evaluate(Ok(&quote(0.9999)), &cfg, &mut state, at(5));
        assert!(state.last_alert_at.is_some());
        assert!(state.last_fetch_error_at.is_some());

        evaluate(Ok(&quote(1.00025)), &cfg, &mut state, at(10));
        assert_eq!(state.last_alert_at, None);
        assert_eq!(state.last_fetch_error_at, None);
    }

    #[test]
    fn scripted_session_matches_expected_sequence() {
        // lower=1.0002 upper=1.0003 cooldown=300:
        // t=0    0.9999   -> alert
        // t=60   0.9998   -> suppressed (cooldown)
        // t=130  1.00025  -> in range, memory cleared
        // t=140  0.9997   -> alert fires again immediately
        let cfg = cfg();
        let mut state = AlertState::default();

        assert!(matches!(
            evaluate(Ok(&quote(0.9999)), &cfg, &mut state, at(0)),
            TickOutcome::PriceAlert(_)
        ));
        assert_eq!(
            evaluate(Ok(&quote(0.9998)), &cfg, &mut state, at(60)),
            TickOutcome::Suppressed
        );
        assert_eq!(
            evaluate(Ok(&quote(1.00025)), &cfg, &mut state, at(130)),
            TickOutcome::InRange
        );
        assert!(matches!(
            evaluate(Ok(&quote(0.9997)), &cfg, &mut state, at(140)),
            TickOutcome::PriceAlert(_)
        ));
    }
}
