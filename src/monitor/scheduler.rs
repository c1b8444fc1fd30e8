/// Monitor scheduler
///
/// Owns one repeating timer task per session. Starting a session replaces
/// any previous task for that key, the first tick runs immediately, and
/// the tick body executes inline in the task loop so ticks for one session
/// never overlap. Stopping signals the task through a shutdown channel
/// selected with priority, so no new tick can begin once `stop` returns
/// while a tick already in flight is left to finish naturally.

use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::core::session::{SessionRegistry, SharedSession};
use crate::core::types::{SessionKey, TickOutcome};
use crate::market::{FetchError, QuoteProvider};
use crate::monitor::evaluator;
use crate::transport::Notifier;

/// One live timer registration.
struct MonitorJob {
    shutdown: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

/// Repeating-timer service multiplexing all active sessions.
pub struct MonitorScheduler {
    jobs: DashMap<SessionKey, MonitorJob>,
    sessions: Arc<SessionRegistry>,
    provider: Arc<dyn QuoteProvider>,
    notifier: Arc<dyn Notifier>,
    fetch_timeout_secs: u64,
}

impl MonitorScheduler {
    /// Creates a scheduler with no active jobs.
    pub fn new(
        sessions: Arc<SessionRegistry>,
        provider: Arc<dyn QuoteProvider>,
        notifier: Arc<dyn Notifier>,
        fetch_timeout_secs: u64,
    ) -> Self {
        Self {
            jobs: DashMap::new(),
            sessions,
            provider,
            notifier,
            fetch_timeout_secs,
        }
    }

    /// Starts (or restarts) monitoring for `key` at the session's current
    /// interval. Any previous job for the key is cancelled first, and the
    /// new job runs its first check immediately.
    pub async fn start(&self, key: SessionKey) {
        if self.cancel_job(key) {
            info!(session = %key, "Existing monitor job cancelled for restart");
        }

        let session = self.sessions.get_or_create(key);
        let interval_secs = session.read().await.config.check_interval_secs.max(1);

        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        let provider = Arc::clone(&self.provider);
        let notifier = Arc::clone(&self.notifier);
        let fetch_timeout_secs = self.fetch_timeout_secs;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        debug!(session = %key, "Monitor job shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        run_tick(
                            key,
                            &session,
                            provider.as_ref(),
                            notifier.as_ref(),
                            fetch_timeout_secs,
                        )
                        .await;
                    }
                }
            }
        });

        self.jobs.insert(
            key,
            MonitorJob {
                shutdown: shutdown_tx,
                handle,
            },
        );
        info!(session = %key, interval_secs, "Price monitor scheduled");
    }

    /// Stops monitoring for `key`. Returns whether a job was actually
    /// cancelled, so callers can tell "stopped" apart from "nothing to stop".
    pub fn stop(&self, key: SessionKey) -> bool {
        let cancelled = self.cancel_job(key);
        if cancelled {
            info!(session = %key, "Price monitor stopped");
        } else {
            debug!(session = %key, "Stop requested but no monitor was running");
        }
        cancelled
    }

    /// Whether a timer is currently registered for `key`.
    pub fn is_active(&self, key: SessionKey) -> bool {
        self.jobs.contains_key(&key)
    }

    /// Number of sessions currently being monitored.
    pub fn active_count(&self) -> usize {
        self.jobs.len()
    }

    /// Cancels every job and waits for the tasks to wind down. Process
    /// shutdown path.
    pub async fn shutdown_all(&self) {
        let keys: Vec<SessionKey> = self.jobs.iter().map(|entry| *entry.key()).collect();
        info!(job_count = keys.len(), "Shutting down all monitor jobs");

        for key in keys {
            if let Some((_, job)) = self.jobs.remove(&key) {
                let _ = job.shutdown.send(());
                if job.handle.await.is_err() {
                    warn!(session = %key, "Monitor task ended abnormally during shutdown");
                }
            }
        }
    }

    fn cancel_job(&self, key: SessionKey) -> bool {
        match self.jobs.remove(&key) {
            Some((_, job)) => {
                let _ = job.shutdown.send(());
                true
            }
            None => false,
        }
    }
}

/// One monitoring check: fetch, evaluate, dispatch, remember.
async fn run_tick(
    key: SessionKey,
    session: &SharedSession,
    provider: &dyn QuoteProvider,
    notifier: &dyn Notifier,
    fetch_timeout_secs: u64,
) {
    let (chain_id, pair_address) = {
        let data = session.read().await;
        (data.config.chain_id.clone(), data.config.pair_address.clone())
    };
    debug!(session = %key, chain = %chain_id, pair = %pair_address, "Running monitor tick");

    let observation = match tokio::time::timeout(
        Duration::from_secs(fetch_timeout_secs),
        provider.fetch(&chain_id, &pair_address),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(fetch_timeout_secs)),
    };

    if let Err(error) = &observation {
        warn!(session = %key, error = %error, "Quote fetch failed");
    }

    // The evaluator reads the live configuration and mutates the alert
    // memory under the same write lock an FSM commit would take.
    let outcome = {
        let mut data = session.write().await;
        let config = data.config.clone();
        evaluator::evaluate(observation.as_ref(), &config, &mut data.alerts, Utc::now())
    };

    match &outcome {
        TickOutcome::PriceAlert(text) | TickOutcome::FetchErrorAlert(text) => {
            if let Err(error) = notifier.send(key, text).await {
                error!(session = %key, error = %error, "Failed to deliver alert");
            }
        }
        TickOutcome::Suppressed => {
            debug!(session = %key, "Alert suppressed by cooldown");
        }
        TickOutcome::InRange => {}
    }
}
