/// Command router
///
/// Entry point for everything a chat sends us. Slash commands drive the
/// session lifecycle and the configuration dialogs; free text is handed to
/// whatever dialog is currently awaiting input. Failures inside a handler
/// are caught here, logged, and answered with a generic notice so one bad
/// update never takes the transport loop down.

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::core::session::{SessionData, SessionRegistry};
use crate::core::types::SessionKey;
use crate::dialog::{self, DialogState};
use crate::monitor::MonitorScheduler;
use crate::transport::Notifier;

const INTERNAL_ERROR_TEXT: &str = "An internal error occurred. Please try again later.";

/// Routes incoming chat messages to the matching handler.
pub struct CommandRouter {
    sessions: Arc<SessionRegistry>,
    scheduler: Arc<MonitorScheduler>,
    notifier: Arc<dyn Notifier>,
}

impl CommandRouter {
    /// Wires the router to its collaborators.
    pub fn new(
        sessions: Arc<SessionRegistry>,
        scheduler: Arc<MonitorScheduler>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            sessions,
            scheduler,
            notifier,
        }
    }

    /// Handles one incoming message. Never returns an error: handler
    /// failures are logged and answered with a generic notice.
    pub async fn dispatch(&self, key: SessionKey, text: &str) {
        if let Err(error) = self.route(key, text).await {
            error!(session = %key, error = ?error, "Command handling failed");
            self.reply(key, INTERNAL_ERROR_TEXT).await;
        }
    }

    async fn route(&self, key: SessionKey, text: &str) -> Result<()> {
        let trimmed = text.trim();

        if dialog::is_cancel(trimmed) {
            return self.on_cancel(key).await;
        }

        match parse_command(trimmed) {
            Some(command) => match command.as_str() {
                "start" => self.on_start(key).await,
                "stop" => self.on_stop(key).await,
                "status" => self.on_status(key).await,
                "setpair" => self.on_dialog_entry(key, DialogState::AwaitingPairAddress).await,
                "setrange" => self.on_dialog_entry(key, DialogState::AwaitingPriceRange).await,
                "setinterval" => {
                    self.on_dialog_entry(key, DialogState::AwaitingCheckInterval).await
                }
                "setchain" => self.on_dialog_entry(key, DialogState::AwaitingChainId).await,
                other => {
                    debug!(session = %key, command = %other, "Ignoring unknown command");
                    Ok(())
                }
            },
            None => self.on_free_text(key, trimmed).await,
        }
    }

    /// `/start`: ensure the session exists, (re)start its monitor and
    /// describe what the bot can do.
    async fn on_start(&self, key: SessionKey) -> Result<()> {
        self.sessions.get_or_create(key);
        self.scheduler.start(key).await;
        self.reply(key, &welcome_text()).await;
        Ok(())
    }

    /// `/stop`: cancel the monitor, telling the user whether anything was
    /// actually running.
    async fn on_stop(&self, key: SessionKey) -> Result<()> {
        let reply = if self.scheduler.stop(key) {
            "Price monitoring has been stopped."
        } else {
            "No active price monitoring to stop for this chat."
        };
        self.reply(key, reply).await;
        Ok(())
    }

    /// `/status`: current configuration plus whether the monitor runs.
    async fn on_status(&self, key: SessionKey) -> Result<()> {
        let session = self.sessions.get_or_create(key);
        let data = session.read().await;
        let text = status_text(&data, self.scheduler.is_active(key));
        drop(data);
        self.reply(key, &text).await;
        Ok(())
    }

    /// `/set*`: open the matching dialog. A dialog already in progress is
    /// implicitly cancelled; the latest entry point wins.
    async fn on_dialog_entry(&self, key: SessionKey, target: DialogState) -> Result<()> {
        let session = self.sessions.get_or_create(key);
        let mut data = session.write().await;

        if data.dialog.is_awaiting() && data.dialog != target {
            info!(
                session = %key,
                previous = ?data.dialog,
                entering = ?target,
                "Replacing in-progress dialog"
            );
        }
        data.dialog = target;
        drop(data);

        if let Some(prompt) = target.prompt() {
            self.reply(key, prompt).await;
        }
        Ok(())
    }

    /// `/cancel` (or bare "cancel"): abandon any dialog in progress.
    async fn on_cancel(&self, key: SessionKey) -> Result<()> {
        if let Some(session) = self.sessions.get(key) {
            session.write().await.dialog = DialogState::Idle;
        }
        self.reply(key, "Operation cancelled.").await;
        Ok(())
    }

    /// Free text: feed the awaiting dialog, commit on success and restart
    /// the monitor when the changed setting requires it.
    async fn on_free_text(&self, key: SessionKey, text: &str) -> Result<()> {
        let Some(session) = self.sessions.get(key) else {
            debug!(session = %key, "Ignoring text from unknown session");
            return Ok(());
        };

        let mut data = session.write().await;
        if !data.dialog.is_awaiting() {
            debug!(session = %key, "Ignoring free text outside a dialog");
            return Ok(());
        }

        let state = data.dialog;
        let transition = dialog::handle_reply(state, text, &mut data.config);
        data.dialog = transition.next;
        drop(data);

        if transition.committed {
            info!(session = %key, dialog = ?state, "Configuration updated");
        }
        self.reply(key, &transition.reply).await;

        if transition.restart_monitor {
            self.scheduler.start(key).await;
        }
        Ok(())
    }

    /// Best-effort outbound message; delivery failures are logged only.
    async fn reply(&self, key: SessionKey, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Err(error) = self.notifier.send(key, text).await {
            warn!(session = %key, error = %error, "Failed to send reply");
        }
    }
}

/// Extracts the command name from a `/command[@BotName] ...` message.
fn parse_command(text: &str) -> Option<String> {
    let rest = text.strip_prefix('/')?;
    let first = rest.split_whitespace().next()?;
    let name = first.split('@').next().unwrap_or(first);
    if name.is_empty() {
        return None;
    }
    Some(name.to_lowercase())
}

fn welcome_text() -> String {
    "Hello! I'm your Crypto Price Alert Bot. 🚀\n\n\
     I'm now monitoring the price.\n\
     You can configure me using these commands:\n\
     /setpair - Set the DexScreener pair address.\n\
     /setrange - Set the price threshold.\n\
     /setinterval - Set the check interval in seconds.\n\
     /setchain - Set the DexScreener chain ID.\n\
     /status - Get the current monitoring status and settings.\n\
     /stop - Stop the price monitoring."
        .to_string()
}

fn status_text(data: &SessionData, active: bool) -> String {
    let upper = match data.config.upper_threshold {
        Some(upper) => format!("${:.6}", upper),
        None => "Disabled".to_string(),
    };

    format!(
        "📊 Current Monitoring Status:\n\n\
         Chain ID: {chain}\n\
         Pair Address: {pair}\n\
         Lower Price Threshold: ${lower:.6}\n\
         Upper Price Threshold: {upper}\n\
         Check Interval: {interval} seconds\n\
         Alert Cooldown: {cooldown} seconds\n\n\
         Monitoring active: {active}",
        chain = data.config.chain_id,
        pair = data.config.pair_address,
        lower = data.config.lower_threshold,
        upper = upper,
        interval = data.config.check_interval_secs,
        cooldown = data.config.alert_cooldown_secs,
        active = if active { "Yes" } else { "No" },
    )
}
