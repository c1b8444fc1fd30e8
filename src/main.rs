use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rangewatch::config::Config;
use rangewatch::core::session::SessionRegistry;
use rangewatch::handlers::CommandRouter;
use rangewatch::market::DexScreenerClient;
use rangewatch::monitor::MonitorScheduler;
use rangewatch::transport::{Notifier, TelegramNotifier, TelegramTransport};

fn init_tracing() -> Result<()> {
    // Create logs directory if it doesn't exist
    std::fs::create_dir_all("logs")?;

    // Create file appender for logs
    let file_appender = tracing_appender::rolling::daily("logs", "rangewatch.log");
    let (non_blocking_file, _guard) = tracing_appender::non_blocking(file_appender);

    // Create console layer with formatting
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_level(true)
        .compact();

    // Create file layer with JSON formatting
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .json();

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Leak the guard to prevent the file appender from being dropped
    std::mem::forget(_guard);

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    info!("🔭 Rangewatch Price Alert Bot");
    info!("=============================");

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "rangewatch.toml".to_string());
    let config = Config::load(&config_path).context("failed to load configuration")?;
    info!(
        chain = %config.monitor.chain_id,
        pair = %config.monitor.pair_address,
        interval_secs = config.monitor.check_interval_secs,
        "Configuration loaded"
    );

    let sessions = Arc::new(SessionRegistry::new(config.session_defaults()));
    let provider = Arc::new(
        DexScreenerClient::new(config.http.request_timeout_secs)
            .context("failed to build DexScreener client")?,
    );
    let notifier: Arc<dyn Notifier> = Arc::new(
        TelegramNotifier::new(config.telegram.bot_token.clone())
            .context("failed to build Telegram notifier")?,
    );

    let scheduler = Arc::new(MonitorScheduler::new(
        Arc::clone(&sessions),
        provider,
        Arc::clone(&notifier),
        config.http.request_timeout_secs,
    ));
    let router = Arc::new(CommandRouter::new(
        sessions,
        Arc::clone(&scheduler),
        notifier,
    ));
    let transport = TelegramTransport::new(&config.telegram, router)
        .context("failed to build Telegram transport")?;

    info!("🎯 Rangewatch is ready, waiting for commands");

    tokio::select! {
        result = transport.run() => {
            if let Err(e) = result {
                error!(error = ?e, "Telegram transport terminated unexpectedly");
            }
        }
        _ = signal::ctrl_c() => {
            info!("🛑 Shutdown signal received");
        }
    }

    scheduler.shutdown_all().await;

    info!("👋 Rangewatch shutdown complete");
    Ok(())
}
