use std::sync::Arc;

use analytics::AnalyticsService;
use anyhow::Result;
use bot::{
    config::Config,
    discord::{self, DiscordChat},
    dispatcher::Dispatcher,
    scheduler,
};
use market::MarketClient;
use serenity::all::ClientBuilder;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    info!(version = %config.version, schedule = %config.schedule, "starting");

    let market = Arc::new(MarketClient::from_env()?);
    let analytics = AnalyticsService::from_env(market, config.zone())?;

    let (update_tx, update_rx) = mpsc::unbounded_channel();
    let (wake_tx, wake_rx) = mpsc::channel(1);

    let mut client = ClientBuilder::new(&config.discord_token, discord::intents())
        .framework(discord::framework(update_tx))
        .await?;

    let chat = DiscordChat::new(client.http.clone());
    let shard_manager = client.shard_manager.clone();
    let cancel = CancellationToken::new();

    let scheduler_task = tokio::spawn(scheduler::run(config.schedule, wake_tx, cancel.clone()));

    let dispatcher = Dispatcher::new(chat, analytics, config.admin, config.schedule);
    let dispatcher_task = tokio::spawn(dispatcher.run(update_rx, wake_rx, cancel.clone()));

    tokio::spawn(async move {
        if let Err(why) = client.start().await {
            error!("Client error: {why:?}");
        }
    });

    shutdown_signal().await;

    cancel.cancel();
    shard_manager.shutdown_all().await;
    if let Err(e) = scheduler_task.await {
        error!(error = ?e, "scheduler task failed");
    }
    if let Err(e) = dispatcher_task.await {
        error!(error = ?e, "dispatcher task failed");
    }

    info!("Shutdown complete.");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::{
            select,
            signal::unix::{SignalKind, signal},
        };
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
        select! {
            _ = sigterm.recv() => {},
            _ = sigint.recv()  => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
