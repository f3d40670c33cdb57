mod bot;
mod cache;
mod config;
mod deal;
mod llm;
mod platform;
mod scheduler;
mod stores;
mod summarizer;
#[cfg(test)]
mod test_support;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bot::DealBot;
use crate::cache::DealCache;
use crate::config::Config;
use crate::platform::discord::DiscordWebhook;
use crate::scheduler::CycleScheduler;
use crate::stores::epic::EpicSource;
use crate::stores::steam::SteamSource;
use crate::stores::DealSource;
use crate::summarizer::SummaryService;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,dealbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Optional TOML file; environment variables override it
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    if let Some(path) = &config_path {
        info!("Loading configuration from: {}", path.display());
    }
    let config = Config::load(config_path.as_deref()).context("Failed to load configuration")?;

    info!("Configuration loaded successfully");
    info!("  Check interval: {}h", config.schedule.check_interval_hours);
    info!("  Cache reset interval: {}h", config.cache.reset_interval_hours);

    let announcer = DiscordWebhook::new(config.discord.webhook_url.clone())?;
    if !announcer.is_configured() {
        warn!("DISCORD_WEBHOOK_URL not set; deals will be logged but not posted");
    }

    let client = stores::http_client()?;
    let sources: Vec<Box<dyn DealSource>> = vec![
        Box::new(SteamSource::new(client.clone())),
        Box::new(EpicSource::new(client)),
    ];

    let summarizer = SummaryService::from_config(&config.summarizer)?;
    let summarizer_name = summarizer.name().to_string();

    let mut bot = DealBot::new(
        sources,
        summarizer,
        Box::new(announcer),
        DealCache::load(&config.cache.path),
    )
    .with_reset_interval(config.cache_reset_interval());

    info!("  Cache file: {}", bot.cache().path().display());
    info!("  Summarizer: {}", summarizer_name);

    if config.cache.reset_on_startup {
        bot.reset_cache();
    }

    info!(
        "Starting deal bot - interval {} hours",
        config.schedule.check_interval_hours
    );
    let bot = Arc::new(Mutex::new(bot));

    // First pass runs right away; the scheduler takes over afterwards
    bot.lock().await.run_cycle().await;

    let scheduler = CycleScheduler::start(bot.clone(), config.check_interval()).await?;
    info!("Next check in {:?}", scheduler.period());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown requested");

    scheduler.stop().await?;
    // wait for a cycle that is still running
    drop(bot.lock().await);
    info!("Deal bot stopped");

    Ok(())
}
