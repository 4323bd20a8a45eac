//! Video branding bot
//!
//! Run with: BOT_TOKEN=xxx vidbrand-bot

use std::sync::Arc;

use anyhow::Context;

use vidbrand_bot::service::BrandBot;
use vidbrand_bot::telegram::{TelegramApi, TelegramPoller, TelegramTransport};
use vidbrand_bot::telemetry::init_telemetry;
use vidbrand_core::Config;
use vidbrand_fetch::YtDlpFetcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Arc::new(Config::from_env().context("failed to load configuration")?);
    init_telemetry();

    let token = config
        .bot_token
        .as_deref()
        .context("BOT_TOKEN environment variable is required")?;

    let api = TelegramApi::new(token)?;
    let transport = Arc::new(TelegramTransport::new(api.clone()));
    let fetcher = Arc::new(YtDlpFetcher::new(&config));

    let bot = BrandBot::new(config, transport, fetcher)?;

    tracing::info!("vidbrand bot starting");
    TelegramPoller::new(api).run(bot).await
}
