use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use photon_api::HttpPhotoApi;
use photon_bot_core::{
    AppOptions, BotApp, ContinuationStore, IdentityStore, PostStore, db::ensure_schema,
};
use photon_chain::{ChainGateway, HttpChainRpc};
use sqlx::any::AnyPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod bot;
mod config;
mod keyboards;
mod mapping;
mod port;

use bot::TelegramBot;
use config::BotConfig;

static DATABASE_URL: std::sync::LazyLock<String> = std::sync::LazyLock::new(|| {
    std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgresql://photon@localhost:5432/photon".to_string())
});

#[derive(Parser)]
#[command(name = "telegram")]
#[command(about = "Telegram bot for the Photon photo network")]
struct Cli {
    /// Path to bot config TOML (overrides BOT_CONFIG_PATH; falls back to
    /// environment variables when neither is set)
    #[arg(long)]
    bot_config: Option<String>,

    /// How many posts one feed request renders
    #[arg(long, default_value_t = 5)]
    feed_limit: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = match cli
        .bot_config
        .or_else(|| std::env::var("BOT_CONFIG_PATH").ok())
    {
        Some(path) => BotConfig::from_path(&path)?,
        None => BotConfig::from_env()?,
    };

    sqlx::any::install_default_drivers();
    let pool = AnyPoolOptions::new()
        .max_connections(10)
        .connect(&DATABASE_URL)
        .await?;
    ensure_schema(&pool).await?;

    let api = Arc::new(HttpPhotoApi::new(config.api_url.clone())?);
    let rpc = Arc::new(HttpChainRpc::new(config.node_url.clone())?);
    let chain = Arc::new(ChainGateway::new(rpc));

    let app = BotApp::new(
        IdentityStore::new(pool.clone()),
        PostStore::new(pool.clone()),
        ContinuationStore::new(pool),
        chain,
        api,
        AppOptions {
            post_base_url: config.post_base_url.clone(),
            feed_limit: cli.feed_limit,
        },
    );

    TelegramBot::new(config, app).run().await
}
