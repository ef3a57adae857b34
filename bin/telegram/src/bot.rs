use std::sync::Arc;

use anyhow::Result;
use photon_bot_core::BotApp;
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks;
use tracing::{error, info};

use crate::config::BotConfig;
use crate::mapping::{classify_callback, classify_message};
use crate::port::TelegramPort;

pub struct TelegramBot {
    pub bot: Bot,
    pub config: BotConfig,
    pub app: BotApp,
    pub port: TelegramPort,
}

impl TelegramBot {
    pub fn new(config: BotConfig, app: BotApp) -> Self {
        let bot = Bot::new(config.bot_token.clone());
        let port = TelegramPort::new(bot.clone());
        Self {
            bot,
            config,
            app,
            port,
        }
    }

    /// Run the bot, over a webhook if one is configured and long-polling
    /// otherwise.
    pub async fn run(self) -> Result<()> {
        info!("Starting Telegram bot...");

        let bot = Arc::new(self);

        let handler = dptree::entry()
            .branch(Update::filter_message().endpoint(
                |msg: Message, bot_ref: Arc<TelegramBot>| async move {
                    if let Some((meta, event)) = classify_message(&msg) {
                        if let Err(e) = bot_ref.app.handle_event(&bot_ref.port, &meta, event).await
                        {
                            error!("Error handling message in chat {}: {}", msg.chat.id, e);
                        }
                    }
                    respond(())
                },
            ))
            .branch(Update::filter_callback_query().endpoint(
                |query: CallbackQuery, bot_ref: Arc<TelegramBot>| async move {
                    if let Some((meta, event)) = classify_callback(&query) {
                        if let Err(e) = bot_ref.app.handle_event(&bot_ref.port, &meta, event).await
                        {
                            error!("Error handling callback {}: {}", query.id, e);
                        }
                    }
                    respond(())
                },
            ));

        let mut dispatcher = Dispatcher::builder(bot.bot.clone(), handler)
            .dependencies(dptree::deps![bot.clone()])
            .enable_ctrlc_handler()
            .build();

        match bot.config.webhook.clone() {
            Some(webhook) => {
                let addr: std::net::SocketAddr = webhook
                    .bind
                    .parse()
                    .map_err(|e| anyhow::anyhow!("Invalid webhook bind address: {}", e))?;
                let url: url::Url = webhook
                    .url
                    .parse()
                    .map_err(|e| anyhow::anyhow!("Invalid webhook url: {}", e))?;
                let listener = webhooks::axum(bot.bot.clone(), webhooks::Options::new(addr, url))
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to set up webhook: {}", e))?;
                dispatcher
                    .dispatch_with_listener(
                        listener,
                        LoggingErrorHandler::with_custom_text("Webhook update listener error"),
                    )
                    .await;
            }
            None => dispatcher.dispatch().await,
        }

        info!("Telegram bot stopped");
        Ok(())
    }
}
