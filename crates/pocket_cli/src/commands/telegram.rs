//! Telegram command - run the assistant as a bot.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use pocket_core::{Assistant, Router, SessionStore};
use pocket_services::HttpServices;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::ServiceArgs;
use crate::telegram::{TelegramClient, DEFAULT_API_URL};

/// Inbound messages buffered between the poller and the assistant.
const INBOUND_BUFFER: usize = 256;

#[derive(Args)]
pub struct TelegramArgs {
    /// Bot token issued by BotFather
    #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
    token: String,

    /// Bot API base URL
    #[arg(long, env = "TELEGRAM_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Long-poll timeout for getUpdates, in seconds
    #[arg(long, env = "POCKET_POLL_TIMEOUT", default_value_t = 30)]
    poll_timeout: u64,

    /// Also answer messages sent while the bot was offline
    #[arg(long, env = "POCKET_PROCESS_PENDING")]
    process_pending: bool,

    #[command(flatten)]
    services: ServiceArgs,
}

pub async fn execute(args: TelegramArgs) -> Result<()> {
    let config = args.services.to_config()?;
    let services = HttpServices::from_config(&config)?;

    // The long poll holds the request open, so give it headroom.
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(args.poll_timeout + 10))
        .build()
        .context("Failed to build the Telegram HTTP client")?;
    let bot = TelegramClient::new(http, &args.api_url, &args.token);

    let me = bot
        .get_me()
        .await
        .context("Telegram transport unavailable: getMe failed")?;
    let mut router = Router::default();
    match &me.username {
        Some(username) => {
            info!(bot_id = me.id, %username, "Connected to Telegram");
            router = router.with_bot_username(username.clone());
        }
        None => warn!(bot_id = me.id, "Bot has no username, mentions will not be checked"),
    }

    let bot = Arc::new(bot);
    let assistant = Arc::new(Assistant::new(
        router,
        SessionStore::in_memory(),
        services.with_poll(bot.clone()),
        bot.clone(),
    ));

    let (tx, rx) = mpsc::channel(INBOUND_BUFFER);
    let poller = {
        let bot = Arc::clone(&bot);
        let timeout = args.poll_timeout;
        let skip_pending = !args.process_pending;
        tokio::spawn(async move { bot.poll_updates(tx, timeout, skip_pending).await })
    };
    let server = tokio::spawn(Arc::clone(&assistant).serve(rx));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutting down");

    // Stopping the poller drops the sender, which lets the assistant drain.
    poller.abort();
    server.await.context("Assistant task failed")?;
    Ok(())
}
