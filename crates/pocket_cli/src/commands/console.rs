//! Console command - chat with the assistant on stdin/stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Args;
use pocket_core::{
    Assistant, ChatId, InboundMessage, MockServices, Outbound, PollFailure, PollRequest,
    PollService, Router, Services, SessionStore, Transport, TransportError,
};
use pocket_services::HttpServices;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use super::ServiceArgs;

#[derive(Args)]
pub struct ConsoleArgs {
    /// Pretend to be this user
    #[arg(long, default_value_t = 1)]
    pub user: i64,

    /// Simulate a group chat with this id instead of a private chat
    #[arg(long, allow_negative_numbers = true)]
    pub group: Option<i64>,

    /// Answer with canned service results; no API keys needed
    #[arg(long)]
    pub offline: bool,

    #[command(flatten)]
    pub services: ServiceArgs,
}

/// Prints replies to stdout.
struct ConsoleTransport;

#[async_trait]
impl Transport for ConsoleTransport {
    async fn send(&self, _chat: ChatId, message: &Outbound) -> Result<(), TransportError> {
        println!("{}", render(message));
        Ok(())
    }
}

/// Prints polls instead of posting them.
struct ConsolePolls;

#[async_trait]
impl PollService for ConsolePolls {
    async fn send_poll(&self, request: &PollRequest) -> Result<(), PollFailure> {
        if request.options.len() < 2 {
            return Err(PollFailure::TooFewOptions);
        }
        if request.options.len() > 10 {
            return Err(PollFailure::TooManyOptions);
        }
        if request.options.iter().any(|option| option.trim().is_empty()) {
            return Err(PollFailure::EmptyOptionText);
        }
        println!("📊 [{}] {}", request.chat, request.question);
        for option in &request.options {
            println!("   ○ {}", option);
        }
        Ok(())
    }
}

fn render(message: &Outbound) -> String {
    match message {
        Outbound::Text { text, keyboard: None } => format!("< {}", text),
        Outbound::Text {
            text,
            keyboard: Some(keyboard),
        } => {
            let buttons: Vec<String> = keyboard.labels().map(|label| format!("[{}]", label)).collect();
            format!("< {}\n  {}", text, buttons.join(" "))
        }
        Outbound::Image { url } => format!("< 🖼  {}", url),
    }
}

pub async fn execute(args: ConsoleArgs) -> Result<()> {
    let polls = Arc::new(ConsolePolls);
    let services = if args.offline {
        info!("Offline mode, service results are canned");
        let mock = Arc::new(MockServices::new());
        Services::new(mock.clone(), mock.clone(), mock, polls)
    } else {
        HttpServices::from_config(&args.services.to_config()?)?.with_poll(polls)
    };

    let assistant = Assistant::new(
        Router::default(),
        SessionStore::in_memory(),
        services,
        Arc::new(ConsoleTransport),
    );
    info!("Session state is kept in memory and lost on exit");
    println!("Type /start to begin, Ctrl-D to quit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let message = match args.group {
            Some(chat) => InboundMessage::group(args.user, chat, line),
            None => InboundMessage::private(args.user, line),
        };
        assistant.handle(message).await;
    }
    Ok(())
}
