//! CLI command definitions.
//!
//! Each subcommand wires the dialogue engine to one transport.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use pocket_services::config::{DEFAULT_EXCHANGE_URL, DEFAULT_IMAGE_URL, DEFAULT_WEATHER_URL};
use pocket_services::ServicesConfig;

pub mod console;
pub mod telegram;

/// Pocket - a chat assistant for weather, currency, pictures and polls
#[derive(Parser)]
#[command(name = "pocket")]
#[command(version, about = "Pocket - a chat assistant for weather, currency, pictures and polls")]
#[command(long_about = r#"
Pocket answers chat messages with four services: current weather, currency
conversion, random animal pictures and group polls. Multi-step requests are
tracked per user and chat; state is kept in memory and lost on restart.

TRANSPORTS:
  telegram  → Long-poll the Telegram Bot API
  console   → Talk to the assistant on stdin/stdout

ENVIRONMENT (also read from .env):
  BOT_TOKEN, WEATHER_API_KEY, EXCHANGE_API_KEY, ANIMALS_API_KEY

EXIT CODES:
  0 - Success
  1 - General error
  2 - Missing or invalid configuration
  3 - Transport error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true, env = "POCKET_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the assistant as a Telegram bot
    Telegram(telegram::TelegramArgs),

    /// Chat with the assistant in the terminal
    Console(console::ConsoleArgs),
}

/// API keys and endpoints of the remote services.
#[derive(Args, Debug, Clone)]
pub struct ServiceArgs {
    /// OpenWeatherMap API key
    #[arg(long, env = "WEATHER_API_KEY", hide_env_values = true)]
    pub weather_api_key: Option<String>,

    /// apilayer exchange rates API key
    #[arg(long, env = "EXCHANGE_API_KEY", hide_env_values = true)]
    pub exchange_api_key: Option<String>,

    /// Unsplash access key used for animal pictures
    #[arg(long, env = "ANIMALS_API_KEY", hide_env_values = true)]
    pub animals_api_key: Option<String>,

    #[arg(long, env = "POCKET_WEATHER_URL", default_value = DEFAULT_WEATHER_URL)]
    pub weather_url: String,

    #[arg(long, env = "POCKET_EXCHANGE_URL", default_value = DEFAULT_EXCHANGE_URL)]
    pub exchange_url: String,

    #[arg(long, env = "POCKET_IMAGE_URL", default_value = DEFAULT_IMAGE_URL)]
    pub image_url: String,

    /// Timeout for each service request, in seconds
    #[arg(long, env = "POCKET_HTTP_TIMEOUT", default_value_t = 30)]
    pub http_timeout: u64,
}

impl ServiceArgs {
    /// Every key must be set; blank values are caught by validation.
    pub fn to_config(&self) -> Result<ServicesConfig> {
        let weather = required(&self.weather_api_key, "WEATHER_API_KEY")?;
        let exchange = required(&self.exchange_api_key, "EXCHANGE_API_KEY")?;
        let animals = required(&self.animals_api_key, "ANIMALS_API_KEY")?;

        let config = ServicesConfig::new(weather, exchange, animals)
            .weather_url(&self.weather_url)
            .exchange_url(&self.exchange_url)
            .image_url(&self.image_url)
            .timeout_secs(self.http_timeout);
        config.validate()?;
        Ok(config)
    }
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("Service not configured: {} is missing", name))
}
