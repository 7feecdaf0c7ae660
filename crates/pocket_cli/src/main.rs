//! Pocket CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Missing or invalid configuration
//! - 3: Transport error

use std::fs::OpenOptions;
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::Context;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod telegram;

use commands::{Cli, Commands};

/// Process exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const CONFIG_ERROR: u8 = 2;
    pub const TRANSPORT_ERROR: u8 = 3;
}

#[tokio::main]
async fn main() -> ExitCode {
    // Values already in the environment win over .env
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli) {
        eprintln!("❌ Error: {:#}", e);
        return ExitCode::from(ExitCodes::GENERAL_ERROR);
    }
    if let Ok(path) = dotenv {
        debug!(path = %path.display(), "Loaded environment file");
    }

    let result = match cli.command {
        Commands::Telegram(args) => commands::telegram::execute(args).await,
        Commands::Console(args) => commands::console::execute(args).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "Fatal error");
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(categorize_error(&e))
        }
    }
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("pocket={}", level).parse()?)
        .add_directive("warn".parse()?);

    let writer = match &cli.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };
    let ansi = cli.log_file.is_none();

    let (json, plain) = if cli.log_json {
        (Some(fmt::layer().json().with_writer(writer)), None)
    } else {
        (
            None,
            Some(fmt::layer().with_target(false).with_ansi(ansi).with_writer(writer)),
        )
    };

    let log_result = tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(plain)
        .try_init();

    if let Err(e) = log_result {
        // Logging already initialized, keep the existing subscriber
        debug!(error = %e, "Global subscriber already set");
    }
    Ok(())
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    let msg = format!("{:#}", e).to_lowercase();

    if msg.contains("not configured") || msg.contains("invalid base url") {
        ExitCodes::CONFIG_ERROR
    } else if msg.contains("transport") || msg.contains("telegram") {
        ExitCodes::TRANSPORT_ERROR
    } else {
        ExitCodes::GENERAL_ERROR
    }
}
