mod backend_client;
mod cli;
mod config;
mod error;

use std::io;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use eyre::Result;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::cli::chat::ChatContext;
use crate::config::Config;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    chat: ChatArgs,
}

#[derive(clap::Args, Default)]
struct ChatArgs {
    /// Input to send to the chat
    #[arg(short, long)]
    input: Option<String>,

    /// PDF to upload before the first turn
    #[arg(short, long)]
    document: Option<String>,

    /// Backend address (overrides CHAT_BACKEND_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a chat session
    Chat {
        #[command(flatten)]
        args: ChatArgs,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load environment variables from .env file
    dotenv().ok();

    let cli = Cli::parse();

    let args = match cli.command {
        Some(Commands::Chat { args }) => args,
        None => cli.chat,
    };

    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    let mut config = Config::from_env()?;
    if let Some(base_url) = &args.base_url {
        config = config.with_base_url(base_url)?;
    }

    info!("Starting Context Chat CLI against {}", config.base_url);

    let interactive = args.input.is_none();
    let mut chat_context = ChatContext::new(
        Box::new(io::stdout()),
        &config,
        args.input,
        args.document,
        interactive,
    );
    chat_context.run().await
}
