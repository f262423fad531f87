mod cli;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use smala::config::SmalaConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "smala",
    version,
    about = "Chat with a local language model that remembers you"
)]
struct Cli {
    /// Path to a previous conversation file to continue
    #[arg(short = 'f', long)]
    conversation_file: Option<PathBuf>,

    /// Config file to use instead of ~/.smala/config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start an interactive conversation (the default)
    Chat,
    /// Inspect and maintain the memory store
    Memories {
        #[command(subcommand)]
        action: MemoriesAction,
    },
}

#[derive(Subcommand)]
enum MemoriesAction {
    /// List active memories
    List {
        /// Include decayed (inactive) memories
        #[arg(long)]
        all: bool,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show memory statistics
    Stats,
    /// Apply decay now with the configured threshold and window
    Decay,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => SmalaConfig::load_from(path)?,
        None => SmalaConfig::load()?,
    };

    // Log to stderr so stdout stays clean for the conversation.
    let filter = EnvFilter::try_new(config.log_filter()).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => {
            smala::conversation::repl::run(&config, cli.conversation_file.as_deref()).await?;
        }
        Command::Memories { action } => match action {
            MemoriesAction::List { all, json } => cli::list::list(&config, all, json)?,
            MemoriesAction::Stats => cli::stats::stats(&config)?,
            MemoriesAction::Decay => cli::decay::decay(&config)?,
        },
    }

    Ok(())
}
