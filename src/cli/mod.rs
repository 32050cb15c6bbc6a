// src/cli/mod.rs — CLI definition (clap derive)

pub mod check;
pub mod run;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "chatgate",
    about = "Telegram gateway for chat, voice transcription and image generation",
    version
)]
pub struct Cli {
    /// Config file path (defaults to ~/.chatgate/config.toml)
    #[arg(long)]
    pub config: Option<String>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Start the bot (default)
    Run,
    /// Validate the bot token and show the resolved backends
    Check,
}
