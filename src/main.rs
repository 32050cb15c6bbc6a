// src/main.rs — chatgate entry point

use clap::Parser;

use chatgate::cli::{Cli, Commands};
use chatgate::infra::config::Config;
use chatgate::infra::logger;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging (respects RUST_LOG)
    logger::init_logging(&cli.log_level);

    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Load config (falls back to defaults if no config.toml)
    let config = if let Some(ref path) = cli.config {
        let mut config = Config::load_from(std::path::Path::new(path))?;
        config.apply_env(|key| std::env::var(key).ok());
        config
    } else {
        Config::load()?
    };

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Check => chatgate::cli::check::run_check(&config).await,
        Commands::Run => chatgate::cli::run::run_bot(&config).await,
    }
}
