//! tandem - timed match bot
//!
//! Users challenge each other, accept within the invite window, and play
//! until someone resigns or the session lifetime runs out.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod cli;
mod commands;
mod config;
mod cooldown;
mod error;
mod game;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("tandem=info".parse()?))
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = config::Config::load()?;

    match cli.command {
        Commands::Run {
            script,
            session_ttl,
            invite_ttl,
        } => commands::run::execute(script.as_deref(), session_ttl, invite_ttl, &config).await,
        Commands::Config => {
            println!("# {}", config::Config::config_path().display());
            print!("{}", config.to_toml()?);
            Ok(())
        }
        Commands::Version => {
            println!("tandem {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
