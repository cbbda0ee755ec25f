//! CLI argument definitions using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Tandem bot
///
/// Challenge other users to timed matches from line commands.
#[derive(Parser, Debug)]
#[command(name = "tandem")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the bot, reading `<user> <command> [args]` lines
    Run {
        /// Read commands from a script file instead of stdin
        #[arg(long, short)]
        script: Option<PathBuf>,

        /// Override the session lifetime in seconds
        #[arg(long)]
        session_ttl: Option<u64>,

        /// Override the invite lifetime in seconds
        #[arg(long)]
        invite_ttl: Option<u64>,
    },

    /// Print the effective configuration
    Config,

    /// Show version information
    Version,
}
