//! Error types for tandem commands.
//!
//! Every variant is shown to the user as a reply, so messages are phrased
//! for chat rather than for logs.

use thiserror::Error;

/// Reasons a command was refused.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Unknown command `{0}`.")]
    UnknownCommand(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("You cannot challenge yourself.")]
    SelfChallenge,

    #[error("{} already in a match.", .0.join(", "))]
    AlreadyInMatch(Vec<String>),

    #[error("You are not in a match.")]
    NotInMatch,

    #[error("It is not your turn.")]
    NotYourTurn,

    #[error("There is no pending challenge from {0}.")]
    NoChallenge(String),

    #[error("You have no pending challenge to {0}.")]
    NoOutgoingChallenge(String),

    #[error("The match has already ended.")]
    MatchEnded,

    #[error("Please wait, you are on a cooldown for `{command}` for another {secs}s.")]
    Cooldown { command: &'static str, secs: i64 },

    #[error("Still on cooldown.")]
    CooldownSilenced,

    #[error("Internal error: {0}")]
    Core(#[from] tandem_core::Error),
}

/// Result type alias for command handlers.
pub type CommandResult<T> = Result<T, CommandError>;
