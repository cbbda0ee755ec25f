//! Command implementations for the tandem bot.
//!
//! Handlers take the acting user and their arguments and return the reply
//! text. Lifecycle state lives in the session manager; handlers only check
//! preconditions and format results.

pub mod challenge;
pub mod play;
pub mod run;

use std::sync::Arc;
use std::time::Duration;
use tandem_core::{
    Clock, InviteEvent, InviteTimeout, Session, SessionEvent, SessionManager,
};
use tracing::debug;

use crate::config::BotConfig;
use crate::cooldown::{Cooldowns, Gate};
use crate::error::{CommandError, CommandResult};
use crate::game::{Challenger, ChessMatch};

/// Session manager specialised for matches.
pub type Matches = SessionManager<ChessMatch, Challenger>;

/// Receives notification text produced by lifecycle events.
pub type NotificationSink = Arc<dyn Fn(String) + Send + Sync + 'static>;

/// A parsed user command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Challenge { opponent: String },
    Accept { challenger: String },
    Decline { challenger: String },
    Cancel { opponent: String },
    Move { san: String },
    Resign,
    Status,
}

impl Command {
    /// Parse a command name and its arguments.
    pub fn parse(name: &str, args: &[&str]) -> CommandResult<Self> {
        let first = args.first().map(|arg| arg.to_string());
        match name {
            "challenge" | "invite" => first
                .map(|opponent| Self::Challenge { opponent })
                .ok_or(CommandError::Usage("<user> challenge <opponent>")),
            "accept" => first
                .map(|challenger| Self::Accept { challenger })
                .ok_or(CommandError::Usage("<user> accept <challenger>")),
            "decline" => first
                .map(|challenger| Self::Decline { challenger })
                .ok_or(CommandError::Usage("<user> decline <challenger>")),
            "cancel" => first
                .map(|opponent| Self::Cancel { opponent })
                .ok_or(CommandError::Usage("<user> cancel <opponent>")),
            "move" | "mv" => first
                .map(|san| Self::Move { san })
                .ok_or(CommandError::Usage("<user> move <san>")),
            "resign" => Ok(Self::Resign),
            "status" => Ok(Self::Status),
            other => Err(CommandError::UnknownCommand(other.to_string())),
        }
    }

    /// Canonical command name, shared by its aliases.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Challenge { .. } => "challenge",
            Self::Accept { .. } => "accept",
            Self::Decline { .. } => "decline",
            Self::Cancel { .. } => "cancel",
            Self::Move { .. } => "move",
            Self::Resign => "resign",
            Self::Status => "status",
        }
    }
}

/// Command layer over the match manager.
pub struct Bot {
    matches: Matches,
    clock: Arc<dyn Clock>,
    config: BotConfig,
    cooldowns: Cooldowns,
}

impl Bot {
    pub fn new(matches: Matches, clock: Arc<dyn Clock>, config: BotConfig) -> Self {
        let cooldowns = Cooldowns::new(Duration::from_secs(config.cooldown_secs));
        Self {
            matches,
            clock,
            config,
            cooldowns,
        }
    }

    pub fn matches(&self) -> &Matches {
        &self.matches
    }

    /// Run `command` on behalf of `user` and return the reply.
    ///
    /// A command repeated within the cooldown window is refused, with a
    /// notice the first time and [`CommandError::CooldownSilenced`] after.
    pub fn execute(&self, user: &str, command: Command) -> CommandResult<String> {
        debug!("{} -> {:?}", user, command);
        let now = self.clock.now();
        match self.cooldowns.check(command.name(), user, now) {
            Gate::Open => {}
            Gate::Notify(until) => {
                return Err(CommandError::Cooldown {
                    command: command.name(),
                    secs: until.signed_duration_since(now).num_seconds().max(1),
                });
            }
            Gate::Silent => return Err(CommandError::CooldownSilenced),
        }

        match command {
            Command::Challenge { opponent } => challenge::challenge(self, user, &opponent),
            Command::Accept { challenger } => challenge::accept(self, user, &challenger),
            Command::Decline { challenger } => challenge::decline(self, user, &challenger),
            Command::Cancel { opponent } => challenge::cancel(self, user, &opponent),
            Command::Move { san } => play::make_move(self, user, &san),
            Command::Resign => play::resign(self, user),
            Command::Status => play::status(self, user),
        }
    }

    /// Forward match-end and challenge-expiry notices to `sink`.
    pub fn register_notifications(&self, sink: NotificationSink) {
        let on_end = sink.clone();
        self.matches.on(SessionEvent::SessionTimeout, move |session| {
            on_end(match_ended_message(&session));
        });
        self.matches.on_invite(InviteEvent::InviteTimeout, move |timeout| {
            sink(challenge_expired_message(&timeout));
        });
    }
}

pub fn match_ended_message(session: &Session<ChessMatch>) -> String {
    format!(
        "Match {} ({}) is over after {} move(s).",
        session.key,
        session.participant_ids().join(" vs "),
        session.payload.moves.len()
    )
}

pub fn challenge_expired_message(timeout: &InviteTimeout<Challenger>) -> String {
    format!(
        "The challenge from {} to {} expired.",
        timeout.sender.id, timeout.recipient.id
    )
}
