//! Challenge handshake commands: challenge, accept, decline, cancel.

use tandem_core::{AcceptResult, InviteResult, SessionPayload, SessionResult};

use super::Bot;
use crate::error::{CommandError, CommandResult};
use crate::game::{Challenger, ChessMatch};

pub fn challenge(bot: &Bot, user: &str, opponent: &str) -> CommandResult<String> {
    if user == opponent && !bot.config.allow_self_challenge {
        return Err(CommandError::SelfChallenge);
    }

    let busy = bot.matches.get_users_in_session(&[user, opponent]);
    if !busy.is_empty() {
        return Err(CommandError::AlreadyInMatch(busy));
    }

    let channel = &bot.config.channel;
    let result = bot.matches.send_invite_to(
        Challenger::new(user, channel.as_str()),
        Challenger::new(opponent, channel.as_str()),
        None,
    );

    let now = bot.clock.now();
    Ok(match result {
        InviteResult::Sent(invite) => format!(
            "{} challenged {} in #{}. {}, reply `accept {}` within {}s.",
            user,
            opponent,
            channel,
            opponent,
            user,
            invite.time_left(now)
        ),
        InviteResult::AlreadyInvited(invite) => format!(
            "You already challenged {}; that challenge expires in {}s.",
            opponent,
            invite.time_left(now)
        ),
    })
}

pub fn accept(bot: &Bot, user: &str, challenger: &str) -> CommandResult<String> {
    let now = bot.clock.now();
    let result = bot.matches.accept_invite(
        challenger,
        user,
        |invite| ChessMatch::from_invite(invite, now),
        None,
    )?;

    match result {
        AcceptResult::NoInvite => Err(CommandError::NoChallenge(challenger.to_string())),
        AcceptResult::Accepted(SessionResult::AlreadyInSession { conflicting, .. }) => {
            Err(CommandError::AlreadyInMatch(conflicting))
        }
        AcceptResult::Accepted(SessionResult::Created { key, payload }) => {
            let minutes = bot
                .matches
                .get_time_left(&key)
                .map(|secs| secs / 60)
                .unwrap_or_default();
            let to_move = payload
                .player_to_move()
                .map(|player| player.id.as_str())
                .unwrap_or(challenger);
            Ok(format!(
                "Match {} started: {}. {} to move. The match ends in {} minute(s).",
                key,
                payload.participant_ids().join(" vs "),
                to_move,
                minutes
            ))
        }
    }
}

pub fn decline(bot: &Bot, user: &str, challenger: &str) -> CommandResult<String> {
    bot.matches
        .remove_invite(challenger, user)
        .map(|_| format!("{} declined the challenge from {}.", user, challenger))
        .ok_or_else(|| CommandError::NoChallenge(challenger.to_string()))
}

pub fn cancel(bot: &Bot, user: &str, opponent: &str) -> CommandResult<String> {
    bot.matches
        .remove_invite(user, opponent)
        .map(|_| format!("{} withdrew the challenge to {}.", user, opponent))
        .ok_or_else(|| CommandError::NoOutgoingChallenge(opponent.to_string()))
}
