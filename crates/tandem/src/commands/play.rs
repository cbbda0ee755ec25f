//! In-match commands: move, resign, status.

use super::Bot;
use crate::error::{CommandError, CommandResult};

pub fn make_move(bot: &Bot, user: &str, san: &str) -> CommandResult<String> {
    let session = bot
        .matches
        .get_session_with_user(user)
        .ok_or(CommandError::NotInMatch)?;

    let now = bot.clock.now();
    let (count, next) = bot
        .matches
        .update_session(&session.key, |game| {
            let count = game.record_move(user, san, now)?;
            let next = game
                .player_to_move()
                .map(|player| player.id.clone())
                .unwrap_or_default();
            Ok::<_, CommandError>((count, next))
        })
        .ok_or(CommandError::MatchEnded)??;

    Ok(format!("{} played {} (move {}). {} to move.", user, san, count, next))
}

pub fn resign(bot: &Bot, user: &str) -> CommandResult<String> {
    let session = bot
        .matches
        .get_session_with_user(user)
        .ok_or(CommandError::NotInMatch)?;

    if !bot.matches.delete_session(&session.key) {
        return Err(CommandError::MatchEnded);
    }

    let winners = session.payload.opponents_of(user);
    if winners.is_empty() {
        return Ok(format!("{} resigned. No winner.", user));
    }
    Ok(format!("{} resigned. {} wins.", user, winners.join(", ")))
}

pub fn status(bot: &Bot, user: &str) -> CommandResult<String> {
    let now = bot.clock.now();
    let mut lines = Vec::new();

    if let Some(session) = bot.matches.get_session_with_user(user) {
        let game = &session.payload;
        let to_move = game
            .player_to_move()
            .map(|player| player.id.as_str())
            .unwrap_or("nobody");
        let time_left = bot.matches.get_time_left(&session.key).unwrap_or_default();
        let opponents = game.opponents_of(user);
        let against = if opponents.is_empty() {
            "themselves".to_string()
        } else {
            opponents.join(", ")
        };
        lines.push(format!(
            "In match {} (#{}) against {}: {} move(s) played, {} to move, {}s left.",
            session.key,
            game.channel_id,
            against,
            game.moves.len(),
            to_move,
            time_left.max(0)
        ));
    }

    for invite in bot.matches.invites().invites_for(user) {
        lines.push(format!(
            "Challenge {} -> {} expires in {}s.",
            invite.sender.id,
            invite.recipient.id,
            invite.time_left(now).max(0)
        ));
    }

    if lines.is_empty() {
        lines.push(format!("{} has no match and no pending challenges.", user));
    }
    Ok(lines.join("\n"))
}
