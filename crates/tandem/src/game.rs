//! Match state carried by tandem sessions.
//!
//! Moves are recorded as given; move legality is not checked.

use chrono::{DateTime, Utc};
use tandem_core::{Invite, Participant, Player, SessionPayload};

use crate::error::{CommandError, CommandResult};

/// Standard chess starting position.
pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Identity used in challenges: who, and where they issued it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenger {
    pub id: String,
    pub channel_id: String,
}

impl Challenger {
    pub fn new(id: impl Into<String>, channel_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            channel_id: channel_id.into(),
        }
    }
}

impl Participant for Challenger {
    fn id(&self) -> &str {
        &self.id
    }
}

/// A match between two players. The challenger moves first.
#[derive(Debug, Clone)]
pub struct ChessMatch {
    pub channel_id: String,
    pub fen: String,
    pub moves: Vec<String>,
    pub turn_index: usize,
    pub players: Vec<Player>,
    pub move_start_time: DateTime<Utc>,
}

impl ChessMatch {
    /// Build the match an accepted challenge asked for.
    pub fn from_invite(invite: Invite<Challenger>, now: DateTime<Utc>) -> Self {
        Self {
            channel_id: invite.sender.channel_id,
            fen: START_FEN.to_string(),
            moves: Vec::new(),
            turn_index: 0,
            players: vec![Player::new(invite.sender.id), Player::new(invite.recipient.id)],
            move_start_time: now,
        }
    }

    /// The player whose turn it is.
    pub fn player_to_move(&self) -> Option<&Player> {
        if self.players.is_empty() {
            return None;
        }
        self.players.get(self.turn_index % self.players.len())
    }

    /// Record `san` for `player_id` and pass the turn.
    pub fn record_move(
        &mut self,
        player_id: &str,
        san: &str,
        now: DateTime<Utc>,
    ) -> CommandResult<usize> {
        match self.player_to_move() {
            Some(player) if player.id == player_id => {}
            _ => return Err(CommandError::NotYourTurn),
        }

        self.moves.push(san.to_string());
        self.turn_index += 1;
        self.move_start_time = now;
        Ok(self.moves.len())
    }

    /// The other player(s) in the match.
    pub fn opponents_of(&self, player_id: &str) -> Vec<&str> {
        self.players
            .iter()
            .map(|player| player.id.as_str())
            .filter(|id| *id != player_id)
            .collect()
    }
}

impl SessionPayload for ChessMatch {
    type Member = Player;

    fn participants(&self) -> &[Player] {
        &self.players
    }
}
