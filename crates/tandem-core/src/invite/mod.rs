//! Invite handshake.
//!
//! An invite is a pending request from one participant to another to start
//! a session. It expires on its own schedule, independent of any session.
//!
//! ```text
//! NoRelation ──send_invite_to──► Invited ──remove (accept)──► caller creates session
//!                                   │
//!                                   ├──remove (decline)──► NoRelation
//!                                   │
//!                                   └──timer──► InviteTimeout event ──► NoRelation
//! ```

mod manager;

pub use manager::InviteManager;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::participant::Participant;

/// A pending invite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invite<K> {
    pub sender: K,
    pub recipient: K,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl<K: Participant> Invite<K> {
    /// Whether `id` is the sender or the recipient.
    pub fn involves(&self, id: &str) -> bool {
        self.sender.id() == id || self.recipient.id() == id
    }

    /// Whole seconds until expiry, negative once past.
    pub fn time_left(&self, now: DateTime<Utc>) -> i64 {
        self.expires_at.signed_duration_since(now).num_seconds()
    }
}

/// Outcome of sending an invite.
#[derive(Debug, Clone)]
pub enum InviteResult<K> {
    /// A new invite was created.
    Sent(Invite<K>),
    /// An invite for the same ordered pair is still pending; it is returned
    /// untouched and no new timer was started.
    AlreadyInvited(Invite<K>),
}

impl<K> InviteResult<K> {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent(_))
    }

    pub fn invite(&self) -> &Invite<K> {
        match self {
            Self::Sent(invite) | Self::AlreadyInvited(invite) => invite,
        }
    }
}

/// Invite lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InviteEvent {
    /// An invite expired without being accepted or declined.
    InviteTimeout,
}

/// Payload of [`InviteEvent::InviteTimeout`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteTimeout<K> {
    pub sender: K,
    pub recipient: K,
}
