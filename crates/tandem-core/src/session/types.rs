use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hashing::SessionKey;
use crate::participant::SessionPayload;

/// A live session as seen by callers.
///
/// Values handed out by the manager are snapshots; changing them does not
/// change the stored session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session<T> {
    pub key: SessionKey,
    pub payload: T,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl<T: SessionPayload> Session<T> {
    pub fn participant_ids(&self) -> Vec<String> {
        self.payload.participant_ids()
    }

    /// Whole seconds until expiry, truncated toward zero, negative once past.
    pub fn time_left(&self, now: DateTime<Utc>) -> i64 {
        self.expires_at.signed_duration_since(now).num_seconds()
    }
}

/// Session lifecycle events.
///
/// Manual deletion and automatic expiry both report `SessionTimeout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionEvent {
    SessionTimeout,
}

/// Outcome of a session creation attempt.
#[derive(Debug, Clone)]
pub enum SessionResult<T> {
    /// The session is live under `key`.
    Created { key: SessionKey, payload: T },
    /// Some participants already belong to a live session. Nothing changed.
    AlreadyInSession { conflicting: Vec<String>, payload: T },
}

impl<T> SessionResult<T> {
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created { .. })
    }

    pub fn key(&self) -> Option<&SessionKey> {
        match self {
            Self::Created { key, .. } => Some(key),
            Self::AlreadyInSession { .. } => None,
        }
    }

    pub fn into_payload(self) -> T {
        match self {
            Self::Created { payload, .. } | Self::AlreadyInSession { payload, .. } => payload,
        }
    }
}

/// Outcome of accepting an invite.
#[derive(Debug, Clone)]
pub enum AcceptResult<T> {
    /// The invite was consumed and a session creation was attempted.
    Accepted(SessionResult<T>),
    /// No such invite is pending (never sent, declined, expired, or already
    /// accepted by a racing caller).
    NoInvite,
}
