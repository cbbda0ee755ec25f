//! Participant identities and session payload capability.

use serde::{Deserialize, Serialize};

/// Anything identified by an opaque string id.
///
/// Two participants are the same participant iff their ids are equal.
pub trait Participant {
    fn id(&self) -> &str;
}

impl Participant for String {
    fn id(&self) -> &str {
        self
    }
}

/// Caller-defined session state.
///
/// The manager never looks inside the payload beyond the ordered participant
/// list, which determines the session key. Cloning must produce an
/// independent copy: it is how timeout events are snapshotted.
pub trait SessionPayload: Clone + Send + 'static {
    type Member: Participant;

    /// Participants in caller-defined order.
    fn participants(&self) -> &[Self::Member];

    fn participant_ids(&self) -> Vec<String> {
        self.participants()
            .iter()
            .map(|member| member.id().to_string())
            .collect()
    }
}

/// Minimal participant carrying only its id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
}

impl Player {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl Participant for Player {
    fn id(&self) -> &str {
        &self.id
    }
}
