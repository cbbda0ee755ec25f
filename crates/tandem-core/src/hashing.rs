//! Identity hashing.
//!
//! Session keys are the 32-bit FNV-1a hash of the ordered participant ids
//! joined with `-`, rendered as a decimal string. Reordering participants
//! yields a different key. Collisions are possible and not defended against.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Separator placed between participant ids before hashing.
pub const KEY_SEPARATOR: &str = "-";

/// Stable key of a live session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u32> for SessionKey {
    fn from(hash: u32) -> Self {
        Self(hash.to_string())
    }
}

impl From<&str> for SessionKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for SessionKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Compute the 32-bit FNV-1a hash of `s`.
///
/// Operates on UTF-16 code units, so ASCII input hashes exactly like the
/// byte-oriented reference algorithm.
pub fn fnv1a_32(s: &str) -> u32 {
    s.encode_utf16().fold(FNV_OFFSET_BASIS, |hash, unit| {
        (hash ^ u32::from(unit)).wrapping_mul(FNV_PRIME)
    })
}

/// Derive the session key for an ordered list of participant ids.
pub fn session_key<I: AsRef<str>>(ids: &[I]) -> Result<SessionKey> {
    if ids.is_empty() {
        return Err(Error::NoParticipants);
    }

    let joined = ids
        .iter()
        .map(|id| id.as_ref())
        .collect::<Vec<&str>>()
        .join(KEY_SEPARATOR);

    Ok(SessionKey::from(fnv1a_32(&joined)))
}
