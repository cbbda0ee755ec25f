//! Error types for tandem-core.

use thiserror::Error;

use crate::config::ConfigValidationError;

/// Result type alias using tandem-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for session and invite operations.
///
/// Expected lifecycle outcomes (already invited, already in a session,
/// missing keys) are reported through result enums and `Option`, not here.
#[derive(Error, Debug)]
pub enum Error {
    #[error("A session needs at least one participant")]
    NoParticipants,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigValidationError),
}
