//! Manager configuration.
//!
//! Expiry defaults for sessions and invites. Embedded by callers into their
//! own configuration files, so every field has a serde default.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lifecycle manager configuration options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Session lifetime in seconds (default: 1800 = 30 minutes)
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    /// Invite lifetime in seconds (default: 60)
    #[serde(default = "default_invite_ttl")]
    pub invite_ttl_secs: u64,
}

fn default_session_ttl() -> u64 {
    30 * 60
}

fn default_invite_ttl() -> u64 {
    60
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: default_session_ttl(),
            invite_ttl_secs: default_invite_ttl(),
        }
    }
}

impl ManagerConfig {
    /// Set the session lifetime
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl_secs = ttl.as_secs();
        self
    }

    /// Set the invite lifetime
    pub fn with_invite_ttl(mut self, ttl: Duration) -> Self {
        self.invite_ttl_secs = ttl.as_secs();
        self
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn invite_ttl(&self) -> Duration {
        Duration::from_secs(self.invite_ttl_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.session_ttl_secs == 0 {
            return Err(ConfigValidationError::InvalidValue {
                field: "session_ttl_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        if self.invite_ttl_secs == 0 {
            return Err(ConfigValidationError::InvalidValue {
                field: "invite_ttl_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}
