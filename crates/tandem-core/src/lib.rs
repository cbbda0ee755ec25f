//! tandem-core - Session and invite lifecycle management
//!
//! Pairs participants into exclusive, time-bounded sessions behind an
//! expiring invite handshake. Everything lives in memory in one process.
//!
//! - **hashing**: Deterministic session keys from ordered participant ids
//! - **events**: Publish/subscribe for lifecycle notifications
//! - **time**: Injectable clock and timer strategies
//! - **invite**: Pending invites with independent expiry
//! - **session**: Sessions, membership index, and the combined facade
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tandem_core::{ManagerConfig, ManualClock, Player, SessionManager, SessionPayload};
//!
//! #[derive(Clone)]
//! struct Game {
//!     players: Vec<Player>,
//! }
//!
//! impl SessionPayload for Game {
//!     type Member = Player;
//!     fn participants(&self) -> &[Player] {
//!         &self.players
//!     }
//! }
//!
//! let clock = ManualClock::default();
//! let manager: SessionManager<Game, Player> =
//!     SessionManager::new(
//!         ManagerConfig::default(),
//!         Arc::new(clock.clone()),
//!         Arc::new(clock.clone()),
//!     )?;
//!
//! let game = Game { players: vec![Player::new("a"), Player::new("b")] };
//! let created = manager.create_session(game, Some(Duration::from_secs(60)))?;
//! assert!(created.is_created());
//!
//! clock.advance(Duration::from_secs(60));
//! assert!(manager.get_users_in_session(&["a", "b"]).is_empty());
//! # Ok::<(), tandem_core::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod hashing;
pub mod invite;
pub mod participant;
pub mod session;
pub mod time;

// Re-export commonly used types
pub use config::{ConfigValidationError, ManagerConfig};
pub use error::{Error, Result};
pub use events::{EventNotifier, ListenerId};
pub use hashing::{SessionKey, session_key};
pub use invite::{Invite, InviteEvent, InviteManager, InviteResult, InviteTimeout};
pub use participant::{Participant, Player, SessionPayload};
pub use session::{AcceptResult, Session, SessionEvent, SessionManager, SessionResult};
pub use time::{Clock, ManualClock, Scheduler, SystemClock, TimerHandle, TokioScheduler};
