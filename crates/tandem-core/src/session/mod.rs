//! Session lifecycle management.
//!
//! A session pairs participants into one time-bounded activity. Every
//! participant belongs to at most one live session, tracked by a membership
//! index that changes in lock-step with the session store.
//!
//! ## Lifecycle
//!
//! ```text
//! create_session
//!   │
//!   ├─► key = fnv1a(ordered participant ids)
//!   │
//!   ├─► index every participant under key
//!   │
//!   └─► arm expiry timer
//!
//! delete_session / timer
//!   │
//!   ├─► drop session record and its index entries together
//!   │
//!   ├─► cancel timer (manual delete)
//!   │
//!   └─► emit SessionTimeout with a snapshot of the session
//! ```

mod manager;
mod types;

pub use manager::SessionManager;
pub use types::*;
