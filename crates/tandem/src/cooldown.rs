//! Per-command, per-user cooldowns.
//!
//! A user who runs a command may not run it again until the window closes.
//! The first refused attempt inside a window gets a notice; later ones are
//! ignored silently.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tandem_core::time::deadline_after;

struct Cooldown {
    until: DateTime<Utc>,
    notified: bool,
}

/// Decision for one attempt to run a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Run it. The window starts now.
    Open,
    /// Refuse with a notice; the window closes at the given instant.
    Notify(DateTime<Utc>),
    /// Refuse without replying.
    Silent,
}

pub struct Cooldowns {
    window: Duration,
    entries: Mutex<HashMap<(&'static str, String), Cooldown>>,
}

impl Cooldowns {
    /// A zero `window` disables cooldowns.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<(&'static str, String), Cooldown>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check `user` running `command` at `now`, opening a new window when allowed.
    pub fn check(&self, command: &'static str, user: &str, now: DateTime<Utc>) -> Gate {
        if self.window.is_zero() {
            return Gate::Open;
        }

        let mut entries = self.lock();
        entries.retain(|_, cooldown| cooldown.until > now);

        let slot = (command, user.to_string());
        if let Some(cooldown) = entries.get_mut(&slot) {
            if cooldown.notified {
                return Gate::Silent;
            }
            cooldown.notified = true;
            return Gate::Notify(cooldown.until);
        }

        entries.insert(
            slot,
            Cooldown {
                until: deadline_after(now, self.window),
                notified: false,
            },
        );
        Gate::Open
    }

    /// Number of open windows, including ones that closed but were not yet pruned.
    pub fn active(&self) -> usize {
        self.lock().len()
    }
}
