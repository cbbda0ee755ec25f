//! Clock and timer strategies.
//!
//! Managers never read the ambient clock or spawn timers directly. They are
//! handed a [`Clock`] and a [`Scheduler`]:
//!
//! - [`SystemClock`] + [`TokioScheduler`] for production
//! - [`ManualClock`] (implements both) for tests driven by fake time

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::runtime::{Handle, TryCurrentError};
use tracing::trace;

/// A deferred callback handed to a [`Scheduler`].
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Runs a task once after a delay.
pub trait Scheduler: Send + Sync {
    /// Schedule `task` to run after `delay`. The returned handle cancels it.
    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle;
}

/// Cancellation handle for a scheduled task.
///
/// Dropping the handle does not cancel the task; call [`TimerHandle::cancel`].
pub struct TimerHandle {
    cancel: Task,
}

impl TimerHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Box::new(cancel),
        }
    }

    /// Cancel the task if it has not run yet.
    pub fn cancel(self) {
        (self.cancel)();
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle").finish_non_exhaustive()
    }
}

/// `now + delay`, saturating at the latest representable instant.
pub fn deadline_after(now: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(delay)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

// ─────────────────────────────────────────────────────────────────────────────
// Production strategies
// ─────────────────────────────────────────────────────────────────────────────

/// Wall clock backed by `chrono::Utc::now`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Scheduler that spawns a sleeping task on a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Use the runtime the caller is currently running on.
    pub fn current() -> Result<Self, TryCurrentError> {
        Handle::try_current().map(Self::new)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle {
        let join = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
        TimerHandle::new(move || join.abort())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Manual (fake time) strategy
// ─────────────────────────────────────────────────────────────────────────────

struct ManualState {
    now: DateTime<Utc>,
    next_id: u64,
    timers: BTreeMap<(DateTime<Utc>, u64), Task>,
    deadlines: HashMap<u64, DateTime<Utc>>,
}

/// Fake clock that also acts as a scheduler.
///
/// Time only moves when [`ManualClock::advance`] is called. Due timers run in
/// deadline order (ties in scheduling order) with the clock set to their
/// deadline, and without the internal lock held, so tasks may schedule or
/// cancel further timers.
#[derive(Clone)]
pub struct ManualClock {
    state: Arc<Mutex<ManualState>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ManualState {
                now: start,
                next_id: 0,
                timers: BTreeMap::new(),
                deadlines: HashMap::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move time forward by `by`, running every timer that falls due.
    pub fn advance(&self, by: Duration) {
        let target = deadline_after(self.lock().now, by);

        loop {
            let due = {
                let mut state = self.lock();
                let next = state
                    .timers
                    .first_key_value()
                    .map(|(slot, _)| *slot)
                    .filter(|(deadline, _)| *deadline <= target);

                match next {
                    Some(slot) => {
                        state.deadlines.remove(&slot.1);
                        state.now = slot.0;
                        state.timers.remove(&slot)
                    }
                    None => {
                        state.now = target;
                        None
                    }
                }
            };

            match due {
                Some(task) => task(),
                None => break,
            }
        }
    }

    /// Number of timers scheduled and not yet run or cancelled.
    pub fn pending_timers(&self) -> usize {
        self.lock().timers.len()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(DateTime::<Utc>::default())
    }
}

impl fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("ManualClock")
            .field("now", &state.now)
            .field("pending_timers", &state.timers.len())
            .finish()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.lock().now
    }
}

impl Scheduler for ManualClock {
    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle {
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;

        let deadline = deadline_after(state.now, delay);
        state.timers.insert((deadline, id), task);
        state.deadlines.insert(id, deadline);
        trace!("manual timer {} scheduled for {}", id, deadline);

        let weak: Weak<Mutex<ManualState>> = Arc::downgrade(&self.state);
        TimerHandle::new(move || {
            if let Some(state) = weak.upgrade() {
                let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
                if let Some(deadline) = state.deadlines.remove(&id) {
                    state.timers.remove(&(deadline, id));
                    trace!("manual timer {} cancelled", id);
                }
            }
        })
    }
}
