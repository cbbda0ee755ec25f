//! Lifecycle event notification.
//!
//! A small publish/subscribe registry keyed by an event enum. Dispatch is
//! synchronous and happens on the emitting thread, in registration order.
//! Every listener receives its own clone of the payload, so nothing a
//! listener holds aliases manager-owned state.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::trace;

/// Event listener callback.
pub type Listener<P> = Arc<dyn Fn(P) + Send + Sync + 'static>;

/// Identifies a registered listener for later removal.
///
/// Ids are unique across every notifier in the process, so an id from one
/// notifier never removes a listener from another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(0);

impl ListenerId {
    fn next() -> Self {
        Self(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

struct Registry<E, P> {
    listeners: Vec<(ListenerId, E, Listener<P>)>,
}

/// Publish/subscribe registry for events of kind `E` carrying payload `P`.
pub struct EventNotifier<E, P> {
    registry: Mutex<Registry<E, P>>,
}

impl<E, P> EventNotifier<E, P>
where
    E: Copy + Eq + fmt::Debug,
    P: Clone,
{
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(Registry {
                listeners: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry<E, P>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `listener` for `event`.
    pub fn on(&self, event: E, listener: impl Fn(P) + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId::next();
        self.lock().listeners.push((id, event, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut registry = self.lock();
        let before = registry.listeners.len();
        registry.listeners.retain(|(listener_id, _, _)| *listener_id != id);
        registry.listeners.len() != before
    }

    /// Deliver `payload` to every listener of `event`.
    ///
    /// Listeners run after the registry lock is released, so they may
    /// register or remove listeners themselves. Returns the number notified.
    pub fn emit(&self, event: E, payload: &P) -> usize {
        let targets: Vec<Listener<P>> = self
            .lock()
            .listeners
            .iter()
            .filter(|(_, kind, _)| *kind == event)
            .map(|(_, _, listener)| listener.clone())
            .collect();

        trace!("emitting {:?} to {} listener(s)", event, targets.len());
        for listener in &targets {
            listener(payload.clone());
        }
        targets.len()
    }

    /// Number of listeners registered for `event`.
    pub fn listener_count(&self, event: E) -> usize {
        self.lock()
            .listeners
            .iter()
            .filter(|(_, kind, _)| *kind == event)
            .count()
    }
}

impl<E, P> Default for EventNotifier<E, P>
where
    E: Copy + Eq + fmt::Debug,
    P: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E, P> fmt::Debug for EventNotifier<E, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self
            .registry
            .lock()
            .map(|registry| registry.listeners.len())
            .unwrap_or_default();
        f.debug_struct("EventNotifier")
            .field("listeners", &count)
            .finish()
    }
}
