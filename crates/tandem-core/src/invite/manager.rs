use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tracing::debug;

use super::{Invite, InviteEvent, InviteResult, InviteTimeout};
use crate::events::{EventNotifier, ListenerId};
use crate::participant::Participant;
use crate::time::{Clock, Scheduler, TimerHandle, deadline_after};

type PairKey = (String, String);

struct PendingInvite<K> {
    invite: Invite<K>,
    generation: u64,
    timer: Option<TimerHandle>,
}

struct InviteBook<K> {
    next_generation: u64,
    pending: HashMap<PairKey, PendingInvite<K>>,
}

struct InviteInner<K> {
    book: Mutex<InviteBook<K>>,
    events: EventNotifier<InviteEvent, InviteTimeout<K>>,
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn Scheduler>,
}

impl<K> InviteInner<K>
where
    K: Participant + Clone + Send + 'static,
{
    fn lock(&self) -> MutexGuard<'_, InviteBook<K>> {
        self.book.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Timer callback. Only removes the invite it was scheduled for: a pair
    /// that was removed and re-sent carries a newer generation.
    fn expire(&self, pair: &PairKey, generation: u64) {
        let expired = {
            let mut book = self.lock();
            let current = book
                .pending
                .get(pair)
                .is_some_and(|pending| pending.generation == generation);
            if current { book.pending.remove(pair) } else { None }
        };

        if let Some(pending) = expired {
            debug!("invite {} -> {} expired", pair.0, pair.1);
            self.events.emit(
                InviteEvent::InviteTimeout,
                &InviteTimeout {
                    sender: pending.invite.sender,
                    recipient: pending.invite.recipient,
                },
            );
        }
    }
}

/// Tracks pending invites between participants.
///
/// At most one invite exists per ordered (sender, recipient) pair. Each
/// invite expires on its own timer; explicit removal cancels that timer.
pub struct InviteManager<K> {
    inner: Arc<InviteInner<K>>,
}

impl<K> Clone for InviteManager<K> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K> InviteManager<K>
where
    K: Participant + Clone + Send + 'static,
{
    pub fn new(clock: Arc<dyn Clock>, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            inner: Arc::new(InviteInner {
                book: Mutex::new(InviteBook {
                    next_generation: 0,
                    pending: HashMap::new(),
                }),
                events: EventNotifier::new(),
                clock,
                scheduler,
            }),
        }
    }

    /// Register a listener for invite lifecycle events.
    pub fn on(
        &self,
        event: InviteEvent,
        listener: impl Fn(InviteTimeout<K>) + Send + Sync + 'static,
    ) -> ListenerId {
        self.inner.events.on(event, listener)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.inner.events.off(id)
    }

    /// Invite `recipient` on behalf of `sender`.
    ///
    /// Self-invites are not rejected here; that is the caller's call.
    pub fn send_invite_to(&self, sender: K, recipient: K, expiry: Duration) -> InviteResult<K> {
        let pair = (sender.id().to_string(), recipient.id().to_string());
        let mut book = self.inner.lock();

        if let Some(existing) = book.pending.get(&pair) {
            debug!("invite {} -> {} already pending", pair.0, pair.1);
            return InviteResult::AlreadyInvited(existing.invite.clone());
        }

        let now = self.inner.clock.now();
        let invite = Invite {
            sender,
            recipient,
            created_at: now,
            expires_at: deadline_after(now, expiry),
        };

        let generation = book.next_generation;
        book.next_generation += 1;

        let weak: Weak<InviteInner<K>> = Arc::downgrade(&self.inner);
        let timer_pair = pair.clone();
        let timer = self.inner.scheduler.schedule(
            expiry,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.expire(&timer_pair, generation);
                }
            }),
        );

        debug!("invite {} -> {} sent, expires {}", pair.0, pair.1, invite.expires_at);
        book.pending.insert(
            pair,
            PendingInvite {
                invite: invite.clone(),
                generation,
                timer: Some(timer),
            },
        );

        InviteResult::Sent(invite)
    }

    /// Pending invite involving `id` as sender or recipient.
    ///
    /// When several are pending, the oldest is returned.
    pub fn get_user_data(&self, id: &str) -> Option<Invite<K>> {
        let book = self.inner.lock();
        book.pending
            .values()
            .filter(|pending| pending.invite.involves(id))
            .min_by_key(|pending| (pending.invite.created_at, pending.generation))
            .map(|pending| pending.invite.clone())
    }

    /// The pending invite for an ordered pair.
    pub fn get_invite(&self, sender_id: &str, recipient_id: &str) -> Option<Invite<K>> {
        let pair = (sender_id.to_string(), recipient_id.to_string());
        self.inner
            .lock()
            .pending
            .get(&pair)
            .map(|pending| pending.invite.clone())
    }

    /// Every pending invite involving `id`, oldest first.
    pub fn invites_for(&self, id: &str) -> Vec<Invite<K>> {
        let book = self.inner.lock();
        let mut matching: Vec<_> = book
            .pending
            .values()
            .filter(|pending| pending.invite.involves(id))
            .collect();
        matching.sort_by_key(|pending| (pending.invite.created_at, pending.generation));
        matching
            .into_iter()
            .map(|pending| pending.invite.clone())
            .collect()
    }

    /// Remove the invite for an ordered pair and cancel its timer.
    ///
    /// Idempotent: removing a missing invite returns `None`. Only one of any
    /// number of racing callers receives the invite.
    pub fn remove_invite_from_memory(
        &self,
        sender_id: &str,
        recipient_id: &str,
    ) -> Option<Invite<K>> {
        let pair = (sender_id.to_string(), recipient_id.to_string());
        let removed = self.inner.lock().pending.remove(&pair)?;

        if let Some(timer) = removed.timer {
            timer.cancel();
        }
        debug!("invite {} -> {} removed", pair.0, pair.1);
        Some(removed.invite)
    }

    /// Number of pending invites.
    pub fn pending_count(&self) -> usize {
        self.inner.lock().pending.len()
    }
}
