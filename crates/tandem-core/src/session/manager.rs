use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{AcceptResult, Session, SessionEvent, SessionResult};
use crate::config::ManagerConfig;
use crate::error::Result;
use crate::events::{EventNotifier, ListenerId};
use crate::hashing::{SessionKey, session_key};
use crate::invite::{Invite, InviteEvent, InviteManager, InviteResult, InviteTimeout};
use crate::participant::{Participant, SessionPayload};
use crate::time::{Clock, Scheduler, TimerHandle, deadline_after};

struct LiveSession<T> {
    session: Session<T>,
    generation: u64,
    timer: Option<TimerHandle>,
}

/// Session store and membership index. Always mutated together.
struct SessionBook<T> {
    next_generation: u64,
    sessions: HashMap<SessionKey, LiveSession<T>>,
    members: HashMap<String, SessionKey>,
}

impl<T: SessionPayload> SessionBook<T> {
    fn members_in_session(&self, ids: &[String]) -> Vec<String> {
        ids.iter()
            .filter(|id| self.members.contains_key(id.as_str()))
            .cloned()
            .collect()
    }

    /// Remove a session and the index entries that still point at it.
    ///
    /// A participant whose entry was overwritten by a later create keeps its
    /// newer entry.
    fn remove(&mut self, key: &SessionKey) -> Option<LiveSession<T>> {
        let live = self.sessions.remove(key)?;
        for id in live.session.participant_ids() {
            if self.members.get(&id) == Some(key) {
                self.members.remove(&id);
            }
        }
        Some(live)
    }
}

struct SessionInner<T> {
    book: Mutex<SessionBook<T>>,
    events: EventNotifier<SessionEvent, Session<T>>,
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn Scheduler>,
}

impl<T: SessionPayload> SessionInner<T> {
    fn lock(&self) -> MutexGuard<'_, SessionBook<T>> {
        self.book.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a session under `key` and arm its expiry timer.
    ///
    /// Does not check membership: existing index entries of the participants
    /// are overwritten. A session already stored under the same key is
    /// replaced and its timer cancelled.
    fn insert(
        self: &Arc<Self>,
        book: &mut SessionBook<T>,
        key: SessionKey,
        ids: &[String],
        payload: T,
        expiry: Duration,
    ) -> SessionResult<T> {
        if let Some(replaced) = book.remove(&key) {
            warn!("session {} replaced by a new session with the same key", key);
            if let Some(timer) = replaced.timer {
                timer.cancel();
            }
        }

        for id in ids {
            book.members.insert(id.clone(), key.clone());
        }

        let now = self.clock.now();
        let generation = book.next_generation;
        book.next_generation += 1;

        let weak: Weak<Self> = Arc::downgrade(self);
        let timer_key = key.clone();
        let timer = self.scheduler.schedule(
            expiry,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.expire(&timer_key, generation);
                }
            }),
        );

        let session = Session {
            key: key.clone(),
            payload: payload.clone(),
            created_at: now,
            expires_at: deadline_after(now, expiry),
        };
        info!(
            "session {} created for [{}], expires {}",
            key,
            ids.join(", "),
            session.expires_at
        );
        book.sessions.insert(
            key.clone(),
            LiveSession {
                session,
                generation,
                timer: Some(timer),
            },
        );

        SessionResult::Created { key, payload }
    }

    /// Timer callback. A no-op unless the session it was armed for is still
    /// stored under `key`.
    fn expire(&self, key: &SessionKey, generation: u64) {
        let expired = {
            let mut book = self.lock();
            let current = book
                .sessions
                .get(key)
                .is_some_and(|live| live.generation == generation);
            if current { book.remove(key) } else { None }
        };

        if let Some(live) = expired {
            info!("session {} expired", key);
            self.events.emit(SessionEvent::SessionTimeout, &live.session);
        }
    }
}

/// Owns confirmed sessions and the invite handshake that precedes them.
///
/// `T` is the caller's session state; `K` the identity type used in invites.
/// Cloning the manager yields another handle to the same state.
pub struct SessionManager<T, K> {
    inner: Arc<SessionInner<T>>,
    invites: InviteManager<K>,
    config: ManagerConfig,
}

impl<T, K> Clone for SessionManager<T, K> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            invites: self.invites.clone(),
            config: self.config.clone(),
        }
    }
}

impl<T, K> SessionManager<T, K>
where
    T: SessionPayload,
    K: Participant + Clone + Send + 'static,
{
    /// Create a manager with its own invite manager on the same clock.
    pub fn new(
        config: ManagerConfig,
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Result<Self> {
        let invites = InviteManager::new(clock.clone(), scheduler.clone());
        Self::with_invites(config, clock, scheduler, invites)
    }

    /// Create a manager around an existing invite manager.
    pub fn with_invites(
        config: ManagerConfig,
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn Scheduler>,
        invites: InviteManager<K>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(SessionInner {
                book: Mutex::new(SessionBook {
                    next_generation: 0,
                    sessions: HashMap::new(),
                    members: HashMap::new(),
                }),
                events: EventNotifier::new(),
                clock,
                scheduler,
            }),
            invites,
            config,
        })
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// The composed invite manager.
    pub fn invites(&self) -> &InviteManager<K> {
        &self.invites
    }

    // ─────────────────────────────────────────────────────────────────────
    // Events
    // ─────────────────────────────────────────────────────────────────────

    /// Register a listener for session lifecycle events.
    pub fn on(
        &self,
        event: SessionEvent,
        listener: impl Fn(Session<T>) + Send + Sync + 'static,
    ) -> ListenerId {
        self.inner.events.on(event, listener)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.inner.events.off(id)
    }

    /// Register a listener for invite lifecycle events.
    pub fn on_invite(
        &self,
        event: InviteEvent,
        listener: impl Fn(InviteTimeout<K>) + Send + Sync + 'static,
    ) -> ListenerId {
        self.invites.on(event, listener)
    }

    pub fn off_invite(&self, id: ListenerId) -> bool {
        self.invites.off(id)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Sessions
    // ─────────────────────────────────────────────────────────────────────

    /// The subset of `ids` (in input order) currently in a live session.
    pub fn get_users_in_session<I: AsRef<str>>(&self, ids: &[I]) -> Vec<String> {
        let book = self.inner.lock();
        ids.iter()
            .map(|id| -> &str { id.as_ref() })
            .filter(|id| book.members.contains_key(*id))
            .map(str::to_string)
            .collect()
    }

    /// The live session `id` belongs to.
    pub fn get_session_with_user(&self, id: &str) -> Option<Session<T>> {
        let book = self.inner.lock();
        let key = book.members.get(id)?;
        book.sessions.get(key).map(|live| live.session.clone())
    }

    pub fn get_session(&self, key: &SessionKey) -> Option<Session<T>> {
        self.inner
            .lock()
            .sessions
            .get(key)
            .map(|live| live.session.clone())
    }

    /// Start a session for the payload's participants.
    ///
    /// The caller is expected to have checked [`get_users_in_session`]
    /// first: this does not, and silently re-points the membership of any
    /// participant already in another session. Use [`try_create_session`]
    /// for the checked variant. `expiry` defaults to the configured session
    /// lifetime.
    ///
    /// [`get_users_in_session`]: Self::get_users_in_session
    /// [`try_create_session`]: Self::try_create_session
    pub fn create_session(&self, payload: T, expiry: Option<Duration>) -> Result<SessionResult<T>> {
        let ids = payload.participant_ids();
        let key = session_key(&ids)?;
        let expiry = expiry.unwrap_or_else(|| self.config.session_ttl());

        let mut book = self.inner.lock();
        Ok(self.inner.insert(&mut book, key, &ids, payload, expiry))
    }

    /// Start a session unless a participant is already in one.
    ///
    /// The membership check and the insert happen under one lock.
    pub fn try_create_session(
        &self,
        payload: T,
        expiry: Option<Duration>,
    ) -> Result<SessionResult<T>> {
        let ids = payload.participant_ids();
        let key = session_key(&ids)?;
        let expiry = expiry.unwrap_or_else(|| self.config.session_ttl());

        let mut book = self.inner.lock();
        let conflicting = book.members_in_session(&ids);
        if !conflicting.is_empty() {
            debug!(
                "session for [{}] refused, already in session: [{}]",
                ids.join(", "),
                conflicting.join(", ")
            );
            return Ok(SessionResult::AlreadyInSession { conflicting, payload });
        }
        Ok(self.inner.insert(&mut book, key, &ids, payload, expiry))
    }

    /// Whole seconds until the session expires.
    ///
    /// Negative if the deadline passed and the timer has not run yet;
    /// `None` if no such session exists.
    pub fn get_time_left(&self, key: &SessionKey) -> Option<i64> {
        let now = self.inner.clock.now();
        self.inner
            .lock()
            .sessions
            .get(key)
            .map(|live| live.session.time_left(now))
    }

    /// End a session now.
    ///
    /// Emits `SessionTimeout` and returns `true` if the session existed;
    /// deleting a missing session does nothing.
    pub fn delete_session(&self, key: &SessionKey) -> bool {
        let removed = self.inner.lock().remove(key);

        match removed {
            Some(live) => {
                if let Some(timer) = live.timer {
                    timer.cancel();
                }
                info!("session {} deleted", key);
                self.inner.events.emit(SessionEvent::SessionTimeout, &live.session);
                true
            }
            None => false,
        }
    }

    /// Mutate the payload of a live session.
    ///
    /// `update` runs under the manager lock and must not call back into the
    /// manager. It must not change the participant list. Returns `None` if
    /// the session is gone.
    pub fn update_session<R>(
        &self,
        key: &SessionKey,
        update: impl FnOnce(&mut T) -> R,
    ) -> Option<R> {
        let mut book = self.inner.lock();
        book.sessions
            .get_mut(key)
            .map(|live| update(&mut live.session.payload))
    }

    pub fn session_count(&self) -> usize {
        self.inner.lock().sessions.len()
    }

    /// Snapshot of every live session, oldest first.
    pub fn sessions(&self) -> Vec<Session<T>> {
        let book = self.inner.lock();
        let mut sessions: Vec<_> = book
            .sessions
            .values()
            .map(|live| (live.generation, live.session.clone()))
            .collect();
        sessions.sort_by_key(|(generation, _)| *generation);
        sessions.into_iter().map(|(_, session)| session).collect()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Invites
    // ─────────────────────────────────────────────────────────────────────

    /// Invite `to_user` on behalf of `from_user`. `expiry` defaults to the
    /// configured invite lifetime.
    pub fn send_invite_to(
        &self,
        from_user: K,
        to_user: K,
        expiry: Option<Duration>,
    ) -> InviteResult<K> {
        let expiry = expiry.unwrap_or_else(|| self.config.invite_ttl());
        self.invites.send_invite_to(from_user, to_user, expiry)
    }

    /// Pending invite involving `id`.
    pub fn get_users(&self, id: &str) -> Option<Invite<K>> {
        self.invites.get_user_data(id)
    }

    /// Remove a pending invite (accept or decline). Idempotent.
    pub fn remove_invite(&self, sender_id: &str, recipient_id: &str) -> Option<Invite<K>> {
        self.invites.remove_invite_from_memory(sender_id, recipient_id)
    }

    /// Consume an invite and start the session it asked for.
    ///
    /// The invite is removed and the checked creation runs while the session
    /// lock is held, so of several racing accepts exactly one sees the
    /// invite. `build` turns the invite into the session payload; like
    /// [`update_session`](Self::update_session) it must not call back into
    /// the manager.
    pub fn accept_invite(
        &self,
        sender_id: &str,
        recipient_id: &str,
        build: impl FnOnce(Invite<K>) -> T,
        expiry: Option<Duration>,
    ) -> Result<AcceptResult<T>> {
        let expiry = expiry.unwrap_or_else(|| self.config.session_ttl());

        let mut book = self.inner.lock();
        let Some(invite) = self.invites.remove_invite_from_memory(sender_id, recipient_id) else {
            return Ok(AcceptResult::NoInvite);
        };

        let payload = build(invite);
        let ids = payload.participant_ids();
        let key = session_key(&ids)?;

        let conflicting = book.members_in_session(&ids);
        if !conflicting.is_empty() {
            debug!(
                "invite {} -> {} accepted but [{}] already in session",
                sender_id,
                recipient_id,
                conflicting.join(", ")
            );
            return Ok(AcceptResult::Accepted(SessionResult::AlreadyInSession {
                conflicting,
                payload,
            }));
        }

        Ok(AcceptResult::Accepted(
            self.inner.insert(&mut book, key, &ids, payload, expiry),
        ))
    }
}
