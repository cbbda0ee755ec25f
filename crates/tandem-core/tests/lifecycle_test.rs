//! End-to-end lifecycle behaviour driven by a manual clock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tandem_core::{
    AcceptResult, InviteEvent, InviteTimeout, ManagerConfig, ManualClock, Player, Session,
    SessionEvent, SessionKey, SessionManager, SessionPayload, SessionResult, session_key,
};

#[derive(Debug, Clone)]
struct Match {
    players: Vec<Player>,
    moves: Vec<String>,
}

impl Match {
    fn between(ids: &[&str]) -> Self {
        Self {
            players: ids.iter().map(|id| Player::new(*id)).collect(),
            moves: Vec::new(),
        }
    }
}

impl SessionPayload for Match {
    type Member = Player;

    fn participants(&self) -> &[Player] {
        &self.players
    }
}

fn setup() -> (ManualClock, SessionManager<Match, Player>) {
    let clock = ManualClock::default();
    let manager = SessionManager::new(
        ManagerConfig::default(),
        Arc::new(clock.clone()),
        Arc::new(clock.clone()),
    )
    .unwrap();
    (clock, manager)
}

fn record_timeouts(manager: &SessionManager<Match, Player>) -> Arc<Mutex<Vec<Session<Match>>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    manager.on(SessionEvent::SessionTimeout, move |session| {
        sink.lock().unwrap().push(session);
    });
    seen
}

fn record_invite_timeouts(
    manager: &SessionManager<Match, Player>,
) -> Arc<Mutex<Vec<(String, String)>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    manager.on_invite(InviteEvent::InviteTimeout, move |timeout| {
        sink.lock().unwrap().push((timeout.sender.id, timeout.recipient.id));
    });
    seen
}

fn created_key(result: SessionResult<Match>) -> SessionKey {
    match result {
        SessionResult::Created { key, .. } => key,
        SessionResult::AlreadyInSession { conflicting, .. } => {
            panic!("unexpected conflict on {:?}", conflicting)
        }
    }
}

#[test]
fn session_expires_once_and_cleans_up() {
    let (clock, manager) = setup();
    let timeouts = record_timeouts(&manager);

    let key = created_key(
        manager
            .create_session(Match::between(&["a", "b"]), Some(Duration::from_millis(1000)))
            .unwrap(),
    );
    assert_eq!(key, session_key(&["a", "b"]).unwrap());
    assert_eq!(manager.get_time_left(&key), Some(1));

    clock.advance(Duration::from_millis(999));
    assert!(timeouts.lock().unwrap().is_empty());

    clock.advance(Duration::from_millis(1));
    clock.advance(Duration::from_secs(10));

    let fired = timeouts.lock().unwrap();
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].participant_ids(), vec!["a", "b"]);
    assert!(manager.get_users_in_session(&["a", "b"]).is_empty());
    assert!(manager.get_session(&key).is_none());
    assert_eq!(manager.get_time_left(&key), None);
}

#[test]
fn removed_invite_never_times_out() {
    let (clock, manager) = setup();
    let timeouts = record_invite_timeouts(&manager);

    manager.send_invite_to(Player::new("x"), Player::new("y"), Some(Duration::from_millis(500)));
    clock.advance(Duration::from_millis(100));
    assert!(manager.remove_invite("x", "y").is_some());

    clock.advance(Duration::from_millis(400));
    clock.advance(Duration::from_secs(5));
    assert!(timeouts.lock().unwrap().is_empty());
    assert!(manager.get_users("x").is_none());
}

#[test]
fn unremoved_invite_times_out() {
    let (clock, manager) = setup();
    let timeouts = record_invite_timeouts(&manager);

    manager.send_invite_to(Player::new("x"), Player::new("y"), None);
    clock.advance(Duration::from_secs(59));
    assert!(manager.get_users("y").is_some());

    clock.advance(Duration::from_secs(1));
    assert_eq!(*timeouts.lock().unwrap(), vec![("x".to_string(), "y".to_string())]);
    assert!(manager.get_users("y").is_none());
}

#[test]
fn repeated_create_keeps_key_and_overwrites_silently() {
    let (clock, manager) = setup();
    let timeouts = record_timeouts(&manager);

    let first = created_key(
        manager
            .create_session(Match::between(&["a", "b"]), Some(Duration::from_secs(10)))
            .unwrap(),
    );
    clock.advance(Duration::from_secs(5));
    let second = created_key(
        manager
            .create_session(Match::between(&["a", "b"]), Some(Duration::from_secs(10)))
            .unwrap(),
    );

    assert_eq!(first, second);
    assert_eq!(manager.session_count(), 1);
    assert_eq!(manager.get_time_left(&second), Some(10));

    // The replaced session's timer must not end the new one.
    clock.advance(Duration::from_secs(6));
    assert!(timeouts.lock().unwrap().is_empty());
    assert_eq!(manager.get_users_in_session(&["a", "b"]), vec!["a", "b"]);

    clock.advance(Duration::from_secs(4));
    assert_eq!(timeouts.lock().unwrap().len(), 1);
}

#[test]
fn unknown_user_lookup_is_absent() {
    let (_clock, manager) = setup();
    assert!(manager.get_session_with_user("nonexistent").is_none());
    assert!(manager.get_users("nonexistent").is_none());
    assert_eq!(manager.get_time_left(&SessionKey::from("123")), None);
}

#[test]
fn delete_after_timeout_is_noop() {
    let (clock, manager) = setup();
    let timeouts = record_timeouts(&manager);

    let key = created_key(
        manager
            .create_session(Match::between(&["a", "b"]), Some(Duration::from_secs(1)))
            .unwrap(),
    );
    clock.advance(Duration::from_secs(1));
    clock.advance(Duration::from_millis(1));

    assert!(!manager.delete_session(&key));
    assert_eq!(timeouts.lock().unwrap().len(), 1);
}

#[test]
fn manual_delete_emits_once_and_cancels_timer() {
    let (clock, manager) = setup();
    let timeouts = record_timeouts(&manager);

    let key = created_key(manager.create_session(Match::between(&["a", "b"]), None).unwrap());
    assert!(manager.delete_session(&key));
    assert!(!manager.delete_session(&key));
    assert_eq!(clock.pending_timers(), 0);

    clock.advance(Duration::from_secs(3600));
    assert_eq!(timeouts.lock().unwrap().len(), 1);
    assert!(manager.get_users_in_session(&["a", "b"]).is_empty());
}

#[test]
fn recreated_session_outlives_stale_timer() {
    let (clock, manager) = setup();
    let timeouts = record_timeouts(&manager);

    let key = created_key(
        manager
            .create_session(Match::between(&["a", "b"]), Some(Duration::from_secs(10)))
            .unwrap(),
    );
    clock.advance(Duration::from_secs(8));
    manager.delete_session(&key);
    manager
        .create_session(Match::between(&["a", "b"]), Some(Duration::from_secs(10)))
        .unwrap();

    clock.advance(Duration::from_secs(5));
    assert_eq!(timeouts.lock().unwrap().len(), 1);
    assert_eq!(manager.get_time_left(&key), Some(5));
}

#[test]
fn listener_copy_does_not_alias_stored_session() {
    let (_clock, manager) = setup();
    let timeouts = record_timeouts(&manager);

    let key = created_key(manager.create_session(Match::between(&["a", "b"]), None).unwrap());
    manager.update_session(&key, |game| game.moves.push("e4".into()));
    manager.delete_session(&key);

    let mut delivered = timeouts.lock().unwrap();
    delivered[0].payload.moves.push("tampered".into());
    drop(delivered);

    let key = created_key(manager.create_session(Match::between(&["a", "b"]), None).unwrap());
    assert!(manager.get_session(&key).unwrap().payload.moves.is_empty());
    assert_eq!(timeouts.lock().unwrap()[0].payload.moves, vec!["e4", "tampered"]);
}

#[test]
fn delivered_session_snapshot_is_frozen() {
    let (_clock, manager) = setup();
    manager.on(SessionEvent::SessionTimeout, |mut session| {
        session.payload.moves.push("from another listener".into());
    });
    let timeouts = record_timeouts(&manager);

    let key = created_key(manager.create_session(Match::between(&["a", "b"]), None).unwrap());
    manager.update_session(&key, |game| game.moves.push("e4".into()));
    manager.delete_session(&key);

    // Later state under the same key must not show through the delivered copy.
    let key = created_key(manager.create_session(Match::between(&["a", "b"]), None).unwrap());
    manager.update_session(&key, |game| game.moves.push("d4".into()));

    let delivered = timeouts.lock().unwrap();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].payload.moves, vec!["e4"]);
    drop(delivered);
    assert_eq!(manager.get_session(&key).unwrap().payload.moves, vec!["d4"]);
}

#[test]
fn delivered_invite_timeout_is_frozen() {
    let (clock, manager) = setup();
    manager.on_invite(InviteEvent::InviteTimeout, |mut timeout| {
        timeout.sender.id.push_str("-changed");
    });
    let seen = Arc::new(Mutex::new(Vec::<InviteTimeout<Player>>::new()));
    let sink = seen.clone();
    manager.on_invite(InviteEvent::InviteTimeout, move |timeout| {
        sink.lock().unwrap().push(timeout);
    });

    let expiry = Some(Duration::from_secs(1));
    manager.send_invite_to(Player::new("x"), Player::new("y"), expiry);
    clock.advance(Duration::from_secs(1));
    manager.send_invite_to(Player::new("x"), Player::new("z"), expiry);
    clock.advance(Duration::from_secs(1));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!((seen[0].sender.id.as_str(), seen[0].recipient.id.as_str()), ("x", "y"));
    assert_eq!((seen[1].sender.id.as_str(), seen[1].recipient.id.as_str()), ("x", "z"));
}

#[test]
fn unsubscribed_listeners_are_not_called() {
    let (clock, manager) = setup();
    let calls = Arc::new(AtomicUsize::new(0));

    let sink = calls.clone();
    let session_listener = manager.on(SessionEvent::SessionTimeout, move |_| {
        sink.fetch_add(1, Ordering::SeqCst);
    });
    let sink = calls.clone();
    let invite_listener = manager.on_invite(InviteEvent::InviteTimeout, move |_| {
        sink.fetch_add(1, Ordering::SeqCst);
    });

    assert!(!manager.off(invite_listener));
    assert!(!manager.off_invite(session_listener));
    assert!(manager.off(session_listener));
    assert!(manager.off_invite(invite_listener));
    assert!(!manager.off(session_listener));

    let expiry = Some(Duration::from_secs(1));
    manager.create_session(Match::between(&["a", "b"]), expiry).unwrap();
    manager.send_invite_to(Player::new("x"), Player::new("y"), expiry);
    clock.advance(Duration::from_secs(1));

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(manager.session_count(), 0);
    assert_eq!(manager.invites().pending_count(), 0);
}

#[test]
fn second_invite_does_not_arm_second_timer() {
    let (clock, manager) = setup();
    let timeouts = record_invite_timeouts(&manager);

    let expiry = Some(Duration::from_secs(5));
    let first = manager.send_invite_to(Player::new("x"), Player::new("y"), expiry);
    let second = manager.send_invite_to(Player::new("x"), Player::new("y"), expiry);

    assert!(first.is_sent());
    assert!(!second.is_sent());
    assert_eq!(clock.pending_timers(), 1);

    clock.advance(Duration::from_secs(10));
    assert_eq!(timeouts.lock().unwrap().len(), 1);
}

#[test]
fn accepting_invite_starts_session_once() {
    let (clock, manager) = setup();
    let invite_timeouts = record_invite_timeouts(&manager);

    manager.send_invite_to(Player::new("x"), Player::new("y"), None);

    let build = |invite: tandem_core::Invite<Player>| Match {
        players: vec![invite.sender, invite.recipient],
        moves: Vec::new(),
    };
    let first = manager.accept_invite("x", "y", build, None).unwrap();
    let second = manager.accept_invite("x", "y", build, None).unwrap();

    assert!(matches!(first, AcceptResult::Accepted(SessionResult::Created { .. })));
    assert!(matches!(second, AcceptResult::NoInvite));
    assert_eq!(manager.get_users_in_session(&["x", "y"]), vec!["x", "y"]);

    clock.advance(Duration::from_secs(120));
    assert!(invite_timeouts.lock().unwrap().is_empty());
}

#[test]
fn accepting_while_busy_reports_conflict() {
    let (_clock, manager) = setup();

    manager.create_session(Match::between(&["y", "z"]), None).unwrap();
    manager.send_invite_to(Player::new("x"), Player::new("y"), None);

    let result = manager
        .accept_invite(
            "x",
            "y",
            |invite| Match {
                players: vec![invite.sender, invite.recipient],
                moves: Vec::new(),
            },
            None,
        )
        .unwrap();

    match result {
        AcceptResult::Accepted(SessionResult::AlreadyInSession { conflicting, .. }) => {
            assert_eq!(conflicting, vec!["y"]);
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(manager.get_session_with_user("x").is_none());
    assert!(manager.get_users("x").is_none());
}

#[test]
fn concurrent_accepts_yield_one_session() {
    let (_clock, manager) = setup();
    manager.send_invite_to(Player::new("x"), Player::new("y"), None);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let manager = manager.clone();
            std::thread::spawn(move || {
                manager
                    .accept_invite(
                        "x",
                        "y",
                        |invite| Match {
                            players: vec![invite.sender, invite.recipient],
                            moves: Vec::new(),
                        },
                        None,
                    )
                    .unwrap()
            })
        })
        .collect();

    let accepted = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .filter(|result| matches!(result, AcceptResult::Accepted(_)))
        .count();

    assert_eq!(accepted, 1);
    assert_eq!(manager.session_count(), 1);
}

#[test]
fn listener_can_call_back_into_manager() {
    let (clock, manager) = setup();
    let observed = Arc::new(Mutex::new(None));

    let inner = manager.clone();
    let sink = observed.clone();
    manager.on(SessionEvent::SessionTimeout, move |session| {
        let still_indexed = inner.get_users_in_session(&session.participant_ids());
        *sink.lock().unwrap() = Some(still_indexed);
    });

    manager
        .create_session(Match::between(&["a", "b"]), Some(Duration::from_secs(1)))
        .unwrap();
    clock.advance(Duration::from_secs(1));

    assert_eq!(*observed.lock().unwrap(), Some(Vec::<String>::new()));
}
