//! Gatekeeper transitions driven end to end against nullable collaborators.
//!
//! Timers never fire on their own here: tests pull armed ticks out of the
//! `NullScheduler` and apply them, which makes every interleaving of verify
//! and expire reproducible.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use antibot_nullables::{NullClock, NullPlatform, NullScheduler, NullStore};
use antibot_platform::InlineButton;
use antibot_store::RegistryStore;
use antibot_types::{
    ChatId, JoinEvent, JoiningUser, MemberStatus, MessageId, Timestamp, UserId, VerifyAction,
};
use antibot_verification::{
    ExpireOutcome, ExpiryTick, GateConfig, GateError, GateEvent, Gatekeeper, JoinDecline,
    JoinOutcome, RemovalMode, SkipReason, VerifyOutcome,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const BOT: UserId = UserId::new(1);
const CHAT: ChatId = ChatId::new(-1001751824071);
const ANN: UserId = UserId::new(42);
const BOB: UserId = UserId::new(43);
const START: u64 = 1_000;

struct Harness {
    gate: Gatekeeper,
    platform: Arc<NullPlatform>,
    store: Arc<NullStore>,
    scheduler: Arc<NullScheduler>,
    clock: Arc<NullClock>,
    events: Arc<Mutex<Vec<GateEvent>>>,
}

impl Harness {
    fn new() -> Self {
        Self::with(GateConfig::default(), Arc::new(NullStore::new()))
    }

    fn with(config: GateConfig, store: Arc<NullStore>) -> Self {
        Self::at(config, store, START)
    }

    fn at(config: GateConfig, store: Arc<NullStore>, now: u64) -> Self {
        let platform = Arc::new(NullPlatform::new(BOT));
        let scheduler = Arc::new(NullScheduler::new());
        let clock = Arc::new(NullClock::new(now));
        let mut gate = Gatekeeper::open(
            config,
            store.clone(),
            platform.clone(),
            scheduler.clone(),
            clock.clone(),
        )
        .expect("open gatekeeper");

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        gate.subscribe(Box::new(move |event| sink.lock().unwrap().push(event.clone())));

        Self {
            gate,
            platform,
            store,
            scheduler,
            clock,
            events,
        }
    }

    fn pending(&self, user: UserId) -> bool {
        self.gate
            .registry()
            .find_chat(CHAT)
            .is_some_and(|chat| chat.find_user(user).is_some())
    }

    fn persisted_pending(&self, user: UserId) -> bool {
        self.store
            .snapshot()
            .find_chat(CHAT)
            .is_some_and(|chat| chat.find_user(user).is_some())
    }

    fn tick_for(&self, user: UserId) -> ExpiryTick {
        self.scheduler
            .armed()
            .into_iter()
            .rev()
            .map(|t| t.tick)
            .find(|tick| tick.user == user)
            .expect("timer armed for user")
    }

    fn events(&self) -> Vec<GateEvent> {
        self.events.lock().unwrap().clone()
    }
}

fn joiner(id: UserId, name: &str) -> JoiningUser {
    JoiningUser {
        id,
        display_name: Some(name.to_string()),
        is_bot: false,
    }
}

fn join(message: i64, users: Vec<JoiningUser>) -> JoinEvent {
    JoinEvent {
        chat: CHAT,
        message_id: MessageId::new(message),
        users,
    }
}

fn press(from: UserId, action_id: &str) -> VerifyAction {
    VerifyAction {
        action_id: action_id.to_string(),
        chat: CHAT,
        from,
    }
}

// ---------------------------------------------------------------------------
// 1. Join
// ---------------------------------------------------------------------------

#[tokio::test]
async fn join_admits_user_and_sends_prompt() {
    let mut h = Harness::new();

    let outcome = h.gate.on_join(join(10, vec![joiner(ANN, "Ann")])).await.unwrap();
    assert_eq!(outcome.admitted(), &[ANN]);
    assert!(h.pending(ANN));
    assert!(h.persisted_pending(ANN));

    let sent = h.platform.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].button, Some(InlineButton::verify()));
    assert!(sent[0].text.contains("[Ann](tg://user?id=42)"));
    assert!(sent[0].text.contains("*1 minute*"));
    assert!(sent[0].text.contains("*banned*"));

    let armed = h.scheduler.armed();
    assert_eq!(armed.len(), 1);
    assert_eq!(armed[0].after, Duration::from_secs(60));
    assert_eq!(armed[0].tick.deadline, Timestamp::new(START + 60));

    let chat = h.store.snapshot();
    let chat = chat.find_chat(CHAT).unwrap();
    assert_eq!(chat.latest_message_id(), MessageId::new(10));
    assert_eq!(
        chat.find_user(ANN).unwrap().prompt_message_id,
        Some(sent[0].id)
    );
    assert!(h.events().contains(&GateEvent::ChatRegistered { chat: CHAT }));
}

#[tokio::test]
async fn replayed_join_is_ignored() {
    let mut h = Harness::new();
    h.gate.on_join(join(10, vec![joiner(ANN, "Ann")])).await.unwrap();

    for message in [10, 9] {
        let outcome = h.gate.on_join(join(message, vec![joiner(BOB, "Bob")])).await.unwrap();
        assert_eq!(
            outcome,
            JoinOutcome::Declined(JoinDecline::Replay {
                watermark: MessageId::new(10)
            })
        );
    }
    assert_eq!(h.platform.sent().len(), 1);
    assert!(!h.pending(BOB));
}

#[tokio::test]
async fn elevated_and_bot_joiners_are_skipped() {
    let mut h = Harness::new();
    h.platform.set_status(CHAT, BOB, MemberStatus::Administrator);
    let robot = JoiningUser {
        id: UserId::new(99),
        display_name: Some("helper".into()),
        is_bot: true,
    };

    let outcome = h
        .gate
        .on_join(join(5, vec![joiner(BOB, "Bob"), robot, joiner(ANN, "Ann")]))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        JoinOutcome::Processed {
            admitted: vec![ANN],
            skipped: vec![(BOB, SkipReason::Elevated), (UserId::new(99), SkipReason::Bot)],
        }
    );
    assert_eq!(h.platform.sent().len(), 1);
    assert_eq!(h.gate.registry().pending_count(), 1);
}

#[tokio::test]
async fn user_who_already_left_is_skipped() {
    let mut h = Harness::new();
    h.platform.set_status(CHAT, ANN, MemberStatus::Left);
    let outcome = h.gate.on_join(join(5, vec![joiner(ANN, "Ann")])).await.unwrap();
    assert_eq!(
        outcome,
        JoinOutcome::Processed {
            admitted: vec![],
            skipped: vec![(ANN, SkipReason::NotMember(MemberStatus::Left))],
        }
    );
    // The watermark still moves so the event is not reprocessed.
    assert_eq!(
        h.store.snapshot().find_chat(CHAT).unwrap().latest_message_id(),
        MessageId::new(5)
    );
}

#[tokio::test]
async fn duplicate_join_keeps_single_challenge() {
    let mut h = Harness::new();
    h.gate.on_join(join(5, vec![joiner(ANN, "Ann")])).await.unwrap();
    let outcome = h.gate.on_join(join(6, vec![joiner(ANN, "Ann")])).await.unwrap();
    assert_eq!(
        outcome,
        JoinOutcome::Processed {
            admitted: vec![],
            skipped: vec![(ANN, SkipReason::AlreadyPending)],
        }
    );
    assert_eq!(h.scheduler.armed().len(), 1);
    assert_eq!(h.gate.registry().pending_count(), 1);
}

#[tokio::test]
async fn bot_without_admin_rights_does_nothing() {
    let mut h = Harness::new();
    h.platform.set_status(CHAT, BOT, MemberStatus::Member);

    let outcome = h.gate.on_join(join(5, vec![joiner(ANN, "Ann")])).await.unwrap();
    assert_eq!(outcome, JoinOutcome::Declined(JoinDecline::BotNotAdmin));
    assert_eq!(h.gate.registry().chat_count(), 0);
    assert!(h.platform.sent().is_empty());
}

#[tokio::test]
async fn unmanaged_chat_is_ignored() {
    let config = GateConfig {
        allowed_chats: vec![ChatId::new(-5)],
        ..Default::default()
    };
    let mut h = Harness::with(config, Arc::new(NullStore::new()));

    let outcome = h.gate.on_join(join(5, vec![joiner(ANN, "Ann")])).await.unwrap();
    assert_eq!(outcome, JoinOutcome::Declined(JoinDecline::ChatNotManaged));
    assert_eq!(h.gate.registry().chat_count(), 0);
}

#[tokio::test]
async fn unrenderable_name_falls_back_to_placeholder() {
    let mut h = Harness::new();
    h.platform.refuse_text_containing("Mallory");

    h.gate.on_join(join(5, vec![joiner(ANN, "Mallory")])).await.unwrap();
    let texts = h.platform.texts_in(CHAT);
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("[Absolute Student](tg://user?id=42)"));
}

#[tokio::test]
async fn failed_prompt_still_leaves_user_pending() {
    let mut h = Harness::new();
    h.platform.fail("sendMessage");

    h.gate.on_join(join(5, vec![joiner(ANN, "Ann")])).await.unwrap();
    assert!(h.pending(ANN));
    assert_eq!(h.scheduler.live().len(), 1);
    assert!(h
        .events()
        .contains(&GateEvent::PlatformCallFailed { call: "sendMessage" }));
}

// ---------------------------------------------------------------------------
// 2. Verify
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pending_user_verifies() {
    let mut h = Harness::new();
    h.gate.on_join(join(10, vec![joiner(ANN, "Ann")])).await.unwrap();
    let prompt = h.platform.sent()[0].id;

    let outcome = h.gate.on_verify(press(ANN, "q1")).await.unwrap();
    assert_eq!(outcome, VerifyOutcome::Verified);
    assert!(!h.pending(ANN));
    assert!(!h.persisted_pending(ANN));
    assert!(h.scheduler.live().is_empty());
    assert_eq!(h.platform.deleted(), vec![(CHAT, prompt)]);
    assert_eq!(h.platform.answered(), vec![("q1".to_string(), None)]);
    assert_eq!(
        h.platform.texts_in(CHAT).last().unwrap(),
        "[Ann](tg://user?id=42) has been verified\\!"
    );
}

#[tokio::test]
async fn foreign_press_is_rejected_with_alert() {
    let mut h = Harness::new();
    h.gate.on_join(join(10, vec![joiner(ANN, "Ann")])).await.unwrap();

    let outcome = h.gate.on_verify(press(BOB, "q2")).await.unwrap();
    assert_eq!(outcome, VerifyOutcome::Rejected);
    assert!(h.pending(ANN));
    assert_eq!(h.scheduler.live().len(), 1);
    assert_eq!(
        h.platform.answered(),
        vec![(
            "q2".to_string(),
            Some("You are not allowed to press this button!".to_string())
        )]
    );
    assert!(h.platform.deleted().is_empty());
}

#[tokio::test]
async fn press_in_unknown_chat_is_rejected() {
    let mut h = Harness::new();
    let outcome = h.gate.on_verify(press(ANN, "q3")).await.unwrap();
    assert_eq!(outcome, VerifyOutcome::Rejected);
    assert!(h.events().contains(&GateEvent::VerifyRejected { chat: CHAT, user: ANN }));
}

// ---------------------------------------------------------------------------
// 3. Expire
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unverified_user_is_banned() {
    let mut h = Harness::new();
    h.gate.on_join(join(10, vec![joiner(ANN, "Ann")])).await.unwrap();
    let prompt = h.platform.sent()[0].id;
    h.clock.advance(60);

    let outcome = h.gate.on_expire(h.tick_for(ANN)).await.unwrap();
    assert_eq!(outcome, ExpireOutcome::Removed);
    assert_eq!(h.platform.banned(), vec![(CHAT, ANN)]);
    assert!(h.platform.unbanned().is_empty());
    assert!(h.platform.deleted().contains(&(CHAT, prompt)));
    assert_eq!(
        h.platform.texts_in(CHAT).last().unwrap(),
        "[Ann](tg://user?id=42) hasn't been verified\\!"
    );
    assert!(!h.persisted_pending(ANN));
}

#[tokio::test]
async fn kick_mode_lifts_the_ban() {
    let config = GateConfig {
        removal: RemovalMode::Kick,
        ..Default::default()
    };
    let mut h = Harness::with(config, Arc::new(NullStore::new()));
    h.gate.on_join(join(10, vec![joiner(ANN, "Ann")])).await.unwrap();
    assert!(h.platform.sent()[0].text.contains("*kicked*"));

    let outcome = h.gate.on_expire(h.tick_for(ANN)).await.unwrap();
    assert_eq!(outcome, ExpireOutcome::Removed);
    assert_eq!(h.platform.banned(), vec![(CHAT, ANN)]);
    assert_eq!(h.platform.unbanned(), vec![(CHAT, ANN)]);
}

#[tokio::test]
async fn user_who_left_is_spared() {
    let mut h = Harness::new();
    h.gate.on_join(join(10, vec![joiner(ANN, "Ann")])).await.unwrap();
    h.platform.set_status(CHAT, ANN, MemberStatus::Left);

    let outcome = h.gate.on_expire(h.tick_for(ANN)).await.unwrap();
    assert_eq!(outcome, ExpireOutcome::Spared(MemberStatus::Left));
    assert!(h.platform.banned().is_empty());
    assert_eq!(h.platform.texts_in(CHAT).len(), 1);
    assert!(!h.pending(ANN));
}

#[tokio::test]
async fn promoted_user_is_spared() {
    let mut h = Harness::new();
    h.gate.on_join(join(10, vec![joiner(ANN, "Ann")])).await.unwrap();
    h.platform.set_status(CHAT, ANN, MemberStatus::Administrator);

    let outcome = h.gate.on_expire(h.tick_for(ANN)).await.unwrap();
    assert_eq!(outcome, ExpireOutcome::Spared(MemberStatus::Administrator));
    assert!(h.platform.banned().is_empty());
}

#[tokio::test]
async fn unknown_status_still_removes() {
    let mut h = Harness::new();
    h.gate.on_join(join(10, vec![joiner(ANN, "Ann")])).await.unwrap();
    h.platform.fail("getChatMember");

    let outcome = h.gate.on_expire(h.tick_for(ANN)).await.unwrap();
    assert_eq!(outcome, ExpireOutcome::Removed);
    assert_eq!(h.platform.banned(), vec![(CHAT, ANN)]);
}

#[tokio::test]
async fn refused_removal_is_reported() {
    let mut h = Harness::new();
    h.gate.on_join(join(10, vec![joiner(ANN, "Ann")])).await.unwrap();
    h.platform.fail("banChatMember");

    let outcome = h.gate.on_expire(h.tick_for(ANN)).await.unwrap();
    assert_eq!(outcome, ExpireOutcome::RemovalFailed);
    // No "not verified" notice without a removal.
    assert_eq!(h.platform.texts_in(CHAT).len(), 1);
    assert!(!h.pending(ANN));
}

#[tokio::test]
async fn tick_with_old_deadline_is_stale() {
    let mut h = Harness::new();
    h.gate.on_join(join(10, vec![joiner(ANN, "Ann")])).await.unwrap();
    let mut tick = h.tick_for(ANN);
    tick.deadline = Timestamp::new(tick.deadline.as_secs() - 1);

    assert_eq!(h.gate.on_expire(tick).await.unwrap(), ExpireOutcome::Stale);
    assert!(h.pending(ANN));
    assert!(h.platform.banned().is_empty());
}

// ---------------------------------------------------------------------------
// 4. Verify / expire race
// ---------------------------------------------------------------------------

#[tokio::test]
async fn verify_before_queued_expiry_wins() {
    let mut h = Harness::new();
    h.gate.on_join(join(10, vec![joiner(ANN, "Ann")])).await.unwrap();
    let tick = h.tick_for(ANN);

    assert_eq!(
        h.gate.on_verify(press(ANN, "q1")).await.unwrap(),
        VerifyOutcome::Verified
    );
    assert_eq!(h.gate.on_expire(tick).await.unwrap(), ExpireOutcome::Stale);
    assert!(h.platform.banned().is_empty());
}

#[tokio::test]
async fn expiry_before_queued_verify_wins() {
    let mut h = Harness::new();
    h.gate.on_join(join(10, vec![joiner(ANN, "Ann")])).await.unwrap();
    let tick = h.tick_for(ANN);

    assert_eq!(h.gate.on_expire(tick).await.unwrap(), ExpireOutcome::Removed);
    assert_eq!(
        h.gate.on_verify(press(ANN, "q1")).await.unwrap(),
        VerifyOutcome::Rejected
    );
    let verified = h
        .platform
        .texts_in(CHAT)
        .iter()
        .filter(|t| t.contains("has been verified"))
        .count();
    assert_eq!(verified, 0);
}

// ---------------------------------------------------------------------------
// 5. Persistence and restart
// ---------------------------------------------------------------------------

#[tokio::test]
async fn restart_rearms_remaining_window() {
    let store = Arc::new(NullStore::new());
    {
        let mut h = Harness::with(GateConfig::default(), store.clone());
        h.gate
            .on_join(join(10, vec![joiner(ANN, "Ann"), joiner(BOB, "Bob")]))
            .await
            .unwrap();
        h.gate.close().await.unwrap();
        assert!(h.scheduler.live().is_empty());
    }

    let mut h = Harness::at(GateConfig::default(), store, START + 20);
    assert_eq!(h.gate.restore(), 2);
    let armed = h.scheduler.armed();
    assert_eq!(armed.len(), 2);
    assert!(armed.iter().all(|t| t.after == Duration::from_secs(40)));

    // The restored challenge behaves like the original one.
    let outcome = h.gate.on_verify(press(BOB, "q1")).await.unwrap();
    assert_eq!(outcome, VerifyOutcome::Verified);
    assert_eq!(h.platform.deleted().len(), 1);
}

#[tokio::test]
async fn overdue_challenge_expires_immediately_after_restart() {
    let store = Arc::new(NullStore::new());
    {
        let mut h = Harness::with(GateConfig::default(), store.clone());
        h.gate.on_join(join(10, vec![joiner(ANN, "Ann")])).await.unwrap();
    }

    let mut h = Harness::at(GateConfig::default(), store, START + 600);
    h.gate.restore();
    let timer = h.scheduler.last().unwrap();
    assert_eq!(timer.after, Duration::ZERO);

    let outcome = h.gate.on_expire(timer.tick).await.unwrap();
    assert_eq!(outcome, ExpireOutcome::Removed);
}

#[tokio::test]
async fn restart_replays_nothing_already_processed() {
    let store = Arc::new(NullStore::new());
    {
        let mut h = Harness::with(GateConfig::default(), store.clone());
        h.gate.on_join(join(10, vec![joiner(ANN, "Ann")])).await.unwrap();
    }
    let mut h = Harness::with(GateConfig::default(), store);
    let outcome = h.gate.on_join(join(10, vec![joiner(ANN, "Ann")])).await.unwrap();
    assert!(matches!(outcome, JoinOutcome::Declined(JoinDecline::Replay { .. })));
    assert!(h.platform.sent().is_empty());
}

#[tokio::test]
async fn failed_flush_keeps_memory_and_reports() {
    let mut h = Harness::new();
    h.store.fail_writes(true);

    let result = h.gate.on_join(join(10, vec![joiner(ANN, "Ann")])).await;
    assert!(matches!(result, Err(GateError::Persistence(_))));
    assert!(h.pending(ANN));
    assert_eq!(h.platform.sent().len(), 1);
    assert!(h.events().contains(&GateEvent::PersistenceFailed));

    h.store.fail_writes(false);
    let outcome = h.gate.on_verify(press(BOB, "q1")).await.unwrap();
    assert_eq!(outcome, VerifyOutcome::Rejected);
    h.gate.on_verify(press(ANN, "q2")).await.unwrap();
    assert!(h.store.snapshot().find_chat(CHAT).is_some());
}

#[test]
fn corrupt_registry_refuses_to_open() {
    let store = Arc::new(NullStore::with_document("{not json"));
    let result = Gatekeeper::open(
        GateConfig::default(),
        store.clone(),
        Arc::new(NullPlatform::new(BOT)),
        Arc::new(NullScheduler::new()),
        Arc::new(NullClock::new(START)),
    );
    match result {
        Err(GateError::Persistence(e)) => assert!(e.is_corruption()),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("corrupt registry must not open"),
    }
    // The corrupt document is left in place.
    assert!(store.load().is_err());
}

fn open_document(document: &str) -> Result<Gatekeeper, GateError> {
    Gatekeeper::open(
        GateConfig::default(),
        Arc::new(NullStore::with_document(document)),
        Arc::new(NullPlatform::new(BOT)),
        Arc::new(NullScheduler::new()),
        Arc::new(NullClock::new(START)),
    )
}

#[test]
fn registry_with_duplicate_entries_refuses_to_open() {
    let twin_chats = r#"{"chats":[
        {"chat_id":-1,"latest_message_id":0,"pending_users":[]},
        {"chat_id":-1,"latest_message_id":0,"pending_users":[
            {"id":42,"display_name":"Ann","identifier":"NDI=","deadline":1060}]}]}"#;
    let twin_users = r#"{"chats":[{"chat_id":-1,"latest_message_id":0,"pending_users":[
        {"id":42,"display_name":"Ann","identifier":"OTk=","deadline":1060},
        {"id":42,"display_name":"Ann","identifier":"NDI=","deadline":1060}]}]}"#;

    for document in [twin_chats, twin_users] {
        match open_document(document) {
            Err(GateError::Persistence(e)) => assert!(e.is_corruption()),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(gate) => panic!(
                "opened with {} pending entries",
                gate.registry().pending_count()
            ),
        }
    }
}

#[test]
fn registry_with_foreign_identifier_refuses_to_open() {
    let document = r#"{"chats":[{"chat_id":-1,"latest_message_id":0,"pending_users":[
        {"id":42,"display_name":"Ann","identifier":"OTk=","deadline":1060}]}]}"#;
    assert!(matches!(
        open_document(document),
        Err(GateError::Persistence(e)) if e.is_corruption()
    ));
}

#[tokio::test]
async fn join_writes_once_per_admitted_user_and_once_at_the_end() {
    let mut h = Harness::new();
    h.gate
        .on_join(join(10, vec![joiner(ANN, "Ann"), joiner(BOB, "Bob")]))
        .await
        .unwrap();
    assert_eq!(h.store.save_count(), 3);

    let persisted = h.store.snapshot();
    let chat = persisted.find_chat(CHAT).unwrap();
    let sent = h.platform.sent();
    assert_eq!(chat.find_user(ANN).unwrap().prompt_message_id, Some(sent[0].id));
    assert_eq!(chat.find_user(BOB).unwrap().prompt_message_id, Some(sent[1].id));

    h.gate
        .on_join(join(11, vec![JoiningUser {
            id: UserId::new(7),
            display_name: None,
            is_bot: true,
        }]))
        .await
        .unwrap();
    assert_eq!(h.store.save_count(), 4);
}
