//! The transition processor running on a real runtime with tokio timers.

use std::sync::Arc;
use std::time::Duration;

use antibot_nullables::{NullPlatform, NullStore};
use antibot_types::{ChatId, JoinEvent, JoiningUser, MessageId, SystemClock, UserId};
use antibot_verification::{
    transition_channel, GateConfig, Gatekeeper, TokioScheduler, Transition, TransitionProcessor,
};
use tokio::sync::broadcast;

const BOT: UserId = UserId::new(1);
const CHAT: ChatId = ChatId::new(-7);
const ANN: UserId = UserId::new(42);

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn expiry_timer_feeds_back_into_the_queue() {
    let platform = Arc::new(NullPlatform::new(BOT));
    let store = Arc::new(NullStore::new());
    let (tx, rx) = transition_channel();
    let config = GateConfig {
        expiry_window: Duration::ZERO,
        ..Default::default()
    };
    let gate = Gatekeeper::open(
        config,
        store.clone(),
        platform.clone(),
        Arc::new(TokioScheduler::new(tx.clone())),
        Arc::new(SystemClock),
    )
    .unwrap();

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let processor = tokio::spawn(TransitionProcessor::new(gate, rx).run(shutdown_rx));

    tx.send(Transition::Join(JoinEvent {
        chat: CHAT,
        message_id: MessageId::new(3),
        users: vec![JoiningUser {
            id: ANN,
            display_name: Some("Ann".into()),
            is_bot: false,
        }],
    }))
    .await
    .unwrap();

    wait_until(|| platform.banned() == vec![(CHAT, ANN)]).await;

    shutdown_tx.send(()).unwrap();
    let mut gate = processor.await.unwrap();
    assert_eq!(gate.registry().pending_count(), 0);
    gate.close().await.unwrap();
    assert_eq!(store.snapshot().pending_count(), 0);
}

#[tokio::test]
async fn processor_stops_on_shutdown_with_challenge_pending() {
    let platform = Arc::new(NullPlatform::new(BOT));
    let store = Arc::new(NullStore::new());
    let (tx, rx) = transition_channel();
    let gate = Gatekeeper::open(
        GateConfig::default(),
        store.clone(),
        platform.clone(),
        Arc::new(TokioScheduler::new(tx.clone())),
        Arc::new(SystemClock),
    )
    .unwrap();

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let processor = tokio::spawn(TransitionProcessor::new(gate, rx).run(shutdown_rx));

    tx.send(Transition::Join(JoinEvent {
        chat: CHAT,
        message_id: MessageId::new(3),
        users: vec![JoiningUser {
            id: ANN,
            display_name: None,
            is_bot: false,
        }],
    }))
    .await
    .unwrap();
    wait_until(|| platform.sent().len() == 1).await;

    shutdown_tx.send(()).unwrap();
    let mut gate = processor.await.unwrap();
    gate.close().await.unwrap();

    // The challenge survives shutdown for the next process to restore.
    assert_eq!(store.snapshot().pending_count(), 1);
    assert!(platform.banned().is_empty());
    assert!(platform.sent()[0].text.contains("[Absolute Student](tg://user?id=42)"));
}

#[tokio::test]
async fn queued_transitions_are_drained_before_stopping() {
    let platform = Arc::new(NullPlatform::new(BOT));
    let (tx, rx) = transition_channel();
    let gate = Gatekeeper::open(
        GateConfig::default(),
        Arc::new(NullStore::new()),
        platform.clone(),
        Arc::new(TokioScheduler::new(tx.clone())),
        Arc::new(SystemClock),
    )
    .unwrap();

    for (message, user) in [(3, 42), (4, 43)] {
        tx.send(Transition::Join(JoinEvent {
            chat: CHAT,
            message_id: MessageId::new(message),
            users: vec![JoiningUser {
                id: UserId::new(user),
                display_name: None,
                is_bot: false,
            }],
        }))
        .await
        .unwrap();
    }

    // Shutdown is already pending when the processor starts.
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    shutdown_tx.send(()).unwrap();
    let gate = TransitionProcessor::new(gate, rx).run(shutdown_rx).await;

    assert_eq!(gate.registry().pending_count(), 2);
    assert_eq!(platform.sent().len(), 2);
}
