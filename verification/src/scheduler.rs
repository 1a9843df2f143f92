//! Expiry timers.

use std::time::Duration;

use antibot_registry::TimerHandle;
use antibot_types::{ChatId, Timestamp, UserId};
use tokio::sync::mpsc;
use tracing::debug;

use crate::Transition;

/// Fired when a pending user's verification window closes.
///
/// The deadline identifies the challenge the timer was armed for; a tick
/// whose deadline no longer matches the registry entry is stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExpiryTick {
    pub chat: ChatId,
    pub user: UserId,
    pub deadline: Timestamp,
}

/// Arms one-shot expiry timers.
pub trait ExpiryScheduler: Send + Sync {
    /// Deliver `tick` after `after` has elapsed, unless the returned handle is
    /// cancelled first. A zero duration fires as soon as possible.
    fn arm(&self, tick: ExpiryTick, after: Duration) -> TimerHandle;
}

/// Timers as tokio tasks that post [`Transition::Expire`] back into the
/// transition channel.
#[derive(Clone)]
pub struct TokioScheduler {
    tx: mpsc::Sender<Transition>,
}

impl TokioScheduler {
    pub fn new(tx: mpsc::Sender<Transition>) -> Self {
        Self { tx }
    }
}

impl ExpiryScheduler for TokioScheduler {
    fn arm(&self, tick: ExpiryTick, after: Duration) -> TimerHandle {
        let tx = self.tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if tx.send(Transition::Expire(tick)).await.is_err() {
                debug!(chat = %tick.chat, user = %tick.user, "transition channel closed, expiry dropped");
            }
        });
        TimerHandle::from_task(task.abort_handle())
    }
}
