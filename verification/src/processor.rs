//! Single-consumer transition queue.
//!
//! Join events, verify presses and expiry ticks all go through one bounded
//! channel and are applied to the [`Gatekeeper`] strictly one at a time, each
//! to completion (platform calls included) before the next starts.

use antibot_platform::PlatformEvent;
use antibot_types::{JoinEvent, VerifyAction};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, info_span, Instrument};

use crate::{ExpiryTick, Gatekeeper};

/// Capacity of the transition channel. Producers wait when it is full.
pub const TRANSITION_QUEUE_CAPACITY: usize = 1024;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    Join(JoinEvent),
    Verify(VerifyAction),
    Expire(ExpiryTick),
}

impl From<PlatformEvent> for Transition {
    fn from(event: PlatformEvent) -> Self {
        match event {
            PlatformEvent::MembersJoined(join) => Self::Join(join),
            PlatformEvent::VerifyPressed(action) => Self::Verify(action),
        }
    }
}

pub fn transition_channel() -> (mpsc::Sender<Transition>, mpsc::Receiver<Transition>) {
    mpsc::channel(TRANSITION_QUEUE_CAPACITY)
}

/// Drains the transition channel into a [`Gatekeeper`].
pub struct TransitionProcessor {
    gate: Gatekeeper,
    rx: mpsc::Receiver<Transition>,
}

impl TransitionProcessor {
    pub fn new(gate: Gatekeeper, rx: mpsc::Receiver<Transition>) -> Self {
        Self { gate, rx }
    }

    pub fn gate(&self) -> &Gatekeeper {
        &self.gate
    }

    /// Apply transitions until shutdown is signalled or every sender is gone,
    /// then hand the gatekeeper back for the final flush.
    ///
    /// On shutdown the transition in progress is finished and whatever is
    /// already queued is drained, so events whose updates have been
    /// acknowledged upstream are not lost. Stop the producers first.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> Gatekeeper {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    let drained = self.drain().await;
                    info!(
                        drained,
                        pending = self.gate.registry().pending_count(),
                        "transition processor stopping"
                    );
                    break;
                }
                next = self.rx.recv() => match next {
                    Some(transition) => self.apply(transition).await,
                    None => {
                        debug!("transition channel closed");
                        break;
                    }
                },
            }
        }
        self.gate
    }

    /// Apply everything currently queued without waiting for more.
    pub async fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(transition) = self.rx.try_recv() {
            self.apply(transition).await;
            applied += 1;
        }
        applied
    }

    /// Apply one transition. Errors are logged; the queue keeps going.
    pub async fn apply(&mut self, transition: Transition) {
        match transition {
            Transition::Join(event) => {
                let span = info_span!(
                    "join",
                    chat = %event.chat,
                    message = %event.message_id,
                    users = event.users.len()
                );
                match self.gate.on_join(event).instrument(span).await {
                    Ok(outcome) => debug!(?outcome, "join handled"),
                    Err(e) => error!(error = %e, "join transition failed"),
                }
            }
            Transition::Verify(action) => {
                let span = info_span!("verify", chat = %action.chat, user = %action.from);
                match self.gate.on_verify(action).instrument(span).await {
                    Ok(outcome) => debug!(?outcome, "verify handled"),
                    Err(e) => error!(error = %e, "verify transition failed"),
                }
            }
            Transition::Expire(tick) => {
                let span = info_span!("expire", chat = %tick.chat, user = %tick.user);
                match self.gate.on_expire(tick).instrument(span).await {
                    Ok(outcome) => debug!(?outcome, "expiry handled"),
                    Err(e) => error!(error = %e, "expire transition failed"),
                }
            }
        }
    }
}
