//! Events emitted by the gatekeeper for observers (metrics, audit logs).

use antibot_types::{ChatId, UserId};

use crate::{ExpireOutcome, JoinDecline, SkipReason};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateEvent {
    /// A chat was seen for the first time and registered.
    ChatRegistered { chat: ChatId },
    JoinDeclined { chat: ChatId, reason: JoinDecline },
    /// A user was put under verification.
    UserAdmitted { chat: ChatId, user: UserId },
    UserSkipped {
        chat: ChatId,
        user: UserId,
        reason: SkipReason,
    },
    UserVerified { chat: ChatId, user: UserId },
    /// Someone without a matching challenge pressed "Verify".
    VerifyRejected { chat: ChatId, user: UserId },
    ChallengeExpired {
        chat: ChatId,
        user: UserId,
        outcome: ExpireOutcome,
    },
    /// Flushing the registry failed; memory is ahead of disk.
    PersistenceFailed,
    /// An outbound platform call failed.
    PlatformCallFailed { call: &'static str },
}

/// Synchronous fan-out event bus.
///
/// Listeners run inline inside the transition that emitted the event; keep
/// them fast.
pub struct EventBus {
    listeners: Vec<Box<dyn Fn(&GateEvent) + Send + Sync>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&GateEvent) + Send + Sync>) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &GateEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
