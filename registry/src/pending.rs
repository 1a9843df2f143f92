//! A user whose verification is pending.

use antibot_types::{Identifier, MessageId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

use crate::TimerHandle;

/// One pending verification challenge in a chat.
#[derive(Debug, Serialize, Deserialize)]
pub struct PendingUser {
    pub id: UserId,
    /// Name used in user-facing messages, as supplied by the platform.
    pub display_name: Option<String>,
    identifier: Identifier,
    /// When the verification window closes.
    pub deadline: Timestamp,
    /// The welcome prompt carrying the verify button, once sent.
    #[serde(default)]
    pub prompt_message_id: Option<MessageId>,
    #[serde(skip)]
    expiry: Option<TimerHandle>,
}

impl PendingUser {
    /// A new pending entry. The identifier is derived from `id` here and
    /// never recomputed afterwards.
    pub fn new(id: UserId, display_name: Option<String>, deadline: Timestamp) -> Self {
        Self {
            id,
            display_name,
            identifier: Identifier::derive(id),
            deadline,
            prompt_message_id: None,
            expiry: None,
        }
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// Attach a freshly armed expiry timer, cancelling any previous one.
    pub fn arm(&mut self, handle: TimerHandle) {
        if let Some(previous) = self.expiry.replace(handle) {
            previous.cancel();
        }
    }

    /// Whether a live (armed, not cancelled) timer is attached.
    pub fn has_live_timer(&self) -> bool {
        self.expiry.as_ref().is_some_and(|h| !h.is_cancelled())
    }

    /// Cancel the attached timer, if any.
    pub fn cancel_timer(&mut self) {
        if let Some(handle) = self.expiry.take() {
            handle.cancel();
        }
    }
}

// Timer handles are runtime-only and excluded from equality.
impl PartialEq for PendingUser {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.display_name == other.display_name
            && self.identifier == other.identifier
            && self.deadline == other.deadline
            && self.prompt_message_id == other.prompt_message_id
    }
}

impl Eq for PendingUser {}
