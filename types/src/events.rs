//! Inbound platform events consumed by the verification state machine.

use crate::{ChatId, MessageId, UserId};

/// A user descriptor carried by a "new chat members" event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoiningUser {
    pub id: UserId,
    /// Platform display name; `None` when the platform did not supply one.
    pub display_name: Option<String>,
    pub is_bot: bool,
}

/// One or more users joined a chat.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinEvent {
    pub chat: ChatId,
    /// Id of the service message announcing the join; used as replay watermark.
    pub message_id: MessageId,
    pub users: Vec<JoiningUser>,
}

/// A user pressed the verify control.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifyAction {
    /// Platform handle used to answer the action (alert or silent ack).
    pub action_id: String,
    pub chat: ChatId,
    /// Id the platform reports for the clicking user.
    pub from: UserId,
}
