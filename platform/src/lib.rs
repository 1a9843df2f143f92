//! Chat-platform collaborator.
//!
//! The verification state machine talks to the chat platform only through the
//! [`ChatPlatform`] trait: read a member's status, send and delete messages,
//! remove members, and answer button presses. [`telegram`] implements it over
//! the Telegram Bot API and turns long-polled updates into [`PlatformEvent`]s.

pub mod error;
pub mod telegram;
pub mod types;

pub use error::PlatformError;
pub use telegram::{TelegramClient, TelegramConfig, UpdatePoller, DEFAULT_API_URL};
pub use types::{InlineButton, PlatformEvent, VERIFY_ACTION};

use antibot_types::{ChatId, MemberStatus, MessageId, UserId};
use async_trait::async_trait;

/// Outbound calls the gatekeeper needs from the chat platform.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// The bot's own user id.
    fn bot_id(&self) -> UserId;

    /// Current membership status of `user` in `chat`.
    async fn member_status(&self, chat: ChatId, user: UserId)
        -> Result<MemberStatus, PlatformError>;

    /// Send a MarkdownV2 message, optionally with a single inline button.
    async fn send_message(
        &self,
        chat: ChatId,
        text: &str,
        button: Option<&InlineButton>,
    ) -> Result<MessageId, PlatformError>;

    async fn delete_message(&self, chat: ChatId, message: MessageId)
        -> Result<(), PlatformError>;

    /// Remove `user` from `chat` and prevent them from rejoining.
    async fn ban_member(&self, chat: ChatId, user: UserId) -> Result<(), PlatformError>;

    /// Lift a ban so the user may rejoin later.
    async fn unban_member(&self, chat: ChatId, user: UserId) -> Result<(), PlatformError>;

    /// Answer a button press. `Some(text)` shows a transient alert to the
    /// presser; `None` acknowledges silently.
    async fn answer_action(&self, action_id: &str, alert: Option<&str>)
        -> Result<(), PlatformError>;
}
