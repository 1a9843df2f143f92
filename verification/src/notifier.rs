//! User-facing text and the outbound calls that carry it.
//!
//! Messages are MarkdownV2 and mention the user with a `tg://user` link.
//! Display names come from the platform and are escaped before
//! interpolation; a name that is empty after sanitising, or that the platform
//! refuses to render, is replaced by [`PLACEHOLDER_NAME`].

use std::sync::Arc;
use std::time::Duration;

use antibot_platform::{ChatPlatform, InlineButton, PlatformError};
use antibot_types::{ChatId, MessageId, UserId};
use tracing::warn;

use crate::RemovalMode;

/// Name used when the platform-provided one is unavailable or unrenderable.
pub const PLACEHOLDER_NAME: &str = "Absolute Student";

/// Alert shown to someone pressing a verify button that is not theirs.
pub const REJECT_ALERT: &str = "You are not allowed to press this button!";

const MAX_NAME_CHARS: usize = 64;

/// Characters that must be backslash-escaped in MarkdownV2 text.
const MARKDOWN_SPECIAL: &[char] = &[
    '\\', '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.',
    '!',
];

pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if MARKDOWN_SPECIAL.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Sanitise a display name: strip control characters, trim, cap the length.
/// `None` when nothing printable is left.
pub fn render_name(name: Option<&str>) -> Option<String> {
    let cleaned: String = name?
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .chars()
        .take(MAX_NAME_CHARS)
        .collect();
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Human wording of a verification window, e.g. "1 minute" or "90 seconds".
pub fn format_window(window: Duration) -> String {
    let secs = window.as_secs();
    match secs {
        60 => "1 minute".to_string(),
        s if s >= 120 && s % 60 == 0 => format!("{} minutes", s / 60),
        1 => "1 second".to_string(),
        s => format!("{s} seconds"),
    }
}

fn mention(user: UserId, name: &str) -> String {
    format!("[{}](tg://user?id={})", escape_markdown(name), user)
}

/// Formats and sends everything the gatekeeper says in a chat.
pub struct Notifier {
    platform: Arc<dyn ChatPlatform>,
    window: Duration,
    removal: RemovalMode,
}

impl Notifier {
    pub fn new(platform: Arc<dyn ChatPlatform>, window: Duration, removal: RemovalMode) -> Self {
        Self {
            platform,
            window,
            removal,
        }
    }

    pub fn welcome_text(&self, mention: &str) -> String {
        format!(
            "Welcome to the chat, {mention} \\! It is an anti\\-bot system\\. \
             Please, verify yourself by pressing the button during *{}*, \
             otherwise you will be *{}*\\.",
            escape_markdown(&format_window(self.window)),
            self.removal.verb()
        )
    }

    pub fn verified_text(mention: &str) -> String {
        format!("{mention} has been verified\\!")
    }

    pub fn not_verified_text(mention: &str) -> String {
        format!("{mention} hasn't been verified\\!")
    }

    /// Send the welcome prompt with the verify button. Returns the prompt's id.
    pub async fn send_welcome(
        &self,
        chat: ChatId,
        user: UserId,
        name: Option<&str>,
    ) -> Result<MessageId, PlatformError> {
        let button = InlineButton::verify();
        self.send_mention(chat, user, name, |m| self.welcome_text(m), Some(&button))
            .await
    }

    pub async fn announce_verified(
        &self,
        chat: ChatId,
        user: UserId,
        name: Option<&str>,
    ) -> Result<MessageId, PlatformError> {
        self.send_mention(chat, user, name, Self::verified_text, None)
            .await
    }

    pub async fn announce_not_verified(
        &self,
        chat: ChatId,
        user: UserId,
        name: Option<&str>,
    ) -> Result<MessageId, PlatformError> {
        self.send_mention(chat, user, name, Self::not_verified_text, None)
            .await
    }

    pub async fn delete_prompt(
        &self,
        chat: ChatId,
        prompt: MessageId,
    ) -> Result<(), PlatformError> {
        self.platform.delete_message(chat, prompt).await
    }

    /// Show the transient "not allowed" alert to the presser.
    pub async fn reject_press(&self, action_id: &str) -> Result<(), PlatformError> {
        self.platform.answer_action(action_id, Some(REJECT_ALERT)).await
    }

    /// Acknowledge a successful press without showing anything.
    pub async fn acknowledge_press(&self, action_id: &str) -> Result<(), PlatformError> {
        self.platform.answer_action(action_id, None).await
    }

    /// Remove a user according to the configured [`RemovalMode`].
    pub async fn remove_member(&self, chat: ChatId, user: UserId) -> Result<(), PlatformError> {
        self.platform.ban_member(chat, user).await?;
        if self.removal == RemovalMode::Kick {
            self.platform.unban_member(chat, user).await?;
        }
        Ok(())
    }

    async fn send_mention<F>(
        &self,
        chat: ChatId,
        user: UserId,
        name: Option<&str>,
        render: F,
        button: Option<&InlineButton>,
    ) -> Result<MessageId, PlatformError>
    where
        F: Fn(&str) -> String + Sync,
    {
        let rendered = render_name(name);
        let first = render(&mention(user, rendered.as_deref().unwrap_or(PLACEHOLDER_NAME)));
        match self.platform.send_message(chat, &first, button).await {
            Err(e) if e.is_bad_request() && rendered.is_some() => {
                warn!(%chat, %user, error = %e, "message rejected, retrying with placeholder name");
                let fallback = render(&mention(user, PLACEHOLDER_NAME));
                self.platform.send_message(chat, &fallback, button).await
            }
            other => other,
        }
    }
}
