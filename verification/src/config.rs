//! Gatekeeper policy settings.

use antibot_types::ChatId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default verification window.
pub const DEFAULT_EXPIRY_WINDOW: Duration = Duration::from_secs(60);

/// How an unverified user is removed when their window expires.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemovalMode {
    /// Permanent ban.
    #[default]
    Ban,
    /// Ban immediately followed by an unban, so the user may rejoin.
    Kick,
}

impl RemovalMode {
    /// Past participle used in user-facing text.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Ban => "banned",
            Self::Kick => "kicked",
        }
    }
}

#[derive(Clone, Debug)]
pub struct GateConfig {
    /// Time a new member has to press "Verify".
    pub expiry_window: Duration,
    /// Chats the gatekeeper acts in. Empty means every chat the bot administers.
    pub allowed_chats: Vec<ChatId>,
    pub removal: RemovalMode,
}

impl GateConfig {
    /// Whether join events from `chat` are handled.
    pub fn manages(&self, chat: ChatId) -> bool {
        self.allowed_chats.is_empty() || self.allowed_chats.contains(&chat)
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            expiry_window: DEFAULT_EXPIRY_WINDOW,
            allowed_chats: Vec::new(),
            removal: RemovalMode::default(),
        }
    }
}
