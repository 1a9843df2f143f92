//! Bot API wire types and their translation into platform events.
//!
//! Only the fields the gatekeeper reads are modelled; serde ignores the rest.

use antibot_types::{
    ChatId, JoinEvent, JoiningUser, MemberStatus, MessageId, UserId, VerifyAction,
};
use serde::{Deserialize, Serialize};

use crate::{InlineButton, PlatformEvent, VERIFY_ACTION};

/// Envelope of every Bot API response.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub new_chat_members: Vec<User>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    /// Absent for buttons on inline-mode messages; carries only `chat` and
    /// `message_id` when the message is no longer accessible.
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatMember {
    pub status: MemberStatus,
}

#[derive(Debug, Deserialize)]
pub struct SentMessage {
    pub message_id: i64,
}

// ── Request bodies ─────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct GetUpdates<'a> {
    pub offset: i64,
    pub timeout: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    pub allowed_updates: &'a [&'a str],
}

#[derive(Debug, Serialize)]
pub struct GetChatMember {
    pub chat_id: i64,
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct SendMessage<'a> {
    pub chat_id: i64,
    pub text: &'a str,
    pub parse_mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup<'a>>,
}

#[derive(Debug, Serialize)]
pub struct InlineKeyboardMarkup<'a> {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton<'a>>>,
}

#[derive(Debug, Serialize)]
pub struct InlineKeyboardButton<'a> {
    pub text: &'a str,
    pub callback_data: &'a str,
}

impl<'a> InlineKeyboardMarkup<'a> {
    pub fn single(button: &'a InlineButton) -> Self {
        Self {
            inline_keyboard: vec![vec![InlineKeyboardButton {
                text: &button.text,
                callback_data: &button.action,
            }]],
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteMessage {
    pub chat_id: i64,
    pub message_id: i64,
}

#[derive(Debug, Serialize)]
pub struct BanChatMember {
    pub chat_id: i64,
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct UnbanChatMember {
    pub chat_id: i64,
    pub user_id: i64,
    pub only_if_banned: bool,
}

#[derive(Debug, Serialize)]
pub struct AnswerCallbackQuery<'a> {
    pub callback_query_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<&'a str>,
    pub show_alert: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_time: Option<u32>,
}

// ── Translation ────────────────────────────────────────────────────────

impl From<User> for JoiningUser {
    fn from(user: User) -> Self {
        let name = user.first_name.trim();
        Self {
            id: UserId::new(user.id),
            display_name: (!name.is_empty()).then(|| name.to_string()),
            is_bot: user.is_bot,
        }
    }
}

/// Translate an update into the event the gatekeeper cares about, if any.
pub fn into_event(update: Update) -> Option<PlatformEvent> {
    if let Some(message) = update.message {
        if message.new_chat_members.is_empty() {
            return None;
        }
        return Some(PlatformEvent::MembersJoined(JoinEvent {
            chat: ChatId::new(message.chat.id),
            message_id: MessageId::new(message.message_id),
            users: message
                .new_chat_members
                .into_iter()
                .map(JoiningUser::from)
                .collect(),
        }));
    }

    let query = update.callback_query?;
    if query.data.as_deref() != Some(VERIFY_ACTION) {
        return None;
    }
    let message = query.message?;
    Some(PlatformEvent::VerifyPressed(VerifyAction {
        action_id: query.id,
        chat: ChatId::new(message.chat.id),
        from: UserId::new(query.from.id),
    }))
}
