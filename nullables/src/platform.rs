//! Nullable chat platform: record outbound calls without sending them.

use antibot_platform::{ChatPlatform, InlineButton, PlatformError};
use antibot_types::{ChatId, MemberStatus, MessageId, UserId};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

/// A message "sent" through the [`NullPlatform`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentMessage {
    pub id: MessageId,
    pub chat: ChatId,
    pub text: String,
    pub button: Option<InlineButton>,
}

/// A test platform that answers from configured state and records calls.
///
/// Unless configured otherwise the bot is an administrator everywhere and
/// every other user is an ordinary member.
pub struct NullPlatform {
    bot_id: UserId,
    statuses: Mutex<HashMap<(ChatId, UserId), MemberStatus>>,
    /// Methods that fail with a transport error.
    failing: Mutex<HashSet<&'static str>>,
    /// Messages containing any of these fragments are refused with HTTP 400.
    refused_fragments: Mutex<Vec<String>>,
    next_message_id: AtomicI64,
    sent: Mutex<Vec<SentMessage>>,
    deleted: Mutex<Vec<(ChatId, MessageId)>>,
    banned: Mutex<Vec<(ChatId, UserId)>>,
    unbanned: Mutex<Vec<(ChatId, UserId)>>,
    answered: Mutex<Vec<(String, Option<String>)>>,
}

impl NullPlatform {
    pub fn new(bot_id: UserId) -> Self {
        Self {
            bot_id,
            statuses: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            refused_fragments: Mutex::new(Vec::new()),
            next_message_id: AtomicI64::new(1000),
            sent: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            banned: Mutex::new(Vec::new()),
            unbanned: Mutex::new(Vec::new()),
            answered: Mutex::new(Vec::new()),
        }
    }

    pub fn set_status(&self, chat: ChatId, user: UserId, status: MemberStatus) {
        self.statuses.lock().unwrap().insert((chat, user), status);
    }

    /// Make `method` (a Bot API method name such as `"getChatMember"`) fail
    /// until [`NullPlatform::recover`] is called.
    pub fn fail(&self, method: &'static str) {
        self.failing.lock().unwrap().insert(method);
    }

    pub fn recover(&self, method: &'static str) {
        self.failing.lock().unwrap().remove(method);
    }

    /// Refuse, as a bad request, any message whose text contains `fragment`.
    pub fn refuse_text_containing(&self, fragment: &str) {
        self.refused_fragments
            .lock()
            .unwrap()
            .push(fragment.to_string());
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Texts of all messages sent to `chat`, in order.
    pub fn texts_in(&self, chat: ChatId) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.chat == chat)
            .map(|m| m.text.clone())
            .collect()
    }

    pub fn deleted(&self) -> Vec<(ChatId, MessageId)> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn banned(&self) -> Vec<(ChatId, UserId)> {
        self.banned.lock().unwrap().clone()
    }

    pub fn unbanned(&self) -> Vec<(ChatId, UserId)> {
        self.unbanned.lock().unwrap().clone()
    }

    /// Answered presses as `(action id, alert text)`.
    pub fn answered(&self) -> Vec<(String, Option<String>)> {
        self.answered.lock().unwrap().clone()
    }

    fn check(&self, method: &'static str) -> Result<(), PlatformError> {
        if self.failing.lock().unwrap().contains(method) {
            return Err(PlatformError::Unreachable(format!("{method} disabled")));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatPlatform for NullPlatform {
    fn bot_id(&self) -> UserId {
        self.bot_id
    }

    async fn member_status(
        &self,
        chat: ChatId,
        user: UserId,
    ) -> Result<MemberStatus, PlatformError> {
        self.check("getChatMember")?;
        let configured = self.statuses.lock().unwrap().get(&(chat, user)).copied();
        Ok(configured.unwrap_or(if user == self.bot_id {
            MemberStatus::Administrator
        } else {
            MemberStatus::Member
        }))
    }

    async fn send_message(
        &self,
        chat: ChatId,
        text: &str,
        button: Option<&InlineButton>,
    ) -> Result<MessageId, PlatformError> {
        self.check("sendMessage")?;
        let refused = self
            .refused_fragments
            .lock()
            .unwrap()
            .iter()
            .any(|fragment| text.contains(fragment.as_str()));
        if refused {
            return Err(PlatformError::Api {
                method: "sendMessage".into(),
                code: 400,
                description: "Bad Request: can't parse entities".into(),
            });
        }
        let id = MessageId::new(self.next_message_id.fetch_add(1, Ordering::SeqCst));
        self.sent.lock().unwrap().push(SentMessage {
            id,
            chat,
            text: text.to_string(),
            button: button.cloned(),
        });
        Ok(id)
    }

    async fn delete_message(&self, chat: ChatId, message: MessageId) -> Result<(), PlatformError> {
        self.check("deleteMessage")?;
        self.deleted.lock().unwrap().push((chat, message));
        Ok(())
    }

    async fn ban_member(&self, chat: ChatId, user: UserId) -> Result<(), PlatformError> {
        self.check("banChatMember")?;
        self.banned.lock().unwrap().push((chat, user));
        self.set_status(chat, user, MemberStatus::Kicked);
        Ok(())
    }

    async fn unban_member(&self, chat: ChatId, user: UserId) -> Result<(), PlatformError> {
        self.check("unbanChatMember")?;
        self.unbanned.lock().unwrap().push((chat, user));
        self.set_status(chat, user, MemberStatus::Left);
        Ok(())
    }

    async fn answer_action(
        &self,
        action_id: &str,
        alert: Option<&str>,
    ) -> Result<(), PlatformError> {
        self.check("answerCallbackQuery")?;
        self.answered
            .lock()
            .unwrap()
            .push((action_id.to_string(), alert.map(str::to_string)));
        Ok(())
    }
}
