//! Per-chat record of pending users.

use antibot_types::{ChatId, MessageId, UserId};
use serde::{Deserialize, Serialize};

use crate::{PendingUser, RegistryError};

/// Pending users of one managed chat plus its join-event watermark.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
    chat_id: ChatId,
    pending_users: Vec<PendingUser>,
    latest_message_id: MessageId,
}

impl ChatRecord {
    pub fn new(chat_id: ChatId, latest_message_id: MessageId) -> Self {
        Self {
            chat_id,
            pending_users: Vec::new(),
            latest_message_id,
        }
    }

    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    /// Id of the newest join event already processed in this chat.
    pub fn latest_message_id(&self) -> MessageId {
        self.latest_message_id
    }

    /// Whether a join event with this message id was already processed.
    pub fn has_processed(&self, message_id: MessageId) -> bool {
        message_id <= self.latest_message_id
    }

    /// Move the watermark forward. Never moves it backwards; returns whether
    /// it changed.
    pub fn advance_watermark(&mut self, message_id: MessageId) -> bool {
        if message_id > self.latest_message_id {
            self.latest_message_id = message_id;
            true
        } else {
            false
        }
    }

    pub fn pending_users(&self) -> impl Iterator<Item = &PendingUser> {
        self.pending_users.iter()
    }

    pub fn pending_users_mut(&mut self) -> impl Iterator<Item = &mut PendingUser> {
        self.pending_users.iter_mut()
    }

    pub fn pending_count(&self) -> usize {
        self.pending_users.len()
    }

    pub fn find_user(&self, user: UserId) -> Option<&PendingUser> {
        self.pending_users.iter().find(|u| u.id == user)
    }

    pub fn find_user_mut(&mut self, user: UserId) -> Option<&mut PendingUser> {
        self.pending_users.iter_mut().find(|u| u.id == user)
    }

    /// Append a pending user. Ids are unique within a chat.
    pub fn add_user(&mut self, pending: PendingUser) -> Result<&mut PendingUser, RegistryError> {
        if self.find_user(pending.id).is_some() {
            return Err(RegistryError::DuplicateUser {
                chat: self.chat_id,
                user: pending.id,
            });
        }
        self.pending_users.push(pending);
        let last = self.pending_users.len() - 1;
        Ok(&mut self.pending_users[last])
    }

    /// Remove the pending user with this id, cancelling its expiry timer in
    /// the same step.
    pub fn remove_user(&mut self, user: UserId) -> Option<PendingUser> {
        let index = self.pending_users.iter().position(|u| u.id == user)?;
        let mut removed = self.pending_users.remove(index);
        removed.cancel_timer();
        Some(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TimerHandle;
    use antibot_types::Timestamp;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn pending(id: i64) -> PendingUser {
        PendingUser::new(UserId::new(id), Some(format!("user{id}")), Timestamp::new(60))
    }

    #[test]
    fn duplicate_user_rejected() {
        let mut chat = ChatRecord::new(ChatId::new(-1), MessageId::ZERO);
        chat.add_user(pending(42)).unwrap();
        let err = chat.add_user(pending(42)).unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateUser {
                chat: ChatId::new(-1),
                user: UserId::new(42)
            }
        );
        assert_eq!(chat.pending_count(), 1);
    }

    #[test]
    fn remove_user_cancels_timer_and_keeps_others() {
        let mut chat = ChatRecord::new(ChatId::new(-1), MessageId::ZERO);
        let flag = Arc::new(AtomicBool::new(false));
        chat.add_user(pending(1))
            .unwrap()
            .arm(TimerHandle::from_flag(flag.clone()));
        chat.add_user(pending(2)).unwrap();

        let removed = chat.remove_user(UserId::new(1)).unwrap();
        assert_eq!(removed.id, UserId::new(1));
        assert!(flag.load(Ordering::SeqCst));
        assert!(chat.find_user(UserId::new(1)).is_none());
        assert!(chat.find_user(UserId::new(2)).is_some());
        assert!(chat.remove_user(UserId::new(1)).is_none());
    }

    #[test]
    fn watermark_is_monotonic() {
        let mut chat = ChatRecord::new(ChatId::new(-1), MessageId::ZERO);
        assert!(chat.advance_watermark(MessageId::new(5)));
        assert!(!chat.advance_watermark(MessageId::new(3)));
        assert!(!chat.advance_watermark(MessageId::new(5)));
        assert_eq!(chat.latest_message_id(), MessageId::new(5));
        assert!(chat.has_processed(MessageId::new(5)));
        assert!(!chat.has_processed(MessageId::new(6)));
    }

    #[test]
    fn insertion_order_preserved() {
        let mut chat = ChatRecord::new(ChatId::new(-1), MessageId::ZERO);
        for id in [3, 1, 2] {
            chat.add_user(pending(id)).unwrap();
        }
        let ids: Vec<i64> = chat.pending_users().map(|u| u.id.as_i64()).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }
}
