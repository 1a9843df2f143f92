//! The root registry of managed chats.

use std::collections::HashSet;

use antibot_types::{ChatId, MessageId};
use serde::{Deserialize, Serialize};

use crate::{ChatRecord, PendingUser, RegistryError};

/// All managed chats, in the order they were first seen.
#[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    chats: Vec<ChatRecord>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chats(&self) -> impl Iterator<Item = &ChatRecord> {
        self.chats.iter()
    }

    pub fn chat_count(&self) -> usize {
        self.chats.len()
    }

    /// Total pending users across all chats.
    pub fn pending_count(&self) -> usize {
        self.chats.iter().map(ChatRecord::pending_count).sum()
    }

    pub fn find_chat(&self, chat: ChatId) -> Option<&ChatRecord> {
        self.chats.iter().find(|c| c.chat_id() == chat)
    }

    pub fn find_chat_mut(&mut self, chat: ChatId) -> Option<&mut ChatRecord> {
        self.chats.iter_mut().find(|c| c.chat_id() == chat)
    }

    /// Append a new chat with the given watermark. Chat ids are unique.
    pub fn add_chat(
        &mut self,
        chat: ChatId,
        initial_message_id: MessageId,
    ) -> Result<&mut ChatRecord, RegistryError> {
        if self.find_chat(chat).is_some() {
            return Err(RegistryError::DuplicateChat(chat));
        }
        self.chats.push(ChatRecord::new(chat, initial_message_id));
        let last = self.chats.len() - 1;
        Ok(&mut self.chats[last])
    }

    /// Replace the chat with the same id in place, keeping its position.
    /// Returns the record that was replaced.
    pub fn replace_chat(&mut self, updated: ChatRecord) -> Result<ChatRecord, RegistryError> {
        let slot = self
            .chats
            .iter_mut()
            .find(|c| c.chat_id() == updated.chat_id())
            .ok_or(RegistryError::ChatNotFound(updated.chat_id()))?;
        Ok(std::mem::replace(slot, updated))
    }

    /// Check the invariants a registry read from outside must hold: chat ids
    /// are unique, user ids are unique within a chat, and every identifier
    /// derives from its user's id.
    pub fn check_invariants(&self) -> Result<(), RegistryError> {
        let mut chats = HashSet::new();
        for chat in &self.chats {
            let chat_id = chat.chat_id();
            if !chats.insert(chat_id) {
                return Err(RegistryError::DuplicateChat(chat_id));
            }
            let mut users = HashSet::new();
            for user in chat.pending_users() {
                if !users.insert(user.id) {
                    return Err(RegistryError::DuplicateUser {
                        chat: chat_id,
                        user: user.id,
                    });
                }
                if !user.identifier().matches(user.id) {
                    return Err(RegistryError::IdentifierMismatch {
                        chat: chat_id,
                        user: user.id,
                    });
                }
            }
        }
        Ok(())
    }

    /// Every pending user with the chat it belongs to.
    pub fn pending_users_mut(&mut self) -> impl Iterator<Item = (ChatId, &mut PendingUser)> {
        self.chats.iter_mut().flat_map(|chat| {
            let id = chat.chat_id();
            chat.pending_users_mut().map(move |u| (id, u))
        })
    }

    /// Cancel every armed timer without removing any entry. Used at shutdown;
    /// the persisted deadlines carry the challenges over to the next start.
    pub fn cancel_all_timers(&mut self) {
        for (_, user) in self.pending_users_mut() {
            user.cancel_timer();
        }
    }
}
