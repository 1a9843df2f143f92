use antibot_types::{ChatId, UserId};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("chat {0} is already registered")]
    DuplicateChat(ChatId),

    #[error("user {user} is already pending in chat {chat}")]
    DuplicateUser { chat: ChatId, user: UserId },

    #[error("chat {0} is not registered")]
    ChatNotFound(ChatId),

    #[error("identifier of user {user} in chat {chat} does not match the user id")]
    IdentifierMismatch { chat: ChatId, user: UserId },
}
