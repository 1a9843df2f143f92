//! Chat membership status.

use serde::{Deserialize, Serialize};

/// A user's current status in a chat, as reported by the platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    /// Owner of the chat.
    Creator,
    Administrator,
    /// Ordinary member.
    Member,
    /// Member with restricted permissions.
    Restricted,
    /// Not a member (never joined or left on their own).
    Left,
    /// Removed by an administrator.
    Kicked,
}

impl MemberStatus {
    /// Creator or administrator. Elevated members are exempt from verification.
    pub fn is_elevated(&self) -> bool {
        matches!(self, Self::Creator | Self::Administrator)
    }

    /// Whether this is the plain `member` status the challenge applies to.
    pub fn is_ordinary_member(&self) -> bool {
        matches!(self, Self::Member)
    }

    /// Still in the chat without privileges, so an expired challenge removes them.
    pub fn is_removable(&self) -> bool {
        matches!(self, Self::Member | Self::Restricted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Creator => "creator",
            Self::Administrator => "administrator",
            Self::Member => "member",
            Self::Restricted => "restricted",
            Self::Left => "left",
            Self::Kicked => "kicked",
        }
    }
}
