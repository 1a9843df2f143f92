//! Results of the three transitions.
//!
//! Guard failures are ordinary outcomes, never errors: a replayed join event,
//! an exempt user or a foreign button press is expected traffic.

use antibot_types::{MemberStatus, MessageId, UserId};

/// Why a whole join event was not processed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JoinDecline {
    /// The chat is not on the allow-list.
    ChatNotManaged,
    /// The bot is not an administrator and could not remove anyone.
    BotNotAdmin,
    /// The bot's own status could not be read.
    BotStatusUnknown,
    /// The event's message id is at or below the chat's watermark.
    Replay { watermark: MessageId },
}

/// Why a single joining user was not put under verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// Bot accounts are not challenged.
    Bot,
    /// Creators and administrators are exempt.
    Elevated,
    /// The user is no longer an ordinary member (left, removed, restricted).
    NotMember(MemberStatus),
    /// The user's status could not be read.
    StatusUnknown,
    /// A challenge for this user is already running in the chat.
    AlreadyPending,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JoinOutcome {
    Declined(JoinDecline),
    Processed {
        admitted: Vec<UserId>,
        skipped: Vec<(UserId, SkipReason)>,
    },
}

impl JoinOutcome {
    /// Users put under verification by this event.
    pub fn admitted(&self) -> &[UserId] {
        match self {
            Self::Processed { admitted, .. } => admitted,
            Self::Declined(_) => &[],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// The presser was pending and is now verified.
    Verified,
    /// The presser has no matching challenge; they were shown an alert.
    Rejected,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExpireOutcome {
    /// The challenge was already resolved (or replaced); nothing happened.
    Stale,
    /// The user was removed from the chat.
    Removed,
    /// The user should have been removed but the platform refused.
    RemovalFailed,
    /// The user was no longer removable (left, removed, or promoted);
    /// only the challenge was cleaned up.
    Spared(MemberStatus),
}
