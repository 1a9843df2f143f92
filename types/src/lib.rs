//! Fundamental types for the antibot gatekeeper.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! platform identifiers, the verification identifier codec, timestamps and clocks,
//! membership statuses, and the inbound events the state machine consumes.

pub mod events;
pub mod identifier;
pub mod ids;
pub mod member;
pub mod time;

pub use events::{JoinEvent, JoiningUser, VerifyAction};
pub use identifier::Identifier;
pub use ids::{ChatId, MessageId, UserId};
pub use member::MemberStatus;
pub use time::{Clock, SystemClock, Timestamp};
