//! Chat/user registry: the single mutable state of the gatekeeper.
//!
//! The [`Registry`] is an insertion-ordered list of [`ChatRecord`]s, each
//! holding the users whose verification is still pending in that chat.
//! Chats and pending users are bounded by real group sizes, so lookups are
//! plain linear scans.
//!
//! The registry is the root object persisted by the store. Everything in it
//! round-trips through serde except the live expiry timer attached to each
//! pending user; the persisted deadline is what lets a restarted process arm
//! a fresh timer for the remainder of the window.

pub mod chat;
pub mod error;
pub mod pending;
pub mod registry;
pub mod timer;

pub use chat::ChatRecord;
pub use error::RegistryError;
pub use pending::PendingUser;
pub use registry::Registry;
pub use timer::TimerHandle;
