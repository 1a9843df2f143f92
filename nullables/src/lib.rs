//! Nullable infrastructure for deterministic testing.
//!
//! Every external collaborator of the gatekeeper (clock, chat platform,
//! registry storage, expiry timers) sits behind a trait. This crate provides
//! test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically, including failure injection
//! - Record every outbound call for assertions
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod platform;
pub mod scheduler;
pub mod store;

pub use clock::NullClock;
pub use platform::{NullPlatform, SentMessage};
pub use scheduler::{ArmedTimer, NullScheduler};
pub use store::NullStore;
