//! New-member verification.
//!
//! Every user joining a managed chat gets a welcome prompt with a "Verify"
//! button and a fixed window to press it. Per (chat, user):
//!
//! ```text
//! Unseen ──join──▶ PendingVerification ──verify──▶ Verified
//!                           │
//!                           └──────expire─────▶ Expired
//! ```
//!
//! [`Gatekeeper`] owns the registry and performs the transitions;
//! [`TransitionProcessor`] feeds it join events, verify presses and expiry
//! ticks one at a time from a single channel, so the verify and expire paths
//! for the same user can never interleave.

pub mod config;
pub mod error;
pub mod event;
pub mod gate;
pub mod notifier;
pub mod outcomes;
pub mod processor;
pub mod scheduler;

pub use config::{GateConfig, RemovalMode};
pub use error::GateError;
pub use event::{EventBus, GateEvent};
pub use gate::Gatekeeper;
pub use notifier::Notifier;
pub use outcomes::{ExpireOutcome, JoinDecline, JoinOutcome, SkipReason, VerifyOutcome};
pub use processor::{transition_channel, Transition, TransitionProcessor};
pub use scheduler::{ExpiryScheduler, ExpiryTick, TokioScheduler};
