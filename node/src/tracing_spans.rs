//! Pre-built [`tracing::Span`] constructors for node-level operations.
//!
//! Transitions carry their own `join` / `verify` / `expire` spans inside the
//! processor; these cover the work around them.

use tracing::{info_span, Span};

/// Span covering one `getUpdates` long poll.
pub fn poll_span(offset: i64) -> Span {
    info_span!("poll", offset)
}

/// Span covering the hand-off of a polled batch to the transition queue.
pub fn dispatch_span(events: usize) -> Span {
    info_span!("dispatch", events)
}
