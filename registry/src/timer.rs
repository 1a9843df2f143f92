//! Cancellable handle to a pending user's expiry timer.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::AbortHandle;

/// Handle to an armed expiry timer.
///
/// Cancelling aborts the timer task (when there is one) and raises a shared
/// flag that whoever armed the timer can observe. Dropping the handle does
/// *not* cancel the timer; removal from the registry cancels explicitly.
pub struct TimerHandle {
    abort: Option<AbortHandle>,
    cancelled: Arc<AtomicBool>,
}

impl TimerHandle {
    /// Wrap the abort handle of a spawned timer task.
    pub fn from_task(abort: AbortHandle) -> Self {
        Self {
            abort: Some(abort),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A handle with no task behind it, observed through `flag`.
    pub fn from_flag(flag: Arc<AtomicBool>) -> Self {
        Self {
            abort: None,
            cancelled: flag,
        }
    }

    /// Cancel the timer. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(abort) = &self.abort {
            abort.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("task", &self.abort.is_some())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
