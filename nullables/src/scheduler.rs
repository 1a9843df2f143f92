//! Nullable scheduler: record armed timers instead of sleeping.

use antibot_registry::TimerHandle;
use antibot_verification::{ExpiryScheduler, ExpiryTick};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A timer armed through the [`NullScheduler`].
#[derive(Clone, Debug)]
pub struct ArmedTimer {
    pub tick: ExpiryTick,
    pub after: Duration,
    cancelled: Arc<AtomicBool>,
}

impl ArmedTimer {
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Timers never fire on their own. Tests read the armed ticks and feed them
/// to the gatekeeper when they want an expiry to happen.
#[derive(Default)]
pub struct NullScheduler {
    armed: Mutex<Vec<ArmedTimer>>,
}

impl NullScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every timer armed so far, in order.
    pub fn armed(&self) -> Vec<ArmedTimer> {
        self.armed.lock().unwrap().clone()
    }

    /// Ticks of timers that have not been cancelled.
    pub fn live(&self) -> Vec<ExpiryTick> {
        self.armed
            .lock()
            .unwrap()
            .iter()
            .filter(|t| !t.is_cancelled())
            .map(|t| t.tick)
            .collect()
    }

    /// The most recently armed timer.
    pub fn last(&self) -> Option<ArmedTimer> {
        self.armed.lock().unwrap().last().cloned()
    }
}

impl ExpiryScheduler for NullScheduler {
    fn arm(&self, tick: ExpiryTick, after: Duration) -> TimerHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        self.armed.lock().unwrap().push(ArmedTimer {
            tick,
            after,
            cancelled: cancelled.clone(),
        });
        TimerHandle::from_flag(cancelled)
    }
}
