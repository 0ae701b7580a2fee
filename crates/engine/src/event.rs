//! One-shot signal used for worker cancellation and completion.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Binary event which transitions from unset to set once and is never reset.
#[derive(Debug, Default)]
pub struct Event {
    set: Mutex<bool>,
    cond: Condvar,
}

impl Event {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the event and wake every waiter.
    ///
    /// Returns `false` if the event was already set.
    pub fn set(&self) -> bool {
        let mut set = self.set.lock();
        if *set {
            return false;
        }

        *set = true;
        self.cond.notify_all();
        true
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        *self.set.lock()
    }

    pub fn wait(&self) {
        let mut set = self.set.lock();
        while !*set {
            self.cond.wait(&mut set);
        }
    }

    /// Wait until the event is set or the timeout elapses.
    ///
    /// Returns `true` if the event is set. A timeout too large for a deadline waits forever.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            self.wait();
            return true;
        };

        let mut set = self.set.lock();
        while !*set {
            if self.cond.wait_until(&mut set, deadline).timed_out() {
                break;
            }
        }

        *set
    }
}
