use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Count-down latch: waiters are released once `count_down` has been called
/// the configured number of times.
pub struct CompletionGate {
    remaining: Mutex<usize>,
    released: Condvar,
}

impl CompletionGate {
    pub fn new(count: usize) -> Self {
        Self { remaining: Mutex::new(count), released: Condvar::new() }
    }

    /// Consume one count. Extra calls once the gate is open are ignored.
    pub fn count_down(&self) {
        let mut remaining = self.remaining.lock();
        if *remaining == 0 {
            return;
        }
        *remaining -= 1;
        if *remaining == 0 {
            self.released.notify_all();
        }
    }

    pub fn remaining(&self) -> usize {
        *self.remaining.lock()
    }

    pub fn is_open(&self) -> bool {
        self.remaining() == 0
    }

    /// Block until the gate opens or `timeout` elapses.
    /// Returns `true` if the gate opened, `false` on timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut remaining = self.remaining.lock();
        while *remaining > 0 {
            if self.released.wait_until(&mut remaining, deadline).timed_out() {
                return *remaining == 0;
            }
        }
        true
    }
}
