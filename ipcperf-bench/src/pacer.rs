use ipcperf_common::{IpcPerfError, Result};

use crate::clock::MonotonicClock;

pub const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Deadline scheduler for the publish loop.
///
/// Deadlines advance from the fixed schedule (`start + k * interval`), never
/// from the time a send actually happened, so a late iteration does not shift
/// the phase of every later send. The flip side: after falling behind,
/// [`wait`](RatePacer::wait) returns immediately until the schedule catches
/// up, so sends go out in a burst.
pub struct RatePacer<C> {
    clock: C,
    interval_ns: i64,
    next_deadline: i64,
}

impl<C: MonotonicClock> RatePacer<C> {
    /// Start a schedule of `rate` sends per second; the first deadline is now.
    pub fn start(clock: C, rate: u64) -> Result<Self> {
        if rate == 0 {
            return Err(IpcPerfError::InvalidConfig("rate must be greater than zero".to_string()));
        }
        let interval_ns = NANOS_PER_SEC / rate.min(NANOS_PER_SEC as u64) as i64;
        let next_deadline = clock.now_nanos();
        Ok(Self { clock, interval_ns, next_deadline })
    }

    pub fn interval_ns(&self) -> i64 {
        self.interval_ns
    }

    pub fn next_deadline(&self) -> i64 {
        self.next_deadline
    }

    /// Busy-poll the clock until the current deadline has passed; returns the
    /// observed time. Sleeping is too coarse for sub-millisecond intervals.
    pub fn wait(&self) -> i64 {
        loop {
            let now = self.clock.now_nanos();
            if now >= self.next_deadline {
                return now;
            }
            std::hint::spin_loop();
        }
    }

    /// Move to the next slot of the fixed schedule.
    pub fn advance(&mut self) {
        self.next_deadline += self.interval_ns;
    }
}
