use std::sync::{Arc, OnceLock};
use std::time::Instant;

/// Source of monotonic nanosecond timestamps.
///
/// Publisher and subscriber must read the same time base, since latency is
/// the difference of a send stamp and an arrival stamp.
pub trait MonotonicClock: Send + Sync {
    fn now_nanos(&self) -> i64;
}

static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Production clock: nanoseconds since the first read in this process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl MonotonicClock for SystemClock {
    fn now_nanos(&self) -> i64 {
        EPOCH.get_or_init(Instant::now).elapsed().as_nanos() as i64
    }
}

impl<C: MonotonicClock + ?Sized> MonotonicClock for &C {
    fn now_nanos(&self) -> i64 {
        (**self).now_nanos()
    }
}

impl<C: MonotonicClock + ?Sized> MonotonicClock for Arc<C> {
    fn now_nanos(&self) -> i64 {
        (**self).now_nanos()
    }
}
