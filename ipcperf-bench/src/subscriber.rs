use ipcperf_common::SessionEvent;
use ipcperf_transport::SessionCallbacks;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, info};

use crate::clock::MonotonicClock;
use crate::gate::CompletionGate;
use crate::recorder::{RecordOutcome, SampleRecorder, SampleSet};

/// One count for the session coming up, one for the event that ends the run.
pub const GATE_COUNT: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberConfig {
    pub capacity: usize,
    pub scratch_len: usize,
    /// Stop collecting once this many samples are recorded.
    pub expected: Option<usize>,
}

/// Delivery-side half of the benchmark.
///
/// The transport calls [`on_deliver`](SessionCallbacks::on_deliver) from its
/// delivery thread, one message at a time. The recorder sits behind an
/// uncontended lock only so the controlling thread can freeze it after the
/// run; the lock is not needed for correctness of `record` itself.
pub struct Subscriber<C> {
    clock: C,
    recorder: Mutex<SampleRecorder>,
    gate: CompletionGate,
    expected: Option<usize>,
    failed: AtomicBool,
}

impl<C: MonotonicClock> Subscriber<C> {
    pub fn new(clock: C, config: &SubscriberConfig) -> Self {
        Self {
            clock,
            recorder: Mutex::new(SampleRecorder::with_capacity(config.capacity, config.scratch_len)),
            gate: CompletionGate::new(GATE_COUNT),
            expected: config.expected,
            failed: AtomicBool::new(false),
        }
    }

    /// Wait for the run to end. Returns `false` if `timeout` elapsed first;
    /// the samples captured so far are still usable.
    pub fn wait_for_completion(&self, timeout: Duration) -> bool {
        self.gate.wait_timeout(timeout)
    }

    /// `true` once a malformed payload ended collection early.
    pub fn failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    pub fn recorded(&self) -> usize {
        self.recorder.lock().count()
    }

    /// Take the samples for analysis; later arrivals are dropped.
    pub fn freeze(&self) -> SampleSet {
        self.recorder.lock().freeze()
    }

    pub fn gate(&self) -> &CompletionGate {
        &self.gate
    }
}

impl<C: MonotonicClock + 'static> SessionCallbacks for Subscriber<C> {
    fn on_deliver(&self, payload: &[u8]) {
        let received_at = self.clock.now_nanos();
        if self.failed.load(Ordering::Relaxed) {
            return;
        }

        let mut recorder = self.recorder.lock();
        match recorder.record(received_at, payload) {
            Ok(RecordOutcome::Recorded) => {
                if self.expected == Some(recorder.count()) {
                    self.gate.count_down();
                }
            }
            Ok(RecordOutcome::Dropped | RecordOutcome::Unstamped) => {}
            Err(e) => {
                self.failed.store(true, Ordering::Release);
                drop(recorder);
                error!(error = %e, "malformed payload, ending collection");
                self.gate.count_down();
            }
        }
    }

    fn on_session_event(&self, event: &SessionEvent) {
        info!(event = event.kind.as_name(), info = %event.info, terminal = event.kind.is_terminal(), "session event");
        self.gate.count_down();
    }
}
