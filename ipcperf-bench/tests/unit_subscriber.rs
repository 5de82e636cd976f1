use ipcperf_bench::clock::MonotonicClock;
use ipcperf_bench::codec::encode;
use ipcperf_bench::subscriber::{Subscriber, SubscriberConfig, GATE_COUNT};
use ipcperf_common::{SessionEvent, SessionEventKind};
use ipcperf_transport::SessionCallbacks;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

// --- Test helpers ---

struct ManualClock(AtomicI64);

impl ManualClock {
    fn new(now: i64) -> Arc<Self> {
        Arc::new(Self(AtomicI64::new(now)))
    }

    fn set(&self, now: i64) {
        self.0.store(now, Ordering::Relaxed);
    }
}

impl MonotonicClock for ManualClock {
    fn now_nanos(&self) -> i64 {
        self.0.load(Ordering::Relaxed)
    }
}

fn subscriber(clock: &Arc<ManualClock>, capacity: usize, expected: Option<usize>) -> Subscriber<Arc<ManualClock>> {
    Subscriber::new(Arc::clone(clock), &SubscriberConfig { capacity, scratch_len: 256, expected })
}

fn payload(sent_at: i64) -> Vec<u8> {
    let mut buf = vec![0u8; 64];
    encode(&mut buf, sent_at).to_vec()
}

fn event(kind: SessionEventKind) -> SessionEvent {
    SessionEvent::new(kind, "test")
}

// --- Tests ---

#[test]
fn test_arrival_is_stamped_with_subscriber_clock() {
    let clock = ManualClock::new(0);
    let sub = subscriber(&clock, 16, None);

    clock.set(15_000);
    sub.on_deliver(&payload(10_000));
    clock.set(27_500);
    sub.on_deliver(&payload(20_000));

    let samples = sub.freeze();
    assert_eq!(samples.sent_at, vec![10_000, 20_000]);
    assert_eq!(samples.received_at, vec![15_000, 27_500]);
}

#[test]
fn test_up_and_terminal_events_open_the_gate() {
    let clock = ManualClock::new(0);
    let sub = subscriber(&clock, 16, None);
    assert_eq!(sub.gate().remaining(), GATE_COUNT);

    sub.on_session_event(&event(SessionEventKind::UpNotice));
    assert!(!sub.wait_for_completion(Duration::from_millis(10)));

    sub.on_session_event(&event(SessionEventKind::PeerDown));
    assert!(sub.wait_for_completion(Duration::ZERO));
}

#[test]
fn test_expected_count_ends_collection() {
    let clock = ManualClock::new(100);
    let sub = subscriber(&clock, 16, Some(3));
    sub.on_session_event(&event(SessionEventKind::UpNotice));

    for i in 0..3 {
        assert!(!sub.gate().is_open());
        sub.on_deliver(&payload(i));
    }
    assert!(sub.gate().is_open());
    assert_eq!(sub.recorded(), 3);
}

#[test]
fn test_malformed_payload_ends_collection_early() {
    let clock = ManualClock::new(100);
    let sub = subscriber(&clock, 16, None);
    sub.on_session_event(&event(SessionEventKind::UpNotice));
    sub.on_deliver(&payload(50));

    sub.on_deliver(&[1, 2, 3]);
    assert!(sub.failed());
    assert!(sub.gate().is_open());

    // Later arrivals are ignored once the stream is known to be corrupt.
    sub.on_deliver(&payload(60));
    assert_eq!(sub.freeze().sent_at, vec![50]);
}

#[test]
fn test_overflow_is_dropped_not_fatal() {
    let clock = ManualClock::new(100);
    let sub = subscriber(&clock, 2, None);
    for i in 0..5 {
        sub.on_deliver(&payload(i));
    }
    assert!(!sub.failed());
    let samples = sub.freeze();
    assert_eq!(samples.len(), 2);
    assert_eq!(samples.dropped, 3);
}
