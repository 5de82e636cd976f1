use ipcperf_bench::clock::{MonotonicClock, SystemClock};
use ipcperf_bench::codec::decode;
use ipcperf_bench::publisher::{self, PublishConfig};
use ipcperf_bench::stats::{analyze, Analysis, HistogramConfig, QUANTILES};
use ipcperf_bench::subscriber::{Subscriber, SubscriberConfig};
use ipcperf_common::{Result, SessionEvent, SessionEventKind};
use ipcperf_transport::{IgnoreCallbacks, LoopbackBus, SessionCallbacks, Transport, TransportConfig};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

const HIST: HistogramConfig = HistogramConfig { bucket_width_ns: 1_000, bucket_count: 10 };
const RUN_TIMEOUT: Duration = Duration::from_secs(30);

// --- Test helpers ---

/// Publisher-side synthetic clock: advances `step` ns per read.
struct StepClock {
    now: AtomicI64,
    step: i64,
}

impl MonotonicClock for StepClock {
    fn now_nanos(&self) -> i64 {
        self.now.fetch_add(self.step, Ordering::Relaxed)
    }
}

/// Subscriber-side clock the transport sets right before each delivery.
struct ManualClock(AtomicI64);

impl MonotonicClock for ManualClock {
    fn now_nanos(&self) -> i64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Delivers every send synchronously, arriving exactly `latency_ns` after its send stamp.
struct FixedLatencyTransport {
    subscriber: Arc<Subscriber<Arc<ManualClock>>>,
    arrival_clock: Arc<ManualClock>,
    latency_ns: i64,
}

impl Transport for FixedLatencyTransport {
    fn connect(&mut self) -> Result<()> {
        self.subscriber.on_session_event(&SessionEvent::new(SessionEventKind::UpNotice, "up"));
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        self.subscriber.on_session_event(&SessionEvent::new(SessionEventKind::PeerDown, "publisher gone"));
        Ok(())
    }

    fn subscribe(&mut self, _topic: &str) -> Result<()> {
        Ok(())
    }

    fn send(&mut self, _destination: &str, payload: &[u8]) -> Result<()> {
        let sent_at = decode(payload)?;
        self.arrival_clock.0.store(sent_at + self.latency_ns, Ordering::Relaxed);
        self.subscriber.on_deliver(payload);
        Ok(())
    }
}

fn publish_config(message_count: u64, message_size: usize, rate: u64) -> PublishConfig {
    PublishConfig { topic: "aaa".to_string(), message_count, message_size, rate }
}

// --- Synthetic end to end ---

#[test]
fn test_fixed_latency_run_reports_exact_latency() {
    let arrival_clock = Arc::new(ManualClock(AtomicI64::new(0)));
    let subscriber = Arc::new(Subscriber::new(
        Arc::clone(&arrival_clock),
        &SubscriberConfig { capacity: 2_000, scratch_len: 256, expected: None },
    ));
    let mut transport = FixedLatencyTransport {
        subscriber: Arc::clone(&subscriber),
        arrival_clock,
        latency_ns: 5_000,
    };
    let pub_clock = StepClock { now: AtomicI64::new(0), step: 1_000 };

    transport.connect().unwrap();
    let summary = publisher::run(&mut transport, &pub_clock, &publish_config(1_000, 100, 1_000)).unwrap();
    transport.disconnect().unwrap();

    assert_eq!(summary.sent, 1_000);
    assert!(subscriber.wait_for_completion(Duration::ZERO));

    let report = match analyze(subscriber.freeze(), &HIST, &QUANTILES) {
        Analysis::Measured(report) => report,
        other => panic!("expected a report, got {other:?}"),
    };
    assert_eq!(report.received, 1_000);
    assert_eq!(report.count, 500);
    assert_eq!(report.min_ns, 5_000);
    assert_eq!(report.max_ns, 5_000);
    for q in QUANTILES {
        assert_eq!(report.percentile(q), Some(5_000), "quantile {q}");
    }
    // 5000ns sits exactly on the lower edge of bucket 5.
    assert_eq!(report.histogram[5], 500);
    let rate = report.achieved_rate.unwrap();
    assert!((rate - 1_000.0).abs() < 1.0, "rate = {rate}");
}

// --- Loopback bus ---

fn loopback_run(size: usize, count: u64, config: TransportConfig) -> (Analysis, publisher::PublishSummary) {
    let bus = LoopbackBus::new();
    let expected = if size >= 8 { Some(count as usize) } else { None };
    let subscriber = Arc::new(Subscriber::new(
        SystemClock,
        &SubscriberConfig { capacity: 10_000, scratch_len: 1_024, expected },
    ));

    let mut sub_session = bus.session(config.clone(), subscriber.clone());
    sub_session.connect().unwrap();
    sub_session.subscribe("aaa").unwrap();

    let mut pub_session = bus.session(config, Arc::new(IgnoreCallbacks));
    pub_session.connect().unwrap();
    let summary = publisher::run(&mut pub_session, SystemClock, &publish_config(count, size, 20_000)).unwrap();
    pub_session.disconnect().unwrap();

    assert!(subscriber.wait_for_completion(RUN_TIMEOUT), "run did not complete");
    let samples = subscriber.freeze();
    sub_session.disconnect().unwrap();
    (analyze(samples, &HIST, &QUANTILES), summary)
}

#[test]
fn test_loopback_run_measures_every_message() {
    for config in [
        TransportConfig::default(),
        TransportConfig { thread_spin: true, direct_buffers: true, ..TransportConfig::default() },
    ] {
        let (analysis, summary) = loopback_run(100, 400, config);
        assert_eq!(summary.send_failures, 0);
        let Analysis::Measured(report) = analysis else {
            panic!("expected a report");
        };
        assert_eq!(report.received, 400);
        assert_eq!(report.count, 200);
        assert_eq!(report.payload_size, 100);
        assert!(report.min_ns >= 0);
        assert!(report.min_ns <= report.max_ns);
        assert_eq!(report.histogram.iter().sum::<u64>(), 200);
    }
}

#[test]
fn test_payload_below_timestamp_width_yields_no_data() {
    let (analysis, summary) = loopback_run(4, 50, TransportConfig::default());
    assert_eq!(summary.sent, 50);
    // The publisher disconnect (PeerDown) ends the run; every arrival is unstamped.
    assert_eq!(analysis, Analysis::NoData { dropped: 0, unstamped: 50 });
}

#[test]
fn test_run_without_subscriber_is_no_data() {
    let bus = LoopbackBus::new();
    let mut pub_session = bus.session(TransportConfig::default(), Arc::new(IgnoreCallbacks));
    pub_session.connect().unwrap();
    let summary = publisher::run(&mut pub_session, SystemClock, &publish_config(20, 64, 50_000)).unwrap();
    assert_eq!(summary.sent, 20);

    let subscriber = Subscriber::new(SystemClock, &SubscriberConfig { capacity: 16, scratch_len: 64, expected: None });
    assert!(!subscriber.wait_for_completion(Duration::from_millis(10)));
    assert!(matches!(analyze(subscriber.freeze(), &HIST, &QUANTILES), Analysis::NoData { .. }));
}

// --- Async orchestration, as the binary drives it ---

#[tokio::test]
async fn test_blocking_publisher_task_with_async_gate_wait() {
    let bus = LoopbackBus::new();
    let subscriber = Arc::new(Subscriber::new(
        SystemClock,
        &SubscriberConfig { capacity: 1_000, scratch_len: 256, expected: Some(100) },
    ));
    let mut sub_session = bus.session(TransportConfig::default(), subscriber.clone());
    sub_session.connect().unwrap();
    sub_session.subscribe("aaa").unwrap();

    let mut pub_session = bus.session(TransportConfig::default(), Arc::new(IgnoreCallbacks));
    pub_session.connect().unwrap();

    let publish = publish_config(100, 32, 10_000);
    let (mut pub_session, result) = tokio::task::spawn_blocking(move || {
        let result = publisher::run(&mut pub_session, SystemClock, &publish);
        (pub_session, result)
    })
    .await
    .unwrap();
    assert_eq!(result.unwrap().sent, 100);

    let waiter = Arc::clone(&subscriber);
    let completed = tokio::task::spawn_blocking(move || waiter.wait_for_completion(RUN_TIMEOUT))
        .await
        .unwrap();
    assert!(completed);

    pub_session.disconnect().unwrap();
    let analysis = analyze(subscriber.freeze(), &HIST, &QUANTILES);
    sub_session.disconnect().unwrap();
    assert!(matches!(analysis, Analysis::Measured(ref r) if r.received == 100 && r.count == 50));
}
