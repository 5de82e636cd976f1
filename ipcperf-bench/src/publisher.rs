use ipcperf_common::{IpcPerfError, Result};
use ipcperf_transport::Transport;
use std::time::Duration;
use tracing::{info, warn};

use crate::clock::MonotonicClock;
use crate::codec;
use crate::pacer::{RatePacer, NANOS_PER_SEC};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishConfig {
    pub topic: String,
    pub message_count: u64,
    pub message_size: usize,
    pub rate: u64,
}

/// What the publish loop did.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishSummary {
    pub sent: u64,
    pub send_failures: u64,
    /// First error a send returned, if any.
    pub first_error: Option<IpcPerfError>,
    pub elapsed: Duration,
}

impl PublishSummary {
    pub fn send_rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 { self.sent as f64 / secs } else { 0.0 }
    }
}

/// Publish `message_count` paced messages on `transport`.
///
/// Every message is stamped with the time the pacer released it. Send errors
/// are counted but never stop or delay the loop: the schedule keeps its
/// cadence regardless of what the transport reports.
pub fn run<T, C>(transport: &mut T, clock: C, config: &PublishConfig) -> Result<PublishSummary>
where
    T: Transport,
    C: MonotonicClock,
{
    let mut pacer = RatePacer::start(&clock, config.rate)?;
    let mut buf = vec![0u8; config.message_size];
    let mut send_failures = 0u64;
    let mut first_error = None;
    let start = pacer.next_deadline();

    info!(
        messages = config.message_count,
        size = config.message_size,
        rate = config.rate,
        interval_ns = pacer.interval_ns(),
        "publishing"
    );

    for _ in 0..config.message_count {
        let now = pacer.wait();
        let payload = codec::encode(&mut buf, now);
        if let Err(e) = transport.send(&config.topic, payload) {
            send_failures += 1;
            first_error.get_or_insert(e);
        }
        pacer.advance();
    }

    let elapsed_ns = (clock.now_nanos() - start).max(0);
    let summary = PublishSummary {
        sent: config.message_count,
        send_failures,
        first_error,
        elapsed: Duration::from_nanos(elapsed_ns as u64),
    };

    if summary.send_failures > 0 {
        warn!(
            failures = summary.send_failures,
            first_error = ?summary.first_error,
            "sends failed during the run"
        );
    }
    info!(
        sent = summary.sent,
        secs = elapsed_ns as f64 / NANOS_PER_SEC as f64,
        rate = summary.send_rate(),
        "publish complete"
    );
    Ok(summary)
}
