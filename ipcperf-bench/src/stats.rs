use serde::Serialize;

use crate::pacer::NANOS_PER_SEC;
use crate::recorder::SampleSet;

/// Quantiles reported for every run.
pub const QUANTILES: [f64; 5] = [0.50, 0.95, 0.99, 0.995, 0.999];

/// Histogram of `bucket_count` buckets `[k * w, (k + 1) * w)` plus one overflow bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HistogramConfig {
    pub bucket_width_ns: u64,
    pub bucket_count: usize,
}

impl HistogramConfig {
    /// Index of the bucket `delta_ns` falls in; `bucket_count` is the overflow bucket.
    /// Negative deltas (clock skew) land in bucket 0.
    pub fn bucket_for(&self, delta_ns: i64) -> usize {
        let bucket = delta_ns.max(0) as u64 / self.bucket_width_ns;
        if bucket >= self.bucket_count as u64 {
            self.bucket_count
        } else {
            bucket as usize
        }
    }

    /// Smallest delta that lands in the overflow bucket.
    pub fn overflow_threshold_ns(&self) -> u64 {
        self.bucket_width_ns.saturating_mul(self.bucket_count as u64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Percentile {
    pub quantile: f64,
    pub latency_ns: i64,
}

/// Latency statistics over the analyzed (post warm-up) half of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencyReport {
    /// Samples analyzed: the second half of everything received.
    pub count: usize,
    /// Samples received, warm-up included.
    pub received: usize,
    pub min_ns: i64,
    pub max_ns: i64,
    pub mean_ns: f64,
    pub histogram_config: HistogramConfig,
    /// `bucket_count + 1` counts; the last one is overflow.
    pub histogram: Vec<u64>,
    pub percentiles: Vec<Percentile>,
    /// Send rate over all received samples; `None` with fewer than two samples.
    pub achieved_rate: Option<f64>,
    pub payload_size: usize,
    pub dropped: u64,
}

impl LatencyReport {
    pub fn percentile(&self, quantile: f64) -> Option<i64> {
        self.percentiles
            .iter()
            .find(|p| p.quantile == quantile)
            .map(|p| p.latency_ns)
    }

    pub fn overflow(&self) -> u64 {
        self.histogram.last().copied().unwrap_or(0)
    }
}

/// Outcome of analyzing a run. A run that received nothing is its own outcome,
/// never a report with made-up numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Analysis {
    NoData { dropped: u64, unstamped: u64 },
    Measured(LatencyReport),
}

/// Index of quantile `p` in a sorted sequence of `n` values: `floor(n * p)`,
/// with no interpolation between ranks.
pub fn percentile_index(n: usize, p: f64) -> usize {
    let idx = (n as f64 * p).floor() as usize;
    idx.min(n.saturating_sub(1))
}

/// Send rate implied by the first and last send stamps, in messages per second.
pub fn achieved_rate(sent_at: &[i64]) -> Option<f64> {
    let (first, last) = (sent_at.first()?, sent_at.last()?);
    let span_ns = last.saturating_sub(*first);
    if sent_at.len() < 2 || span_ns <= 0 {
        return None;
    }
    Some((sent_at.len() - 1) as f64 / (span_ns as f64 / NANOS_PER_SEC as f64))
}

/// Consume a frozen sample set and compute its latency statistics.
///
/// The first half of the samples is discarded as warm-up. The send-stamp
/// buffer is reused to hold the deltas, so analysis allocates only the
/// histogram and percentile tables.
pub fn analyze(samples: SampleSet, histogram_config: &HistogramConfig, quantiles: &[f64]) -> Analysis {
    let received = samples.len();
    if received == 0 {
        return Analysis::NoData { dropped: samples.dropped, unstamped: samples.unstamped };
    }

    let achieved_rate = achieved_rate(&samples.sent_at);
    let SampleSet { sent_at: mut deltas, received_at, dropped, payload_size, .. } = samples;
    let half = received / 2;

    let mut histogram = vec![0u64; histogram_config.bucket_count + 1];
    let mut min_ns = i64::MAX;
    let mut max_ns = i64::MIN;
    let mut sum_ns: i128 = 0;
    for (slot, &arrival) in deltas[half..].iter_mut().zip(&received_at[half..]) {
        // Stamps come off the wire; a foreign one must not overflow.
        let delta = arrival.saturating_sub(*slot);
        min_ns = min_ns.min(delta);
        max_ns = max_ns.max(delta);
        sum_ns += delta as i128;
        histogram[histogram_config.bucket_for(delta)] += 1;
        *slot = delta;
    }

    deltas.drain(..half);
    deltas.sort_unstable();
    let count = deltas.len();

    let percentiles = quantiles
        .iter()
        .map(|&quantile| Percentile { quantile, latency_ns: deltas[percentile_index(count, quantile)] })
        .collect();

    Analysis::Measured(LatencyReport {
        count,
        received,
        min_ns,
        max_ns,
        mean_ns: sum_ns as f64 / count as f64,
        histogram_config: *histogram_config,
        histogram,
        percentiles,
        achieved_rate,
        payload_size,
        dropped,
    })
}
