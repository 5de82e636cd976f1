//! Rendering of an [`Analysis`]. Pure formatting: views borrow the report and
//! never change it.

use std::fmt;

use crate::stats::{Analysis, LatencyReport};

/// Configuration flags echoed in the CSV summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunFlags {
    pub direct_buffers: bool,
    pub thread_spin: bool,
}

impl RunFlags {
    fn buffer_label(&self) -> &'static str {
        if self.direct_buffers { "Direct Buffer" } else { "Non-Direct Buffer" }
    }

    fn thread_label(&self) -> &'static str {
        if self.thread_spin { "Thread Spin" } else { "Thread Blocking" }
    }
}

fn ns_to_us(ns: i64) -> f64 {
    ns as f64 / 1_000.0
}

/// `0.5` → `"50th%"`, `0.995` → `"99.5th%"`.
pub fn quantile_label(quantile: f64) -> String {
    let pct = format!("{:.1}", quantile * 100.0);
    format!("{}th%", pct.strip_suffix(".0").unwrap_or(&pct))
}

/// Histogram table followed by the min / percentile / max summary.
pub struct TableView<'a>(pub &'a LatencyReport);

impl fmt::Display for TableView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        let width = report.histogram_config.bucket_width_ns;
        let analyzed = report.count as f64;
        let buckets = report.histogram_config.bucket_count;

        let mut cumulative = 0u64;
        for (i, &n) in report.histogram[..buckets].iter().enumerate() {
            cumulative += n;
            let lo = width.saturating_mul(i as u64) as f64 / 1_000.0;
            let hi = width.saturating_mul(i as u64 + 1).saturating_sub(1) as f64 / 1_000.0;
            writeln!(
                f,
                "{:2}) [{:5.2}us-{:5.2}us] {:7}  |  {:5.2}%",
                i,
                lo,
                hi,
                n,
                cumulative as f64 * 100.0 / analyzed
            )?;
        }
        let over = report.overflow();
        writeln!(
            f,
            "{:2})        > {:5.2}us  {:7}  |  {:4.3}%",
            buckets,
            (report.histogram_config.overflow_threshold_ns().saturating_sub(1)) as f64 / 1_000.0,
            over,
            over as f64 * 100.0 / analyzed
        )?;
        writeln!(f, "=====================")?;
        writeln!(f, "{:>9}: {:7.2}us", "Min", ns_to_us(report.min_ns))?;
        for p in &report.percentiles {
            writeln!(f, "{:>9}: {:7.2}us", quantile_label(p.quantile), ns_to_us(p.latency_ns))?;
        }
        writeln!(f, "{:>9}: {:7.2}us", "Max", ns_to_us(report.max_ns))
    }
}

/// Column header matching [`CsvView`].
pub struct CsvHeaderView<'a> {
    pub report: &'a LatencyReport,
    pub flags: RunFlags,
}

impl fmt::Display for CsvHeaderView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = self.report.payload_size;
        let (buffer, thread) = (self.flags.buffer_label(), self.flags.thread_label());
        write!(f, "### Rate,Size,Allocate Direct,Thread Spin")?;
        write!(f, ",\"Min, {size}b, {buffer}, {thread}\"")?;
        for p in &self.report.percentiles {
            write!(f, ",\"{}, {size}b, {buffer}, {thread}\"", quantile_label(p.quantile))?;
        }
        Ok(())
    }
}

/// One CSV line: rate, payload size, the two flags, min and every percentile
/// in microseconds with three decimals.
pub struct CsvView<'a> {
    pub report: &'a LatencyReport,
    pub flags: RunFlags,
}

impl fmt::Display for CsvView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.report;
        let rate = report.achieved_rate.map(f64::round).unwrap_or(0.0) as u64;
        write!(
            f,
            "### {},{},{},{},{:.3}",
            rate,
            report.payload_size,
            self.flags.direct_buffers,
            self.flags.thread_spin,
            ns_to_us(report.min_ns)
        )?;
        for p in &report.percentiles {
            write!(f, ",{:.3}", ns_to_us(p.latency_ns))?;
        }
        Ok(())
    }
}

/// The "no data" outcome.
pub struct NoDataView<'a>(pub &'a Analysis);

impl fmt::Display for NoDataView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Analysis::NoData { dropped, unstamped } => write!(
                f,
                "No latency data: 0 stamped samples recorded (dropped: {dropped}, unstamped: {unstamped})"
            ),
            Analysis::Measured(report) => write!(f, "{} samples analyzed", report.count),
        }
    }
}

/// Pretty-printed JSON for either outcome.
pub fn to_json(analysis: &Analysis) -> serde_json::Result<String> {
    serde_json::to_string_pretty(analysis)
}
