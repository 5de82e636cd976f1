use clap::Parser;
use ipcperf_common::{
    IpcPerfError, Result, DEFAULT_BUCKET_COUNT, DEFAULT_BUCKET_WIDTH_NS, DEFAULT_MESSAGE_COUNT,
    DEFAULT_MESSAGE_SIZE, DEFAULT_RATE, DEFAULT_SAMPLE_CAPACITY, DEFAULT_TOPIC,
};
use ipcperf_transport::{TransportConfig, DEFAULT_QUEUE_DEPTH};
use std::time::Duration;

use crate::publisher::PublishConfig;
use crate::recorder::DEFAULT_SCRATCH_LEN;
use crate::report::RunFlags;
use crate::stats::HistogramConfig;
use crate::subscriber::SubscriberConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Table,
    Csv,
    Json,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "ipcperf", about = "Paced publish/subscribe latency benchmark")]
pub struct Args {
    /// Number of messages to publish
    #[arg(short = 'n', long = "messages", default_value_t = DEFAULT_MESSAGE_COUNT)]
    pub messages: u64,

    /// Payload size in bytes (below 8 sends no payload: throughput only)
    #[arg(short = 's', long = "size", default_value_t = DEFAULT_MESSAGE_SIZE)]
    pub size: usize,

    /// Target publish rate, messages per second
    #[arg(short = 'r', long = "rate", default_value_t = DEFAULT_RATE)]
    pub rate: u64,

    /// Recycle message buffers through a fixed pool
    #[arg(short = 'd', long = "direct")]
    pub direct: bool,

    /// Delivery thread spins instead of blocking
    #[arg(long = "ts", alias = "thread-spin")]
    pub thread_spin: bool,

    /// Histogram bucket width in nanoseconds
    #[arg(long = "lg", alias = "bucket-width", default_value_t = DEFAULT_BUCKET_WIDTH_NS)]
    pub bucket_width: u64,

    /// Number of histogram buckets
    #[arg(long = "lb", alias = "buckets", default_value_t = DEFAULT_BUCKET_COUNT)]
    pub buckets: usize,

    /// Print a CSV summary instead of the histogram table
    #[arg(long, conflicts_with = "json")]
    pub csv: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Sample buffer capacity
    #[arg(long, default_value_t = DEFAULT_SAMPLE_CAPACITY)]
    pub capacity: usize,

    /// Seconds to wait for the run to complete
    #[arg(long, default_value_t = 90)]
    pub timeout: u64,

    /// Topic to publish and subscribe on
    #[arg(long, default_value = DEFAULT_TOPIC)]
    pub topic: String,

    /// Pause before publishing and before disconnecting, milliseconds
    #[arg(long = "settle-ms", default_value_t = 100)]
    pub settle_ms: u64,
}

/// Validated run configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchConfig {
    pub publish: PublishConfig,
    pub subscribe: SubscriberConfig,
    pub histogram: HistogramConfig,
    pub transport: TransportConfig,
    pub format: ReportFormat,
    pub timeout: Duration,
    pub settle: Duration,
}

impl BenchConfig {
    pub fn from_args(args: &Args) -> Result<Self> {
        if args.rate == 0 {
            return Err(invalid("rate (-r) must be greater than zero"));
        }
        if args.bucket_width == 0 {
            return Err(invalid("bucket width (--lg) must be greater than zero"));
        }
        if args.buckets == 0 {
            return Err(invalid("bucket count (--lb) must be greater than zero"));
        }
        if args.bucket_width.checked_mul(args.buckets as u64).is_none() {
            return Err(invalid("histogram range (--lg * --lb) overflows 64-bit nanoseconds"));
        }
        if args.capacity == 0 {
            return Err(invalid("capacity must be greater than zero"));
        }
        if args.topic.is_empty() {
            return Err(invalid("topic must not be empty"));
        }

        let format = if args.csv {
            ReportFormat::Csv
        } else if args.json {
            ReportFormat::Json
        } else {
            ReportFormat::Table
        };

        let expected = usize::try_from(args.messages).ok().filter(|&n| n > 0 && args.size >= ipcperf_common::TIMESTAMP_LEN);

        Ok(Self {
            publish: PublishConfig {
                topic: args.topic.clone(),
                message_count: args.messages,
                message_size: args.size,
                rate: args.rate,
            },
            subscribe: SubscriberConfig {
                capacity: args.capacity,
                scratch_len: args.size.max(DEFAULT_SCRATCH_LEN),
                expected,
            },
            histogram: HistogramConfig { bucket_width_ns: args.bucket_width, bucket_count: args.buckets },
            transport: TransportConfig {
                thread_spin: args.thread_spin,
                direct_buffers: args.direct,
                queue_depth: DEFAULT_QUEUE_DEPTH,
            },
            format,
            timeout: Duration::from_secs(args.timeout),
            settle: Duration::from_millis(args.settle_ms),
        })
    }

    pub fn flags(&self) -> RunFlags {
        RunFlags {
            direct_buffers: self.transport.direct_buffers,
            thread_spin: self.transport.thread_spin,
        }
    }
}

fn invalid(msg: &str) -> IpcPerfError {
    IpcPerfError::InvalidConfig(msg.to_string())
}
