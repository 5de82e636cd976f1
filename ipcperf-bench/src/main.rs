use clap::Parser;
use ipcperf_bench::clock::SystemClock;
use ipcperf_bench::config::{Args, BenchConfig, ReportFormat};
use ipcperf_bench::publisher;
use ipcperf_bench::report::{self, CsvHeaderView, CsvView, NoDataView, TableView};
use ipcperf_bench::stats::{self, Analysis, QUANTILES};
use ipcperf_bench::subscriber::Subscriber;
use ipcperf_common::IpcPerfError;
use ipcperf_transport::{IgnoreCallbacks, LoopbackBus, Transport};
use std::io::Write;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing();

    let config = BenchConfig::from_args(&args).unwrap_or_else(|e| fatal("Invalid arguments", e));

    println!(
        "Will publish {} messages of size {} at a rate of {} msg/s into {} buckets of {} ns, using {} buffers",
        config.publish.message_count,
        config.publish.message_size,
        config.publish.rate,
        config.histogram.bucket_count,
        config.histogram.bucket_width_ns,
        if config.transport.direct_buffers { "pooled" } else { "per-message" },
    );

    let bus = LoopbackBus::new();
    let subscriber = Arc::new(Subscriber::new(SystemClock, &config.subscribe));

    let mut sub_session = bus.session(config.transport.clone(), subscriber.clone());
    sub_session.connect().unwrap_or_else(|e| fatal("Subscriber connect failed", e));
    sub_session
        .subscribe(&config.publish.topic)
        .unwrap_or_else(|e| fatal("Subscribe failed", e));

    let mut pub_session = bus.session(config.transport.clone(), Arc::new(IgnoreCallbacks));
    pub_session.connect().unwrap_or_else(|e| fatal("Publisher connect failed", e));

    // Give the subscriber time to settle before the first send.
    tokio::time::sleep(config.settle).await;

    print!("Publishing ");
    std::io::stdout().flush().ok();

    let dot_handle = tokio::spawn(async {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        interval.tick().await; // consume the immediate first tick
        loop {
            interval.tick().await;
            print!(".");
            std::io::stdout().flush().ok();
        }
    });

    let publish = config.publish.clone();
    let (mut pub_session, result) = tokio::task::spawn_blocking(move || {
        let result = publisher::run(&mut pub_session, SystemClock, &publish);
        (pub_session, result)
    })
    .await
    .unwrap_or_else(|e| fatal("Publisher task failed", IpcPerfError::Transport(e.to_string())));

    dot_handle.abort();
    println!();

    let summary = result.unwrap_or_else(|e| fatal("Publisher failed", e));
    println!(
        "Sent {} messages in {:.3} seconds = {:.1} msg/second ({} send failures)",
        summary.sent,
        summary.elapsed.as_secs_f64(),
        summary.send_rate(),
        summary.send_failures,
    );

    // Let in-flight messages land before the subscriber sees the publisher go away.
    tokio::time::sleep(config.settle).await;
    if let Err(e) = pub_session.disconnect() {
        warn!(error = %e, "publisher disconnect failed");
    }

    let waiter = Arc::clone(&subscriber);
    let timeout = config.timeout;
    let completed = tokio::task::spawn_blocking(move || waiter.wait_for_completion(timeout))
        .await
        .unwrap_or(false);
    if !completed {
        warn!(timeout_secs = timeout.as_secs(), "run did not complete in time, analyzing what was captured");
    }
    if subscriber.failed() {
        warn!("collection ended early on a malformed payload");
    }

    let samples = subscriber.freeze();
    if let Err(e) = sub_session.disconnect() {
        warn!(error = %e, "subscriber disconnect failed");
    }
    if samples.dropped > 0 {
        warn!(dropped = samples.dropped, capacity = config.subscribe.capacity, "sample capacity exceeded");
    }

    println!(
        "\nReceived {} total messages.  Calculating buckets using 2nd half of measurements...\n",
        samples.len()
    );

    let analysis = stats::analyze(samples, &config.histogram, &QUANTILES);
    print_report(&config, &analysis);

    let exit_code = match analysis {
        Analysis::NoData { .. } => 1,
        Analysis::Measured(_) => 0,
    };
    process::exit(exit_code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_report(config: &BenchConfig, analysis: &Analysis) {
    match (config.format, analysis) {
        (ReportFormat::Json, _) => match report::to_json(analysis) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("Failed to serialize report: {e}"),
        },
        (_, Analysis::NoData { .. }) => println!("{}", NoDataView(analysis)),
        (ReportFormat::Csv, Analysis::Measured(report)) => {
            let flags = config.flags();
            println!("{}", CsvHeaderView { report, flags });
            println!("{}", CsvView { report, flags });
            println!();
        }
        (ReportFormat::Table, Analysis::Measured(report)) => {
            print!("{}", TableView(report));
            println!();
        }
    }
}

fn fatal(context: &str, err: IpcPerfError) -> ! {
    eprintln!("{context}: {err}");
    process::exit(3);
}
