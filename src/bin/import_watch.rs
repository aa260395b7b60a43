use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use cmms_import::models::progress::{Messages, Notification, ProgressSnapshot};
use cmms_import::services::{
    cache::{CacheInvalidator, NoCache, RedisCache},
    notify::ChannelNotifier,
    status::HttpStatusClient,
    storage::{FileStore, MemoryStore, MetricsStore},
};
use cmms_import::tracker::{
    clock::MonotonicClock, ImportProgressTracker, TrackerDeps, TrackerOptions, TrackerTiming,
};

/// Follow one CMMS import job until it finishes.
#[derive(Debug, Parser)]
#[command(name = "import-watch", version)]
struct Args {
    /// Import job id returned by the upload endpoint
    job_id: String,

    /// Base URL of the CMMS backend API
    #[arg(long, env = "CMMS_API_URL")]
    api_url: String,

    /// Bearer token for the CMMS backend API
    #[arg(long, env = "CMMS_API_TOKEN")]
    api_token: Option<String>,

    /// Namespace for the persisted simulation timeline
    #[arg(long, default_value = "import")]
    prefix: String,

    /// JSON file keeping the timeline across runs; in-memory when omitted
    #[arg(long)]
    store: Option<PathBuf>,

    /// Redis URL of the shared cache to invalidate on completion
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,

    /// Cache key to invalidate on completion (repeatable)
    #[arg(long = "invalidate")]
    invalidate_keys: Vec<String>,

    /// Estimated import duration in milliseconds
    #[arg(long, default_value_t = 10_000)]
    duration_ms: u64,

    /// Polling interval in milliseconds
    #[arg(long, default_value_t = 3_000)]
    poll_interval_ms: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    dotenvy::dotenv().ok();
    let args = Args::parse();

    let status = match HttpStatusClient::new(&args.api_url, args.api_token.clone()) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("failed to initialize status client: {e}");
            return ExitCode::FAILURE;
        }
    };

    let store: Arc<dyn MetricsStore> = match &args.store {
        Some(path) => Arc::new(FileStore::new(path)),
        None => Arc::new(MemoryStore::new()),
    };

    let cache: Arc<dyn CacheInvalidator> = match &args.redis_url {
        Some(url) => match RedisCache::new(url) {
            Ok(cache) => Arc::new(cache),
            Err(e) => {
                eprintln!("failed to initialize Redis cache: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => Arc::new(NoCache),
    };

    let (notifier, mut notifications) = ChannelNotifier::new();
    let deps = TrackerDeps {
        status: Arc::new(status),
        store,
        cache,
        notifier: Arc::new(notifier),
        clock: Arc::new(MonotonicClock::new()),
    };

    let options = TrackerOptions {
        invalidate_keys: args.invalidate_keys.clone(),
        storage_prefix: args.prefix.clone(),
        messages: Messages::default(),
        timing: TrackerTiming {
            default_duration: Duration::from_millis(args.duration_ms),
            poll_interval: Duration::from_millis(args.poll_interval_ms.max(1)),
            ..TrackerTiming::default()
        },
    };

    let tracker = ImportProgressTracker::start(args.job_id.clone(), deps, options).await;
    if !tracker.is_running() {
        eprintln!("nothing to watch: empty job id");
        return ExitCode::FAILURE;
    }

    let mut progress = tracker.subscribe();
    let mut last_printed = -1.0;

    loop {
        let snapshot = progress.borrow_and_update().clone();
        print_progress(&snapshot, &mut last_printed);

        tokio::select! {
            Some((_, notification)) = notifications.recv() => {
                print_progress(&tracker.snapshot(), &mut last_printed);
                return match notification {
                    Notification::Success { message } => {
                        println!("{message}");
                        ExitCode::SUCCESS
                    }
                    Notification::Warning { message, .. } => {
                        println!("{message}");
                        if let Some(url) = snapshot_error_file(&tracker) {
                            println!("error report: {url}");
                        }
                        ExitCode::from(2)
                    }
                };
            }
            changed = progress.changed() => {
                if changed.is_err() {
                    return ExitCode::FAILURE;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                eprintln!("interrupted; rerun with the same --store to resume the timeline");
                return ExitCode::from(130);
            }
        }
    }
}

fn print_progress(snapshot: &ProgressSnapshot, last_printed: &mut f64) {
    if snapshot.progress == *last_printed {
        return;
    }
    *last_printed = snapshot.progress;
    match &snapshot.history {
        Some(job) => println!(
            "{:>5.1}%  {}  {}/{} rows",
            snapshot.progress, job.status, job.processed_records, job.total_records
        ),
        None => println!("{:>5.1}%", snapshot.progress),
    }
}

fn snapshot_error_file(tracker: &ImportProgressTracker) -> Option<String> {
    tracker.snapshot().history.and_then(|job| job.error_file_url)
}
