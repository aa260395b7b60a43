//! Two-phase progress tracker for a backend import job.
//!
//! Phase one shows a stepped estimate derived from a persisted timeline.
//! Phase two starts once the estimate has run out and polls the status
//! endpoint at a fixed interval until the job reaches a terminal status.

pub mod clock;
pub mod simulation;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::models::job::ImportJob;
use crate::models::progress::{Messages, Notification, ProgressSnapshot};
use crate::services::cache::CacheInvalidator;
use crate::services::notify::Notifier;
use crate::services::status::StatusSource;
use crate::services::storage::MetricsStore;
use clock::Clock;
use simulation::{remaining_wait, resume_progress, simulation_finished, SIMULATION_CAP};

/// Timer settings for a tracker.
#[derive(Debug, Clone, Copy)]
pub struct TrackerTiming {
    /// Estimate used when nothing is persisted yet.
    pub default_duration: Duration,
    pub simulation_tick: Duration,
    pub poll_interval: Duration,
}

impl Default for TrackerTiming {
    fn default() -> Self {
        Self {
            default_duration: Duration::from_millis(10_000),
            simulation_tick: Duration::from_millis(500),
            poll_interval: Duration::from_millis(3_000),
        }
    }
}

/// External collaborators of a tracker.
#[derive(Clone)]
pub struct TrackerDeps {
    pub status: Arc<dyn StatusSource>,
    pub store: Arc<dyn MetricsStore>,
    pub cache: Arc<dyn CacheInvalidator>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
}

/// Caller-supplied options for a tracker.
#[derive(Debug, Clone)]
pub struct TrackerOptions {
    /// Cache keys invalidated once the job is terminal.
    pub invalidate_keys: Vec<String>,
    /// Namespace for `<prefix>_duration` and `<prefix>_start_time`.
    pub storage_prefix: String,
    pub messages: Messages,
    pub timing: TrackerTiming,
}

impl TrackerOptions {
    pub fn new(storage_prefix: impl Into<String>) -> Self {
        Self {
            invalidate_keys: Vec::new(),
            storage_prefix: storage_prefix.into(),
            messages: Messages::default(),
            timing: TrackerTiming::default(),
        }
    }

    pub fn duration_key(&self) -> String {
        format!("{}_duration", self.storage_prefix)
    }

    pub fn start_time_key(&self) -> String {
        format!("{}_start_time", self.storage_prefix)
    }
}

/// Persisted simulation timeline, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeline {
    pub start_ms: i64,
    pub duration_ms: i64,
}

/// The three timers owned by a running tracker.
struct Timers {
    cancel: CancellationToken,
    simulation: JoinHandle<()>,
    wait: JoinHandle<()>,
    poll: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Timers {
    fn is_running(&self) -> bool {
        let poll_running = self
            .poll
            .lock()
            .map(|slot| slot.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false);
        !self.simulation.is_finished() || !self.wait.is_finished() || poll_running
    }

    fn release(self) {
        self.cancel.cancel();
        self.simulation.abort();
        self.wait.abort();
        // Holding the slot lock here keeps the wait timer from installing a
        // poll task after cancellation.
        match self.poll.lock() {
            Ok(mut slot) => {
                if let Some(handle) = slot.take() {
                    handle.abort();
                }
            }
            Err(poisoned) => {
                if let Some(handle) = poisoned.into_inner().take() {
                    handle.abort();
                }
            }
        }
    }
}

/// Drives the displayed progress of one import job.
pub struct ImportProgressTracker {
    job_id: String,
    deps: TrackerDeps,
    options: TrackerOptions,
    state: Arc<watch::Sender<ProgressSnapshot>>,
    timers: Option<Timers>,
}

impl ImportProgressTracker {
    /// Resume or initialise the persisted timeline and start the timers.
    ///
    /// An empty `job_id` yields an idle tracker with no timers.
    pub async fn start(
        job_id: impl Into<String>,
        deps: TrackerDeps,
        options: TrackerOptions,
    ) -> Self {
        let (tx, _) = watch::channel(ProgressSnapshot::default());
        let mut tracker = Self {
            job_id: job_id.into(),
            deps,
            options,
            state: Arc::new(tx),
            timers: None,
        };
        tracker.launch().await;
        tracker
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.state.subscribe()
    }

    /// Whether any of the simulation, wait or poll timers is still live.
    pub fn is_running(&self) -> bool {
        self.timers.as_ref().is_some_and(Timers::is_running)
    }

    /// Resolve once a terminal status has been observed.
    ///
    /// Returns `None` for an idle tracker, which never reaches one.
    pub async fn wait_for_terminal(&self) -> Option<ProgressSnapshot> {
        if self.timers.is_none() && !self.snapshot().is_terminal() {
            return None;
        }
        let mut rx = self.subscribe();
        let snapshot = rx.wait_for(ProgressSnapshot::is_terminal).await.ok()?;
        Some(snapshot.clone())
    }

    /// Release all three timers. Safe to call more than once.
    pub fn dispose(&mut self) {
        if let Some(timers) = self.timers.take() {
            timers.release();
            metrics::gauge!("import_trackers_active").decrement(1.0);
            tracing::debug!(job_id = %self.job_id, "Import tracker disposed");
        }
    }

    /// Point the tracker at another job, restarting both phases.
    ///
    /// The timeline is persisted per storage prefix. Switching from one job
    /// to a different one clears `<prefix>_start_time` so the new job starts
    /// its estimate from zero; re-setting the same id resumes it.
    pub async fn set_job_id(&mut self, job_id: impl Into<String>) {
        let job_id = job_id.into();
        if job_id == self.job_id && self.timers.is_some() {
            return;
        }
        self.dispose();
        if !self.job_id.is_empty() && job_id != self.job_id {
            let key = self.options.start_time_key();
            if let Err(e) = self.deps.store.remove(&key).await {
                tracing::warn!(key = %key, error = %e, "Failed to reset import start time");
            }
        }
        self.job_id = job_id;
        self.state.send_replace(ProgressSnapshot::default());
        self.launch().await;
    }

    async fn launch(&mut self) {
        if self.job_id.is_empty() {
            tracing::debug!("Empty import job id, tracker stays idle");
            return;
        }

        let timeline = load_timeline(
            self.deps.store.as_ref(),
            &self.options,
            self.deps.clock.as_ref(),
        )
        .await;

        let now = self.deps.clock.now_millis();
        let initial = resume_progress(now, timeline.start_ms, timeline.duration_ms);
        self.state.send_modify(|s| s.progress = initial);

        tracing::info!(
            job_id = %self.job_id,
            storage_prefix = %self.options.storage_prefix,
            duration_ms = timeline.duration_ms,
            elapsed_ms = (now - timeline.start_ms).max(0),
            progress = initial,
            "Import tracker started"
        );

        let cancel = CancellationToken::new();
        let simulation_cancel = cancel.child_token();

        let simulation = tokio::spawn(run_simulation(
            self.state.clone(),
            self.deps.clock.clone(),
            timeline,
            self.options.timing.simulation_tick,
            simulation_cancel.clone(),
        ));

        let poller = Arc::new(Poller {
            job_id: self.job_id.clone(),
            deps: self.deps.clone(),
            options: self.options.clone(),
            state: self.state.clone(),
            simulation_cancel,
        });
        let poll_slot = Arc::new(Mutex::new(None));
        let wait = tokio::spawn(run_wait(
            remaining_wait(now, timeline.start_ms, timeline.duration_ms),
            poller,
            poll_slot.clone(),
            cancel.clone(),
        ));

        self.timers = Some(Timers {
            cancel,
            simulation,
            wait,
            poll: poll_slot,
        });
        metrics::gauge!("import_trackers_active").increment(1.0);
    }
}

impl Drop for ImportProgressTracker {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Read the persisted timeline, writing defaults for missing values.
///
/// Store failures fall back to defaults so a broken store never blocks the
/// progress display.
pub async fn load_timeline(
    store: &dyn MetricsStore,
    options: &TrackerOptions,
    clock: &dyn Clock,
) -> Timeline {
    let default_duration =
        i64::try_from(options.timing.default_duration.as_millis()).unwrap_or(i64::MAX);
    let duration_ms =
        read_or_init(store, &options.duration_key(), default_duration, |v| v >= 0).await;
    let start_ms = read_or_init(store, &options.start_time_key(), clock.now_millis(), |_| true).await;
    Timeline {
        start_ms,
        duration_ms,
    }
}

async fn read_or_init(
    store: &dyn MetricsStore,
    key: &str,
    default: i64,
    valid: impl Fn(i64) -> bool,
) -> i64 {
    match store.get_i64(key).await {
        Ok(Some(value)) if valid(value) => value,
        Ok(_) => {
            if let Err(e) = store.set_i64(key, default).await {
                tracing::warn!(key = %key, error = %e, "Failed to persist import metric");
            }
            default
        }
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Failed to read import metric, using default");
            default
        }
    }
}

/// Simulation timer: recompute the stepped estimate every tick until the
/// estimated duration has elapsed.
async fn run_simulation(
    state: Arc<watch::Sender<ProgressSnapshot>>,
    clock: Arc<dyn Clock>,
    timeline: Timeline,
    tick: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }

        let now = clock.now_millis();
        let progress = resume_progress(now, timeline.start_ms, timeline.duration_ms);
        state.send_if_modified(|s| {
            if progress > s.progress {
                s.progress = progress;
                true
            } else {
                false
            }
        });

        if simulation_finished(now, timeline.start_ms, timeline.duration_ms) {
            state.send_modify(|s| {
                s.progress = s.progress.max(SIMULATION_CAP);
                s.simulation_done = true;
            });
            tracing::debug!("Import progress simulation finished");
            return;
        }
    }
}

/// Wait timer: hold polling back until the simulated duration has run out.
async fn run_wait(
    delay: Duration,
    poller: Arc<Poller>,
    slot: Arc<Mutex<Option<JoinHandle<()>>>>,
    cancel: CancellationToken,
) {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        _ = sleep(delay) => {}
    }

    let Ok(mut slot) = slot.lock() else {
        return;
    };
    if cancel.is_cancelled() {
        return;
    }
    tracing::debug!(job_id = %poller.job_id, "Starting import status polling");
    *slot = Some(tokio::spawn(run_polling(poller, cancel)));
}

/// Everything the poll timer needs, shared with the task.
struct Poller {
    job_id: String,
    deps: TrackerDeps,
    options: TrackerOptions,
    state: Arc<watch::Sender<ProgressSnapshot>>,
    simulation_cancel: CancellationToken,
}

impl Poller {
    /// Record a fetched snapshot. Returns true once the job is terminal.
    async fn apply(&self, job: ImportJob) -> bool {
        let terminal = job.is_terminal();
        tracing::debug!(
            job_id = %self.job_id,
            status = %job.status,
            processed = job.processed_records,
            total = job.total_records,
            "Import status received"
        );

        self.state.send_modify(|s| {
            s.history = Some(job.clone());
            if terminal {
                s.progress = 100.0;
                s.simulation_done = true;
            }
        });

        if !terminal {
            return false;
        }

        self.simulation_cancel.cancel();

        if !self.options.invalidate_keys.is_empty() {
            if let Err(e) = self.deps.cache.invalidate(&self.options.invalidate_keys).await {
                tracing::warn!(job_id = %self.job_id, error = %e, "Cache invalidation failed");
            }
        }

        if let Err(e) = self.deps.store.remove(&self.options.start_time_key()).await {
            tracing::warn!(job_id = %self.job_id, error = %e, "Failed to clear import start time");
        }

        let notification = self.options.messages.notification_for(&job);
        let outcome = match notification {
            Notification::Success { .. } => "success",
            Notification::Warning { .. } => "warning",
        };
        metrics::counter!("import_jobs_terminal_total", "outcome" => outcome).increment(1);
        tracing::info!(
            job_id = %self.job_id,
            status = %job.status,
            success_count = job.success_count,
            failed_count = job.failed_count,
            "Import job reached terminal status"
        );
        self.deps.notifier.notify(&self.job_id, notification);

        true
    }
}

/// Poll timer: fetch immediately, then every `poll_interval`, until terminal.
///
/// There is no attempt limit; a job that never resolves is polled until the
/// tracker is disposed.
async fn run_polling(poller: Arc<Poller>, cancel: CancellationToken) {
    let mut ticker = interval(poller.options.timing.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }

        metrics::counter!("import_status_polls_total").increment(1);
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            r = poller.deps.status.fetch_status(&poller.job_id) => r,
        };

        match result {
            Ok(job) => {
                if poller.apply(job).await {
                    return;
                }
            }
            Err(e) => {
                metrics::counter!("import_status_fetch_errors_total").increment(1);
                tracing::warn!(
                    job_id = %poller.job_id,
                    error = %e,
                    "Import status fetch failed, retrying on next tick"
                );
            }
        }
    }
}
