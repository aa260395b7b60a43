use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::services::storage::RedisStore;
use crate::tracker::{ImportProgressTracker, TrackerDeps, TrackerTiming};

/// How long a finished tracker keeps serving its final snapshot.
pub const DEFAULT_FINISHED_RETENTION: Duration = Duration::from_secs(300);

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub deps: TrackerDeps,
    pub timing: TrackerTiming,
    pub default_success: Arc<str>,
    pub default_warning: Arc<str>,
    /// Checked by the health endpoint when present.
    pub redis: Option<Arc<RedisStore>>,
    /// Trackers hosted by this instance, keyed by job id.
    pub trackers: Arc<Mutex<HashMap<String, ImportProgressTracker>>>,
    /// Grace period before a terminal tracker is evicted from `trackers`.
    pub finished_retention: Duration,
}

impl AppState {
    pub fn new(
        deps: TrackerDeps,
        timing: TrackerTiming,
        default_success: &str,
        default_warning: &str,
    ) -> Self {
        Self {
            deps,
            timing,
            default_success: default_success.into(),
            default_warning: default_warning.into(),
            redis: None,
            trackers: Arc::new(Mutex::new(HashMap::new())),
            finished_retention: DEFAULT_FINISHED_RETENTION,
        }
    }

    pub fn with_finished_retention(mut self, retention: Duration) -> Self {
        self.finished_retention = retention;
        self
    }

    pub fn with_redis(mut self, redis: Arc<RedisStore>) -> Self {
        self.redis = Some(redis);
        self
    }
}
