//! Test doubles for the tracker's collaborators and relay API helpers

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use cmms_import::models::job::ImportJob;
use cmms_import::models::progress::{Messages, Notification};
use cmms_import::services::cache::{CacheError, CacheInvalidator};
use cmms_import::services::notify::ChannelNotifier;
use cmms_import::services::status::{StatusError, StatusSource};
use cmms_import::services::storage::{MemoryStore, MetricsStore, StoreError};
use cmms_import::tracker::clock::MonotonicClock;
use cmms_import::tracker::{TrackerDeps, TrackerOptions, TrackerTiming};

use crate::fixtures::EPOCH_MS;

/// Status source replaying a script of responses.
///
/// The last scripted response repeats once the script runs out.
pub struct ScriptedStatus {
    script: Mutex<VecDeque<Result<ImportJob, u16>>>,
    last: Mutex<Option<Result<ImportJob, u16>>>,
    calls: AtomicUsize,
}

impl ScriptedStatus {
    pub fn new(script: Vec<Result<ImportJob, u16>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
        })
    }

    /// Always answer with the same snapshot.
    pub fn always(job: ImportJob) -> Arc<Self> {
        Self::new(vec![Ok(job)])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusSource for ScriptedStatus {
    async fn fetch_status(&self, _job_id: &str) -> Result<ImportJob, StatusError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        let response = match next {
            Some(r) => {
                *self.last.lock().unwrap() = Some(r.clone());
                r
            }
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .expect("status script is empty"),
        };
        response.map_err(StatusError::Status)
    }
}

/// Cache double recording every invalidation.
#[derive(Default)]
pub struct RecordingCache {
    pub calls: Mutex<Vec<Vec<String>>>,
}

impl RecordingCache {
    pub fn invalidations(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CacheInvalidator for RecordingCache {
    async fn invalidate(&self, keys: &[String]) -> Result<(), CacheError> {
        self.calls.lock().unwrap().push(keys.to_vec());
        Ok(())
    }
}

/// Store that answers like `MemoryStore` after a fixed delay per read.
pub struct SlowStore {
    inner: MemoryStore,
    delay: Duration,
}

impl SlowStore {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryStore::new(),
            delay,
        })
    }
}

#[async_trait]
impl MetricsStore for SlowStore {
    async fn get_i64(&self, key: &str) -> Result<Option<i64>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.get_i64(key).await
    }

    async fn set_i64(&self, key: &str, value: i64) -> Result<(), StoreError> {
        self.inner.set_i64(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(key).await
    }
}

/// Everything a tracker test needs to observe.
pub struct Harness {
    pub status: Arc<ScriptedStatus>,
    pub store: Arc<MemoryStore>,
    pub cache: Arc<RecordingCache>,
    pub notifications: mpsc::UnboundedReceiver<(String, Notification)>,
    pub deps: TrackerDeps,
}

impl Harness {
    /// Must be called inside a paused runtime so the clock follows it.
    pub fn new(status: Arc<ScriptedStatus>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(RecordingCache::default());
        let (notifier, notifications) = ChannelNotifier::new();
        let deps = TrackerDeps {
            status: status.clone(),
            store: store.clone(),
            cache: cache.clone(),
            notifier: Arc::new(notifier),
            clock: Arc::new(MonotonicClock::anchored_at(EPOCH_MS)),
        };
        Self {
            status,
            store,
            cache,
            notifications,
            deps,
        }
    }

    /// Drain notifications received so far.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        let mut out = Vec::new();
        while let Ok((_, n)) = self.notifications.try_recv() {
            out.push(n);
        }
        out
    }
}

pub fn options(prefix: &str) -> TrackerOptions {
    TrackerOptions {
        invalidate_keys: vec!["equipment:list".to_string(), "factory:list".to_string()],
        storage_prefix: prefix.to_string(),
        messages: Messages::default(),
        timing: TrackerTiming::default(),
    }
}

/// Poll the relay progress endpoint until the snapshot reports 100%.
pub async fn wait_for_full_progress(
    client: &reqwest::Client,
    base_url: &str,
    job_id: &str,
    timeout: Duration,
) -> Result<Value, Box<dyn std::error::Error>> {
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        let response = client
            .get(format!("{}/api/v1/imports/{}/progress", base_url, job_id))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(format!("Progress check failed: {}", response.status()).into());
        }

        let body: Value = response.json().await?;
        if body["progress"].as_f64() == Some(100.0) {
            return Ok(body);
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(format!("Job {} did not finish within {:?}", job_id, timeout).into());
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
