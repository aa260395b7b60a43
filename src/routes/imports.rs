use std::collections::hash_map::Entry;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;
use tokio::sync::watch;

use crate::app_state::AppState;
use crate::models::progress::ProgressSnapshot;
use crate::models::tracking::TrackRequest;
use crate::tracker::{ImportProgressTracker, TrackerOptions};

/// POST /api/v1/imports/{job_id}/track — Start tracking an import job.
///
/// Idempotent: a job already tracked keeps its tracker and the current
/// snapshot is returned. Finished trackers are evicted after
/// `finished_retention`, so a later request starts a fresh one.
pub async fn track_import(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Json(request): Json<TrackRequest>,
) -> Result<Json<ProgressSnapshot>, StatusCode> {
    if let Err(report) = request.validate() {
        tracing::debug!(job_id = %job_id, errors = %report, "Rejected track request");
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }

    if let Some(existing) = state.trackers.lock().await.get(&job_id) {
        return Ok(Json(existing.snapshot()));
    }

    let options = TrackerOptions {
        messages: request.messages(&state.default_success, &state.default_warning),
        invalidate_keys: request.invalidate_keys,
        storage_prefix: request.storage_prefix,
        timing: state.timing,
    };

    // Started outside the registry lock: loading the timeline can take
    // several store round-trips.
    let mut tracker =
        ImportProgressTracker::start(job_id.clone(), state.deps.clone(), options).await;

    let finished = {
        let mut trackers = state.trackers.lock().await;
        match trackers.entry(job_id.clone()) {
            Entry::Occupied(existing) => {
                tracker.dispose();
                return Ok(Json(existing.get().snapshot()));
            }
            Entry::Vacant(slot) => slot.insert(tracker).subscribe(),
        }
    };

    let snapshot = finished.borrow().clone();
    evict_when_finished(state, job_id, finished);

    Ok(Json(snapshot))
}

/// Drop a tracker from the registry once it has been terminal for
/// `finished_retention`. A tracker deleted or replaced in the meantime is
/// left alone.
fn evict_when_finished(
    state: AppState,
    job_id: String,
    mut rx: watch::Receiver<ProgressSnapshot>,
) {
    tokio::spawn(async move {
        let terminal = rx.wait_for(ProgressSnapshot::is_terminal).await.is_ok();
        if !terminal {
            return;
        }
        tokio::time::sleep(state.finished_retention).await;

        let mut trackers = state.trackers.lock().await;
        let same_tracker = trackers
            .get(&job_id)
            .is_some_and(|t| t.subscribe().same_channel(&rx));
        if same_tracker {
            if let Some(mut tracker) = trackers.remove(&job_id) {
                tracker.dispose();
            }
            tracing::debug!(job_id = %job_id, "Evicted finished import tracker");
        }
    });
}

/// GET /api/v1/imports/{job_id}/progress — Current progress of a tracked job.
pub async fn get_progress(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<ProgressSnapshot>, StatusCode> {
    let trackers = state.trackers.lock().await;
    trackers
        .get(&job_id)
        .map(|t| Json(t.snapshot()))
        .ok_or(StatusCode::NOT_FOUND)
}

/// DELETE /api/v1/imports/{job_id} — Stop tracking and release its timers.
pub async fn stop_tracking(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> StatusCode {
    let removed = state.trackers.lock().await.remove(&job_id);
    match removed {
        Some(mut tracker) => {
            tracker.dispose();
            StatusCode::NO_CONTENT
        }
        None => StatusCode::NOT_FOUND,
    }
}
