pub mod health;
pub mod imports;
pub mod metrics;

use axum::routing::{get, post};
use axum::Router;

use crate::app_state::AppState;

/// API routes hosted by the relay service, without the metrics endpoint.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route(
            "/api/v1/imports/{job_id}/track",
            post(imports::track_import),
        )
        .route(
            "/api/v1/imports/{job_id}/progress",
            get(imports::get_progress),
        )
        .route(
            "/api/v1/imports/{job_id}",
            axum::routing::delete(imports::stop_tracking),
        )
        .with_state(state)
}
