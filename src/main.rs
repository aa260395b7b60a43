use axum::routing::get;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use cmms_import::app_state::AppState;
use cmms_import::config::AppConfig;
use cmms_import::routes;
use cmms_import::services::{
    cache::RedisCache, notify::TracingNotifier, status::HttpStatusClient, storage::RedisStore,
};
use cmms_import::tracker::{clock::MonotonicClock, TrackerDeps};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing CMMS import progress relay");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    metrics::describe_counter!(
        "import_status_polls_total",
        "Status requests issued to the CMMS backend"
    );
    metrics::describe_counter!(
        "import_status_fetch_errors_total",
        "Status requests that failed and were retried on the next tick"
    );
    metrics::describe_counter!(
        "import_jobs_terminal_total",
        "Import jobs observed reaching a terminal status, by notification outcome"
    );
    metrics::describe_gauge!(
        "import_trackers_active",
        "Trackers with live timers"
    );

    tracing::info!(api_url = %config.cmms_api_url, "Initializing CMMS status client");
    let status = HttpStatusClient::new(&config.cmms_api_url, config.cmms_api_token.clone())
        .expect("Failed to initialize CMMS status client");

    tracing::info!("Connecting to Redis");
    let store = Arc::new(RedisStore::new(&config.redis_url).expect("Failed to initialize Redis store"));
    let cache = RedisCache::new(&config.redis_url).expect("Failed to initialize Redis cache");

    let deps = TrackerDeps {
        status: Arc::new(status),
        store: store.clone(),
        cache: Arc::new(cache),
        notifier: Arc::new(TracingNotifier),
        clock: Arc::new(MonotonicClock::new()),
    };

    let state = AppState::new(
        deps,
        config.timing(),
        &config.success_message,
        &config.warning_template,
    )
    .with_redis(store)
    .with_finished_retention(config.finished_retention());

    let app = routes::api_router(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!("Starting cmms-import on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
