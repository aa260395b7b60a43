//! HTTP status client against a local stand-in for the CMMS backend

use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use cmms_import::models::job::ImportJobStatus;
use cmms_import::services::status::{HttpStatusClient, StatusError, StatusSource};

async fn import_status(
    Path(job_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "Bearer secret-token");

    match job_id.as_str() {
        "job-1" => Ok(Json(json!({
            "jobId": "job-1",
            "status": "PROCESSING",
            "totalRecords": 120,
            "processedRecords": 40,
            "successCount": 39,
            "failedCount": 1,
            "createdAt": "2026-05-04T02:30:00Z"
        }))),
        "private" if authorized => Ok(Json(json!({ "jobId": "private", "status": "COMPLETED" }))),
        "private" => Err(StatusCode::UNAUTHORIZED),
        "broken" => Ok(Json(json!({ "jobId": "broken", "status": "EXPLODED" }))),
        _ => Err(StatusCode::NOT_FOUND),
    }
}

/// Serve the stand-in backend on an ephemeral port and return its base URL.
async fn spawn_backend() -> String {
    let app = Router::new().route("/api/import/status/{job_id}", get(import_status));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_fetches_and_parses_job() {
    let base_url = spawn_backend().await;
    let client = HttpStatusClient::new(&base_url, None).unwrap();

    let job = client.fetch_status("job-1").await.unwrap();
    assert_eq!(job.job_id, "job-1");
    assert_eq!(job.status, ImportJobStatus::Processing);
    assert_eq!(job.total_records, 120);
    assert_eq!(job.processed_records, 40);
    assert_eq!(job.failed_count, 1);
    assert!(job.created_at.is_some());
}

#[tokio::test]
async fn test_sends_bearer_token() {
    let base_url = spawn_backend().await;

    let anonymous = HttpStatusClient::new(&base_url, None).unwrap();
    assert!(matches!(
        anonymous.fetch_status("private").await,
        Err(StatusError::Status(401))
    ));

    let authorized =
        HttpStatusClient::new(&format!("{}/", base_url), Some("secret-token".to_string())).unwrap();
    let job = authorized.fetch_status("private").await.unwrap();
    assert_eq!(job.status, ImportJobStatus::Completed);
}

#[tokio::test]
async fn test_non_success_status_is_an_error() {
    let base_url = spawn_backend().await;
    let client = HttpStatusClient::new(&base_url, None).unwrap();

    assert!(matches!(
        client.fetch_status("missing").await,
        Err(StatusError::Status(404))
    ));
}

#[tokio::test]
async fn test_unknown_status_is_a_decode_error() {
    let base_url = spawn_backend().await;
    let client = HttpStatusClient::new(&base_url, None).unwrap();

    assert!(matches!(
        client.fetch_status("broken").await,
        Err(StatusError::Http(_))
    ));
}

#[tokio::test]
async fn test_unreachable_backend_is_an_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = HttpStatusClient::new(&format!("http://{}", addr), None).unwrap();
    assert!(matches!(
        client.fetch_status("job-1").await,
        Err(StatusError::Http(_))
    ));
}
