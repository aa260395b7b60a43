use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::models::job::ImportJob;

/// Source of import job status snapshots.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self, job_id: &str) -> Result<ImportJob, StatusError>;
}

/// Client for the CMMS backend import-status endpoint.
pub struct HttpStatusClient {
    http: Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpStatusClient {
    pub fn new(base_url: &str, api_token: Option<String>) -> Result<Self, StatusError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(StatusError::Http)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
        })
    }

    fn status_url(&self, job_id: &str) -> String {
        format!("{}/api/import/status/{}", self.base_url, job_id)
    }
}

#[async_trait]
impl StatusSource for HttpStatusClient {
    /// GET the job snapshot. Non-2xx responses are errors.
    async fn fetch_status(&self, job_id: &str) -> Result<ImportJob, StatusError> {
        let mut request = self.http.get(self.status_url(job_id));
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(StatusError::Http)?;

        let status = response.status();
        if !status.is_success() {
            return Err(StatusError::Status(status.as_u16()));
        }

        response.json::<ImportJob>().await.map_err(StatusError::Http)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Status endpoint returned HTTP {0}")]
    Status(u16),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_url_strips_trailing_slash() {
        let client = HttpStatusClient::new("http://cmms.local:8080/", None).unwrap();
        assert_eq!(
            client.status_url("job-42"),
            "http://cmms.local:8080/api/import/status/job-42"
        );
    }
}
