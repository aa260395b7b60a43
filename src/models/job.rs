use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Status of a bulk import job as reported by the CMMS backend.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportJobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ImportJobStatus {
    /// COMPLETED and FAILED are reached exactly once and never left.
    pub fn is_terminal(self) -> bool {
        matches!(self, ImportJobStatus::Completed | ImportJobStatus::Failed)
    }
}

/// Snapshot of a backend import job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportJob {
    #[serde(default, alias = "id")]
    pub job_id: String,
    pub status: ImportJobStatus,
    #[serde(default)]
    pub total_records: u64,
    #[serde(default)]
    pub processed_records: u64,
    #[serde(default)]
    pub success_count: u64,
    #[serde(default)]
    pub failed_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_file_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ImportJob {
    /// A job carrying only an id and a status, all counters zero.
    pub fn new(job_id: impl Into<String>, status: ImportJobStatus) -> Self {
        Self {
            job_id: job_id.into(),
            status,
            total_records: 0,
            processed_records: 0,
            success_count: 0,
            failed_count: 0,
            error_file_url: None,
            created_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_parses_backend_payload() {
        let job: ImportJob = serde_json::from_str(
            r#"{
                "jobId": "job-1",
                "status": "COMPLETED",
                "totalRecords": 10,
                "processedRecords": 10,
                "successCount": 7,
                "failedCount": 3,
                "errorFileUrl": "/files/errors/job-1.xlsx",
                "createdAt": "2026-03-01T08:00:00Z"
            }"#,
        )
        .unwrap();

        assert_eq!(job.job_id, "job-1");
        assert_eq!(job.status, ImportJobStatus::Completed);
        assert_eq!(job.failed_count, 3);
        assert_eq!(job.error_file_url.as_deref(), Some("/files/errors/job-1.xlsx"));
        assert!(job.created_at.is_some());
        assert!(job.is_terminal());
    }

    #[test]
    fn test_sparse_payload_defaults_counters() {
        let job: ImportJob = serde_json::from_str(r#"{"status":"PROCESSING"}"#).unwrap();
        assert_eq!(job.job_id, "");
        assert_eq!(job.total_records, 0);
        assert_eq!(job.failed_count, 0);
        assert!(!job.is_terminal());
    }

    #[test]
    fn test_id_alias() {
        let job: ImportJob = serde_json::from_str(r#"{"id":"abc","status":"PENDING"}"#).unwrap();
        assert_eq!(job.job_id, "abc");
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(ImportJobStatus::Processing.to_string(), "PROCESSING");
        assert_eq!(
            ImportJobStatus::from_str("FAILED").unwrap(),
            ImportJobStatus::Failed
        );
        assert!(ImportJobStatus::from_str("failed").is_err());
        assert!(ImportJobStatus::Failed.is_terminal());
        assert!(!ImportJobStatus::Pending.is_terminal());
    }
}
