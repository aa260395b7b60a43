//! Import job snapshots as the CMMS backend reports them

#![allow(dead_code)]

use cmms_import::models::job::{ImportJob, ImportJobStatus};

pub const JOB_ID: &str = "job-1";

/// Fixed wall-clock reading the test clocks are anchored at.
pub const EPOCH_MS: i64 = 1_767_225_600_000;

pub fn pending(job_id: &str) -> ImportJob {
    ImportJob::new(job_id, ImportJobStatus::Pending)
}

pub fn processing(job_id: &str, processed: u64, total: u64) -> ImportJob {
    ImportJob {
        total_records: total,
        processed_records: processed,
        success_count: processed,
        ..ImportJob::new(job_id, ImportJobStatus::Processing)
    }
}

pub fn completed(job_id: &str, total: u64, failed: u64) -> ImportJob {
    ImportJob {
        total_records: total,
        processed_records: total,
        success_count: total - failed,
        failed_count: failed,
        error_file_url: (failed > 0).then(|| format!("/api/import/errors/{job_id}.xlsx")),
        ..ImportJob::new(job_id, ImportJobStatus::Completed)
    }
}

pub fn failed(job_id: &str, total: u64, failed: u64) -> ImportJob {
    ImportJob {
        total_records: total,
        processed_records: failed,
        failed_count: failed,
        ..ImportJob::new(job_id, ImportJobStatus::Failed)
    }
}
