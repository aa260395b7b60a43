use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::models::job::ImportJob;

/// What a tracker exposes to its caller.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    /// Displayed percentage, 0 to 100.
    pub progress: f64,
    /// Last job snapshot fetched from the backend.
    pub history: Option<ImportJob>,
    pub simulation_done: bool,
}

impl ProgressSnapshot {
    pub fn is_terminal(&self) -> bool {
        self.history.as_ref().is_some_and(ImportJob::is_terminal)
    }
}

/// Terminal notification emitted once per job.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    Success {
        message: String,
    },
    Warning {
        failed_count: u64,
        message: String,
    },
}

impl Notification {
    pub fn message(&self) -> &str {
        match self {
            Notification::Success { message } | Notification::Warning { message, .. } => message,
        }
    }
}

pub const DEFAULT_SUCCESS_MESSAGE: &str = "Nhập dữ liệu thành công";
pub const DEFAULT_WARNING_TEMPLATE: &str = "Nhập dữ liệu hoàn tất, có {failed} dòng lỗi";

type WarningFn = dyn Fn(u64) -> String + Send + Sync;

/// User-facing message templates for the terminal notification.
#[derive(Clone)]
pub struct Messages {
    pub success: String,
    warning: Arc<WarningFn>,
}

impl Messages {
    pub fn new(
        success: impl Into<String>,
        warning: impl Fn(u64) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            success: success.into(),
            warning: Arc::new(warning),
        }
    }

    /// Build messages from plain strings; `{failed}` in the warning template
    /// is replaced by the failed row count.
    pub fn from_template(success: impl Into<String>, warning_template: impl Into<String>) -> Self {
        let template = warning_template.into();
        Self::new(success, move |failed| {
            template.replace("{failed}", &failed.to_string())
        })
    }

    pub fn warning(&self, failed_count: u64) -> String {
        (self.warning)(failed_count)
    }

    /// Pick the notification for a terminal job.
    ///
    /// Only `failed_count` decides the branch: a FAILED job with zero failed
    /// rows still takes the success path.
    pub fn notification_for(&self, job: &ImportJob) -> Notification {
        if job.failed_count == 0 {
            Notification::Success {
                message: self.success.clone(),
            }
        } else {
            Notification::Warning {
                failed_count: job.failed_count,
                message: self.warning(job.failed_count),
            }
        }
    }
}

impl Default for Messages {
    fn default() -> Self {
        Self::from_template(DEFAULT_SUCCESS_MESSAGE, DEFAULT_WARNING_TEMPLATE)
    }
}

impl fmt::Debug for Messages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Messages")
            .field("success", &self.success)
            .finish_non_exhaustive()
    }
}
