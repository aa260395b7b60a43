use garde::Validate;
use serde::Deserialize;

use crate::models::progress::Messages;

/// Request to start tracking an import job on the relay service.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TrackRequest {
    #[garde(length(min = 1, max = 128))]
    pub storage_prefix: String,

    #[serde(default)]
    #[garde(length(max = 32), inner(length(min = 1, max = 256)))]
    pub invalidate_keys: Vec<String>,

    #[garde(length(min = 1, max = 500))]
    pub success_message: Option<String>,

    /// Warning text; `{failed}` is replaced by the failed row count.
    #[garde(length(min = 1, max = 500))]
    pub warning_template: Option<String>,
}

impl TrackRequest {
    /// Resolve message templates, falling back to the service defaults.
    pub fn messages(&self, default_success: &str, default_warning: &str) -> Messages {
        Messages::from_template(
            self.success_message.as_deref().unwrap_or(default_success),
            self.warning_template.as_deref().unwrap_or(default_warning),
        )
    }
}
