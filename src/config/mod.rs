use serde::Deserialize;
use std::time::Duration;

use crate::models::progress::{DEFAULT_SUCCESS_MESSAGE, DEFAULT_WARNING_TEMPLATE};
use crate::tracker::TrackerTiming;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000")
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Base URL of the CMMS backend API
    pub cmms_api_url: String,

    /// Bearer token for the CMMS backend API
    #[serde(default)]
    pub cmms_api_token: Option<String>,

    /// Redis connection string for persisted metrics and the shared cache
    pub redis_url: String,

    /// Simulated import duration used until one is persisted
    #[serde(default = "default_import_duration_ms")]
    pub import_duration_ms: u64,

    /// How often the simulated progress is recomputed
    #[serde(default = "default_simulation_tick_ms")]
    pub simulation_tick_ms: u64,

    /// Interval between status requests once polling has started
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long a finished job's snapshot stays available on the relay
    #[serde(default = "default_finished_retention_ms")]
    pub finished_retention_ms: u64,

    /// Notification text when no rows failed
    #[serde(default = "default_success_message")]
    pub success_message: String,

    /// Notification text when rows failed; `{failed}` is the failed count
    #[serde(default = "default_warning_template")]
    pub warning_template: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_import_duration_ms() -> u64 {
    10_000
}

fn default_simulation_tick_ms() -> u64 {
    500
}

fn default_poll_interval_ms() -> u64 {
    3_000
}

fn default_finished_retention_ms() -> u64 {
    300_000
}

fn default_success_message() -> String {
    DEFAULT_SUCCESS_MESSAGE.to_string()
}

fn default_warning_template() -> String {
    DEFAULT_WARNING_TEMPLATE.to_string()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn timing(&self) -> TrackerTiming {
        TrackerTiming {
            default_duration: Duration::from_millis(self.import_duration_ms),
            simulation_tick: Duration::from_millis(self.simulation_tick_ms.max(1)),
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
        }
    }

    pub fn finished_retention(&self) -> Duration {
        Duration::from_millis(self.finished_retention_ms)
    }
}
