//! CMMS Import Progress Tracking
//!
//! This library provides the import progress tracker used by the CMMS bulk
//! spreadsheet import, along with the clients it talks to (job-status
//! endpoint, persisted metrics store, cache invalidation) and the relay
//! service that hosts trackers for thin clients.

pub mod app_state;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;
pub mod tracker;
