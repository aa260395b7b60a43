pub mod job;
pub mod progress;
pub mod tracking;
