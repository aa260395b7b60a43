//! Stepped progress estimate shown before the backend confirms anything.

use std::time::Duration;

/// Number of visible jumps across the estimated duration.
pub const SIMULATION_STEPS: i64 = 4;

/// Percentage added per step.
pub const STEP_PERCENT: f64 = 22.5;

/// Highest value the simulation may show; 100 is reserved for a confirmed
/// terminal status.
pub const SIMULATION_CAP: f64 = 90.0;

fn elapsed(now_ms: i64, start_ms: i64) -> i64 {
    (now_ms - start_ms).max(0)
}

/// Progress for a timeline started at `start_ms` with the given estimate.
///
/// Always one of 0, 22.5, 45, 67.5 or 90, and non-decreasing in `now_ms`.
/// A start time in the future counts as zero elapsed.
pub fn resume_progress(now_ms: i64, start_ms: i64, duration_ms: i64) -> f64 {
    if duration_ms <= 0 {
        return SIMULATION_CAP;
    }
    // floor(elapsed / (duration / 4)) without rounding the step length.
    let steps = i128::from(elapsed(now_ms, start_ms)) * i128::from(SIMULATION_STEPS)
        / i128::from(duration_ms);
    (steps as f64 * STEP_PERCENT).min(SIMULATION_CAP)
}

pub fn simulation_finished(now_ms: i64, start_ms: i64, duration_ms: i64) -> bool {
    elapsed(now_ms, start_ms) >= duration_ms
}

/// Time left before polling may start.
pub fn remaining_wait(now_ms: i64, start_ms: i64, duration_ms: i64) -> Duration {
    let left = duration_ms - elapsed(now_ms, start_ms);
    Duration::from_millis(left.max(0) as u64)
}
