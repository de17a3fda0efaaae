//! General time utility functions

use chrono;

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    if let Some(ns) = duration.num_nanoseconds() {
        Some(ns as f64 / NANOS_PER_SECOND as f64)
    }
    else {
        None
    }
}

/// Convert a period in milliseconds into a whole number of cycles of the given period, never
/// less than one.
pub fn ms_to_cycles(interval_ms: u64, cycle_period_ms: u64) -> u64 {
    if cycle_period_ms == 0 {
        return 1
    }

    (interval_ms / cycle_period_ms).max(1)
}
