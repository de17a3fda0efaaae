//! # Cycle management
//!
//! Fixed period scheduling for the executable's main loop. The control code
//! itself never sleeps, the main loop calls [`CycleTimer::end_cycle`] once the
//! cycle's work is done and this sleeps for whatever is left of the period.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::thread;
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Timer enforcing a fixed cycle period.
#[derive(Debug)]
pub struct CycleTimer {
    period: Duration,

    cycle_start: Instant,

    /// Number of consecutive cycles which overran the period
    pub num_consec_overruns: u64,
}

/// Outcome of a single cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    /// The cycle finished within its period, the remaining time was slept.
    OnTime(Duration),

    /// The cycle took longer than the period by the given amount.
    Overran(Duration),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CycleTimer {
    /// Create a new timer, the first cycle starts now.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            cycle_start: Instant::now(),
            num_consec_overruns: 0,
        }
    }

    /// Mark the start of a new cycle.
    pub fn start_cycle(&mut self) {
        self.cycle_start = Instant::now();
    }

    /// Finish the current cycle, sleeping until the end of the period if
    /// there's time left.
    pub fn end_cycle(&mut self) -> CycleOutcome {
        let outcome = self.account(Instant::now() - self.cycle_start);

        if let CycleOutcome::OnTime(remaining) = outcome {
            thread::sleep(remaining);
        }

        outcome
    }

    /// Update the cycle counters for a cycle which took `cycle_dur`, without
    /// sleeping.
    pub fn account(&mut self, cycle_dur: Duration) -> CycleOutcome {
        match self.period.checked_sub(cycle_dur) {
            Some(remaining) => {
                self.num_consec_overruns = 0;
                CycleOutcome::OnTime(remaining)
            },
            None => {
                self.num_consec_overruns += 1;
                CycleOutcome::Overran(cycle_dur - self.period)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_account() {
        let mut timer = CycleTimer::new(Duration::from_millis(10));

        assert_eq!(
            timer.account(Duration::from_millis(4)),
            CycleOutcome::OnTime(Duration::from_millis(6))
        );
        assert_eq!(
            timer.account(Duration::from_millis(12)),
            CycleOutcome::Overran(Duration::from_millis(2))
        );
        assert_eq!(
            timer.account(Duration::from_millis(15)),
            CycleOutcome::Overran(Duration::from_millis(5))
        );
        assert_eq!(timer.num_consec_overruns, 2);

        timer.account(Duration::from_millis(1));
        assert_eq!(timer.num_consec_overruns, 0);
    }
}
