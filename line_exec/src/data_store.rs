//! # Data Store

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::{ActuatorSink, SensorSource};
use util::time::ms_to_cycles;

use crate::loop_ctrl::ControlLoop;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Control loop over whichever equipment the executable was started with.
pub type BoxedControlLoop = ControlLoop<Box<dyn SensorSource>, Box<dyn ActuatorSink>>;

/// Global data store for the executable.
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u64,

    /// Session elapsed time at the start of this cycle
    pub time_s: f64,

    /// True if the command source should be polled this cycle
    pub is_tc_cycle: bool,

    /// True if telemetry should be published this cycle
    pub is_tm_cycle: bool,

    /// True if the debug line should be logged this cycle
    pub is_debug_cycle: bool,

    // Line following
    pub line_ctrl: BoxedControlLoop,

    // Monitoring Counters
    /// Number of TCs which could not be executed
    pub num_rejected_tcs: u64,

    tc_every: u64,
    tm_every: u64,
    debug_every: Option<u64>,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Create the data store around the control loop, deriving the polling
    /// intervals from its configuration.
    pub fn new(line_ctrl: BoxedControlLoop) -> Self {
        let config = line_ctrl.config();
        let tick_ms = config.tick_period_ms();

        let tc_every = ms_to_cycles(config.tc_poll_interval_ms(), tick_ms);
        let tm_every = ms_to_cycles(config.tm_interval_ms(), tick_ms);
        let debug_every = match config.debug_interval_ms() {
            0 => None,
            ms => Some(ms_to_cycles(ms, tick_ms))
        };

        Self {
            num_cycles: 0,
            time_s: 0.0,
            is_tc_cycle: false,
            is_tm_cycle: false,
            is_debug_cycle: false,
            line_ctrl,
            num_rejected_tcs: 0,
            tc_every,
            tm_every,
            debug_every,
        }
    }

    /// Perform actions required at the start of a cycle.
    ///
    /// Sets the flags of the periodic activities which fall on this cycle.
    pub fn cycle_start(&mut self, time_s: f64) {
        self.time_s = time_s;

        self.is_tc_cycle = self.num_cycles % self.tc_every == 0;
        self.is_tm_cycle = self.num_cycles % self.tm_every == 0;
        self.is_debug_cycle = match self.debug_every {
            Some(n) => self.num_cycles % n == 0,
            None => false
        };
    }

    /// Perform actions required at the end of a cycle.
    pub fn cycle_end(&mut self) {
        self.num_cycles += 1;
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
