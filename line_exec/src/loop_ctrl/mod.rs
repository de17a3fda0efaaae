//! # Line following control loop
//!
//! Runs the read, estimate, control, mix, write pipeline once per tick and
//! owns the lifecycle of the robot's line following.
//!
//! ```text
//!            start()              emergency_stop()
//!  Stopped ----------> Running ---------------------> EmergencyStopped
//!     ^                   |                                  |
//!     +------ stop() -----+                 stop() re-issues zero duty only
//! ```

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod estop;
mod loop_config;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
pub use estop::*;
pub use loop_config::*;
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Lifecycle state of the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoopState {
    /// Motors stopped, ready to follow the line.
    Stopped,

    /// Following the line.
    Running,

    /// Stopped by an emergency, only a restart leaves this state.
    EmergencyStopped,
}

/// Possible errors that can occur during ControlLoop operation.
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum LoopCtrlError {
    #[error("Cannot {request} while the loop is {from:?}")]
    InvalidTransition {
        from: LoopState,
        request: &'static str
    },

    #[error("The loop can only be ticked while running, it is {0:?}")]
    NotRunning(LoopState),

    #[error("An emergency stop has been requested, the executable must be restarted")]
    EmergencyStopLatched,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for LoopState {
    fn default() -> Self {
        LoopState::Stopped
    }
}

impl std::fmt::Display for LoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LoopState::Stopped => "STOPPED",
            LoopState::Running => "RUNNING",
            LoopState::EmergencyStopped => "EMERGENCY_STOPPED"
        };
        write!(f, "{}", s)
    }
}
