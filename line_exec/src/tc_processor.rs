//! # Telecommand processor module
//!
//! The telecommand processor handles the TCs coming from the command source.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, warn};

// Internal
use comms_if::tc::Tc;
use line_lib::data_store::DataStore;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute a telecommand.
///
/// Commands which can't be executed in the current state are logged and
/// counted, never fatal.
pub(crate) fn exec(ds: &mut DataStore, tc: &Tc) {

    info!("Executing {:?}", tc);

    let result = match tc {
        Tc::FollowLine => ds.line_ctrl.start(),
        Tc::Stop => ds.line_ctrl.stop(),
        Tc::EmergencyStop => ds.line_ctrl.emergency_stop(),
        Tc::Drive { left, right } => ds.line_ctrl
            .drive_manual(*left, *right)
            .map(|cmd| {
                info!("Manual drive L {} R {}", cmd.left_duty, cmd.right_duty)
            }),
    };

    if let Err(e) = result {
        warn!("Could not execute {:?}: {}", tc, e);
        ds.num_rejected_tcs += 1;
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
