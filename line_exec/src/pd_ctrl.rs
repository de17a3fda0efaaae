//! # Proportional-derivative line controller
//!
//! Turns the line position estimate into a signed turn correction. While the
//! line is lost the controller latches onto the side it was last seen on and
//! commands the largest turn towards it.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use crate::{loop_ctrl::LoopConfig, pos_est::PositionEstimate};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// PD controller state.
#[derive(Debug, Default, Clone, Serialize)]
pub struct PdCtrl {
    /// Offset of the last cycle on which the line was seen
    last_offset: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PdCtrl {

    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the turn for this cycle's estimate.
    ///
    /// A positive turn slows the left motor and speeds up the right one. When
    /// the line is detected the output is not saturated, that happens in the
    /// mixer.
    pub fn step(&mut self, estimate: &PositionEstimate, config: &LoopConfig) -> f64 {
        if !estimate.detected {
            // Search towards the side the line was last seen on, steering
            // the way the gains would. The latched offset is left alone so
            // repeated lost cycles can't flip the direction.
            let side = match self.last_offset < 0.0 {
                true => -1.0,
                false => 1.0
            };
            return side * config.steer_sign() * config.max_turn()
        }

        let derivative = estimate.offset - self.last_offset;
        let turn = config.kp() * estimate.offset + config.kd() * derivative;

        self.last_offset = estimate.offset;

        turn
    }

    /// Clear the derivative history, must be called before every run.
    pub fn reset(&mut self) {
        self.last_offset = 0.0;
    }

    /// Offset of the last cycle on which the line was seen.
    pub fn last_offset(&self) -> f64 {
        self.last_offset
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
