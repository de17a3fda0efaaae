//! # Motor mixer
//!
//! Converts the base speed and turn correction into a duty for each motor,
//! and owns the [`ActuatorSink`] the duties are written to.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{error, info, warn};
use serde::Serialize;

// Internal
use comms_if::eqpt::{ActuatorError, ActuatorSink};
use crate::loop_ctrl::LoopConfig;
use util::maths;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Duty demand for both drive motors.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MotorCommand {
    pub left_duty: u16,
    pub right_duty: u16,
}

/// Mixes the controller output into motor duties and writes them out.
pub struct MotorMixer<A: ActuatorSink> {
    sink: A,

    /// Total number of failed writes
    fault_count: u64,

    /// Number of consecutive failed writes
    num_consec_faults: u64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MotorCommand {
    /// The command which removes all drive.
    pub const STOP: MotorCommand = MotorCommand {
        left_duty: 0,
        right_duty: 0
    };
}

impl<A: ActuatorSink> MotorMixer<A> {

    pub fn new(sink: A) -> Self {
        Self {
            sink,
            fault_count: 0,
            num_consec_faults: 0,
        }
    }

    /// Compute the motor command for a base speed, line offset, and turn.
    ///
    /// 1. The turn is saturated to the configured maximum.
    /// 2. Both sides are slowed by `max(min_factor, 1 - |offset| / sensitivity)`
    ///    so the robot doesn't overshoot sharp curves.
    /// 3. The turn is subtracted from the left side and added to the right.
    /// 4. The per-side corrections are applied.
    /// 5. Each side is clamped to the duty bounds.
    ///
    /// The result is always inside `[duty_min, duty_max]`, whatever the input.
    pub fn drive(
        &self,
        base_speed: u16,
        offset: f64,
        turn: f64,
        config: &LoopConfig
    ) -> MotorCommand {
        let turn = maths::clamp(turn, -config.max_turn(), config.max_turn());

        let speed_factor = (1.0 - offset.abs() / config.curve_sensitivity())
            .max(config.min_speed_factor());

        let base = base_speed as f64;
        let left = (base - turn) * speed_factor * config.left_correction();
        let right = (base + turn) * speed_factor * config.right_correction();

        MotorCommand {
            left_duty: to_duty(left, config),
            right_duty: to_duty(right, config),
        }
    }

    /// Clamp a directly demanded pair of duties into the configured bounds.
    ///
    /// Used for manual drive, which bypasses the mixing but must still respect
    /// the hardware limits.
    pub fn limit(&self, left_duty: u16, right_duty: u16, config: &LoopConfig) -> MotorCommand {
        MotorCommand {
            left_duty: to_duty(left_duty as f64, config),
            right_duty: to_duty(right_duty as f64, config),
        }
    }

    /// The stop command, both duties zero.
    pub fn stop(&self) -> MotorCommand {
        MotorCommand::STOP
    }

    /// Write a command to the motors.
    ///
    /// Failures are logged and counted but never returned, the next cycle
    /// writes a fresh command anyway. Returns true if the write succeeded.
    pub fn write(&mut self, cmd: &MotorCommand) -> bool {
        let result = self.sink.set_duty(cmd.left_duty, cmd.right_duty);
        self.record(result, "write")
    }

    /// Remove all drive from the motors.
    ///
    /// If the sink's stop fails a zero duty is written instead.
    pub fn write_stop(&mut self) -> bool {
        if let Err(e) = self.sink.stop() {
            error!("Could not stop the motors ({}), writing zero duty instead", e);
            self.fault_count += 1;

            let result = self.sink.set_duty(0, 0);
            return self.record(result, "zero duty")
        }

        self.record(Ok(()), "stop")
    }

    /// Total number of failed writes.
    pub fn fault_count(&self) -> u64 {
        self.fault_count
    }

    /// Access the underlying sink.
    pub fn sink(&self) -> &A {
        &self.sink
    }

    fn record(&mut self, result: Result<(), ActuatorError>, what: &str) -> bool {
        match result {
            Ok(()) => {
                if self.num_consec_faults > 0 {
                    info!(
                        "Motor writes recovered after {} failures",
                        self.num_consec_faults
                    );
                    self.num_consec_faults = 0;
                }
                true
            },
            Err(e) => {
                self.fault_count += 1;
                self.num_consec_faults += 1;

                if self.num_consec_faults == 1 {
                    warn!("Motor {} failed: {}", what, e);
                }
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Clamp a raw duty into the configured bounds, truncating the fraction.
fn to_duty(raw: f64, config: &LoopConfig) -> u16 {
    if raw.is_nan() {
        return config.duty_min()
    }

    maths::clamp(raw, config.duty_min() as f64, config.duty_max() as f64) as u16
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
