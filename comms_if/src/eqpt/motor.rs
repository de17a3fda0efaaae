//! # Drive motor equipment interface

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A sink for differential drive duty demands.
///
/// Both operations are fire-and-forget and idempotent, they are called every control cycle.
pub trait ActuatorSink {
    /// Set the forward duty of the left and right motors.
    fn set_duty(&mut self, left: u16, right: u16) -> Result<(), ActuatorError>;

    /// Remove all drive from both motors.
    fn stop(&mut self) -> Result<(), ActuatorError>;
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur while driving the motors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ActuatorError {
    #[error("Could not write to motor channel {0}")]
    WriteFailed(usize),

    #[error("Demanded duty {0} exceeds the driver's full scale")]
    InvalidDuty(u16),

    #[error("Motor device is unavailable: {0}")]
    DeviceUnavailable(String),
}

impl<A: ActuatorSink + ?Sized> ActuatorSink for Box<A> {
    fn set_duty(&mut self, left: u16, right: u16) -> Result<(), ActuatorError> {
        (**self).set_duty(left, right)
    }

    fn stop(&mut self) -> Result<(), ActuatorError> {
        (**self).stop()
    }
}
