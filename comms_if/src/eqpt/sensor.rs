//! # Line sensor equipment interface

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A source of raw reflectance sensor levels.
///
/// Implementations must not block, the source is read once per control cycle.
pub trait SensorSource {
    /// Read every sensor in the array.
    ///
    /// Returns one raw logic level per sensor, leftmost sensor first, with `true` meaning the
    /// input is high. Interpreting the level as "over the line" is the job of the caller.
    fn read_all(&mut self) -> Result<Vec<bool>, SensorError>;
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur while reading the sensor array.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SensorError {
    #[error("Could not read sensor {0}")]
    ReadFailed(usize),

    #[error("Sensor device is unavailable: {0}")]
    DeviceUnavailable(String),
}

impl<S: SensorSource + ?Sized> SensorSource for Box<S> {
    fn read_all(&mut self) -> Result<Vec<bool>, SensorError> {
        (**self).read_all()
    }
}
