//! Digital input drivers

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use embedded_hal::digital::v2::InputPin;
use log::warn;

use comms_if::eqpt::{SensorError, SensorSource};
use super::KillSwitch;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Line sensors connected to individual digital inputs.
pub struct GpioSensorSource<P: InputPin> {
    /// Sensor pins, leftmost first
    pins: Vec<P>,
}

/// A push button kill switch on a digital input.
pub struct GpioKillSwitch<P: InputPin> {
    pin: P,
    active_low: bool,
    read_failed: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<P: InputPin> GpioSensorSource<P> {
    /// Create a new source from the sensor pins, leftmost first.
    pub fn new(pins: Vec<P>) -> Self {
        Self { pins }
    }
}

impl<P: InputPin> SensorSource for GpioSensorSource<P> {
    fn read_all(&mut self) -> Result<Vec<bool>, SensorError> {
        self.pins
            .iter()
            .enumerate()
            .map(|(i, p)| p.is_high().map_err(|_| SensorError::ReadFailed(i)))
            .collect()
    }
}

impl<P: InputPin> GpioKillSwitch<P> {
    pub fn new(pin: P, active_low: bool) -> Self {
        Self {
            pin,
            active_low,
            read_failed: false,
        }
    }
}

impl<P: InputPin> KillSwitch for GpioKillSwitch<P> {
    /// A failed read counts as not pressed, so that a glitch on the input
    /// can't stop the robot mid-track.
    fn is_pressed(&mut self) -> bool {
        match self.pin.is_high() {
            Ok(high) => {
                self.read_failed = false;
                high != self.active_low
            },
            Err(_) => {
                if !self.read_failed {
                    warn!("Could not read the kill switch");
                    self.read_failed = true;
                }
                false
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
