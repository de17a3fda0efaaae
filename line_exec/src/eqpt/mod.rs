//! # Equipment drivers
//!
//! Implementations of the `comms_if::eqpt` interfaces for real hardware, built
//! on `embedded-hal` so they work with any HAL providing the pins and buses.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Line sensors and kill switch on digital input pins
pub mod gpio;

/// Drive motors through PWM outputs
pub mod pwm;

/// Hardware parameters
mod params;

/// Construction of the drivers on a Raspberry Pi
#[cfg(all(target_arch = "arm", target_os = "linux"))]
pub mod rpi;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use gpio::{GpioKillSwitch, GpioSensorSource};
pub use params::*;
pub use pwm::{MotorDriver, MotorWiring, Polarity, PwmActuatorSink, PwmPinBank};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A physical emergency stop input.
pub trait KillSwitch {
    /// Returns true while the switch is pressed.
    fn is_pressed(&mut self) -> bool;
}
