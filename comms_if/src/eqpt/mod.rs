//! # Equipment Interface
//!
//! This module defines the interfaces the control software uses to talk to the robot's
//! equipment. The control core only ever sees these traits, the drivers behind them live in the
//! executable.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod motor;
pub mod sensor;

// -----------------------------------------------------------------------------------------------
// EXPORTS
// -----------------------------------------------------------------------------------------------

pub use motor::{ActuatorError, ActuatorSink};
pub use sensor::{SensorError, SensorSource};
