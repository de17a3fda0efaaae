//! # Telemetry interface
//!
//! The line executable publishes a [`TmPacket`] at a coarse interval. Delivery is best effort, a
//! sink reports failure through its return value and the publisher only ever counts it.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Telemetry packet output by the line executable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TmPacket {
    /// Session elapsed time at which the snapshot was taken.
    ///
    /// Units: seconds
    pub time_s: f64,

    /// Number of control cycles executed when the snapshot was taken
    pub cycle: u64,

    /// Line detections, leftmost sensor first
    pub sensors: Vec<bool>,

    /// Demanded left motor duty
    pub left_duty: u16,

    /// Demanded right motor duty
    pub right_duty: u16,

    /// Estimated line offset
    pub offset: f64,

    /// True if the line was seen on this cycle
    pub detected: bool,

    /// Turn correction output by the controller
    pub turn: f64,

    /// Base speed duty in use
    pub base_speed: u16,

    /// Name of the control loop state
    pub state: String,
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A destination for telemetry packets.
pub trait TmSink {
    /// Deliver one packet.
    fn send(&mut self, packet: &TmPacket) -> Result<(), TmSinkError>;
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum TmSinkError {
    #[error("Could not serialize the telemetry: {0}")]
    SerializationError(String),

    #[error("Could not write the telemetry: {0}")]
    WriteError(std::io::Error),

    #[error("Telemetry sink is not available")]
    Unavailable,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TmPacket {
    /// Render the sensor detections as a compact string, `■` for a detection and `□` otherwise.
    pub fn sensor_string(&self) -> String {
        self.sensors.iter().map(|&d| if d { '■' } else { '□' }).collect()
    }
}

impl<T: TmSink + ?Sized> TmSink for Box<T> {
    fn send(&mut self, packet: &TmPacket) -> Result<(), TmSinkError> {
        (**self).send(packet)
    }
}
