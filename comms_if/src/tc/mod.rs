//! # Telecommand module
//!
//! This module provides the commands which select what the line executable is doing. Commands are
//! polled at a much lower rate than the control loop runs at, and only `FollowLine` hands the
//! motors to the line following core.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Serialize, Deserialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A telecommand, i.e. an instruction sent to the robot by an operator or a script.
///
/// In JSON form the variant is given by the `type` field, for example
/// `{"type": "FOLLOW_LINE"}` or `{"type": "DRIVE", "left": 12000, "right": 12000}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tc {
    /// Begin following the line.
    FollowLine,

    /// Stop the robot, leaving it ready to follow the line again.
    Stop,

    /// Stop the robot and refuse to move again until the executable is restarted.
    EmergencyStop,

    /// Manual override of the motor duties. Only accepted while line following is stopped.
    Drive {
        /// Left motor duty
        left: u16,

        /// Right motor duty
        right: u16
    }
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum TcParseError {
    #[error("TC contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("TC has an invalid type ({0})")]
    InvalidType(String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Tc {

    /// Parse a new TC from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, TcParseError> {
        // Parse to a value first so that a missing or unknown type can be reported separately
        // from malformed JSON.
        let val: serde_json::Value = serde_json::from_str(json_str)
            .map_err(TcParseError::InvalidJson)?;

        match val.get("type") {
            Some(serde_json::Value::String(_)) => (),
            _ => return Err(TcParseError::InvalidType(String::from(
                "Expected \"type\" to be a string"
            )))
        }

        serde_json::from_value(val).map_err(|e| TcParseError::InvalidType(format!("{}", e)))
    }

    /// Serialise the TC into a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
