//! Parameters structure for the line following control loop

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use crate::sensor_array::DetectLevel;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the line following loop, as read from `line_ctrl.toml`.
///
/// These are only ever used to build a [`super::LoopConfig`], which checks
/// that they make sense.
#[derive(Debug, Clone, Deserialize)]
pub struct LoopParams {

    // ---- SENSORS ----

    /// Number of reflectance sensors in the array
    pub num_sensors: usize,

    /// Weight of each sensor, leftmost first. Must be strictly increasing and
    /// symmetric about zero.
    pub sensor_weights: Vec<f64>,

    /// Logic level a sensor reads when it is over the line
    #[serde(default)]
    pub detect_level: DetectLevel,

    // ---- CONTROLLER ----

    /// Proportional gain
    pub kp: f64,

    /// Derivative gain
    pub kd: f64,

    /// Largest turn magnitude passed to the motors, also the magnitude of
    /// the search turn used when the line is lost. Defaults to the base
    /// speed.
    ///
    /// Units: duty
    #[serde(default)]
    pub max_turn: Option<f64>,

    // ---- MIXER ----

    /// Duty demanded from both motors when the robot is centred on the line
    pub base_speed: u16,

    /// Calibration factor applied to the left motor duty
    pub left_correction: f64,

    /// Calibration factor applied to the right motor duty
    pub right_correction: f64,

    /// Offset magnitude at which the deceleration reaches its floor
    pub curve_sensitivity: f64,

    /// Smallest speed factor applied on sharp curves, `1.0` disables
    /// deceleration
    pub min_speed_factor: f64,

    /// Smallest duty that still turns the motors
    pub duty_min: u16,

    /// Duty at 100% actuation
    pub duty_max: u16,

    // ---- TIMING ----

    /// Period of the control loop
    ///
    /// Units: milliseconds
    pub tick_period_ms: u64,

    /// Interval between telemetry packets
    ///
    /// Units: milliseconds
    pub tm_interval_ms: u64,

    /// Interval between polls of the command source
    ///
    /// Units: milliseconds
    pub tc_poll_interval_ms: u64,

    /// Interval between debug lines showing the sensor state, `0` disables
    /// them.
    ///
    /// Units: milliseconds
    #[serde(default)]
    pub debug_interval_ms: u64,
}
