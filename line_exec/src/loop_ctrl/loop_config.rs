//! Validated configuration of the line following loop

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::time::Duration;
use thiserror::Error;

// Internal
use super::LoopParams;
use crate::sensor_array::DetectLevel;
use util::maths;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Tolerance used when checking the sensor weights mirror each other.
const WEIGHT_SYMMETRY_TOL: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Immutable configuration of the control loop.
///
/// Can only be built from [`LoopParams`] through [`LoopConfig::from_params`],
/// so holding one means the parameters have been checked. Nothing in the loop
/// can change it once built, changing a gain means restarting the executable.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopConfig {
    weights: Vec<f64>,
    detect_level: DetectLevel,

    kp: f64,
    kd: f64,
    max_turn: f64,

    base_speed: u16,
    left_correction: f64,
    right_correction: f64,
    curve_sensitivity: f64,
    min_speed_factor: f64,
    duty_min: u16,
    duty_max: u16,

    tick_period: Duration,
    tm_interval_ms: u64,
    tc_poll_interval_ms: u64,
    debug_interval_ms: u64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Problems found in the loop parameters. All of these are fatal.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("The sensor array must contain at least one sensor")]
    NoSensors,

    #[error("Expected one weight per sensor ({num_sensors}) but found {num_weights}")]
    WeightCountMismatch {
        num_sensors: usize,
        num_weights: usize
    },

    #[error("Sensor weights must strictly increase from left to right: {0:?}")]
    WeightsNotIncreasing(Vec<f64>),

    #[error("Sensor weights must be symmetric about zero: {0:?}")]
    WeightsNotSymmetric(Vec<f64>),

    #[error("Gain {0} must be finite, found {1}")]
    NonFiniteGain(&'static str, f64),

    #[error("kp ({kp}) and kd ({kd}) must not have opposite signs")]
    GainSignMismatch {
        kp: f64,
        kd: f64
    },

    #[error("The maximum turn must be finite and not negative, found {0}")]
    InvalidMaxTurn(f64),

    #[error("The {0} correction factor must be positive and finite, found {1}")]
    InvalidCorrection(&'static str, f64),

    #[error("The curve sensitivity must be positive and finite, found {0}")]
    InvalidCurveSensitivity(f64),

    #[error("The minimum speed factor must be in (0, 1], found {0}")]
    InvalidMinSpeedFactor(f64),

    #[error("The minimum duty ({min}) is larger than the maximum duty ({max})")]
    InvalidDutyBounds {
        min: u16,
        max: u16
    },

    #[error("The tick period must be at least 1 ms")]
    ZeroTickPeriod,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LoopConfig {

    /// Check the parameters and build the configuration from them.
    pub fn from_params(params: &LoopParams) -> Result<Self, ConfigError> {

        // ---- SENSORS ----

        if params.num_sensors == 0 {
            return Err(ConfigError::NoSensors)
        }

        if params.sensor_weights.len() != params.num_sensors {
            return Err(ConfigError::WeightCountMismatch {
                num_sensors: params.num_sensors,
                num_weights: params.sensor_weights.len()
            })
        }

        // NaN weights fail this check as well
        if !maths::is_strictly_increasing(&params.sensor_weights)
            || params.sensor_weights.iter().any(|w| !w.is_finite())
        {
            return Err(ConfigError::WeightsNotIncreasing(params.sensor_weights.clone()))
        }

        if !maths::is_symmetric_about_zero(&params.sensor_weights, WEIGHT_SYMMETRY_TOL) {
            return Err(ConfigError::WeightsNotSymmetric(params.sensor_weights.clone()))
        }

        // ---- CONTROLLER ----

        if !params.kp.is_finite() {
            return Err(ConfigError::NonFiniteGain("kp", params.kp))
        }
        if !params.kd.is_finite() {
            return Err(ConfigError::NonFiniteGain("kd", params.kd))
        }

        if params.kp * params.kd < 0.0 {
            return Err(ConfigError::GainSignMismatch {
                kp: params.kp,
                kd: params.kd
            })
        }

        let max_turn = params.max_turn.unwrap_or(params.base_speed as f64);
        if !max_turn.is_finite() || max_turn < 0.0 {
            return Err(ConfigError::InvalidMaxTurn(max_turn))
        }

        // ---- MIXER ----

        for (side, corr) in [
            ("left", params.left_correction),
            ("right", params.right_correction)
        ].iter() {
            if !corr.is_finite() || *corr <= 0.0 {
                return Err(ConfigError::InvalidCorrection(*side, *corr))
            }
        }

        if !params.curve_sensitivity.is_finite() || params.curve_sensitivity <= 0.0 {
            return Err(ConfigError::InvalidCurveSensitivity(params.curve_sensitivity))
        }

        if !(params.min_speed_factor > 0.0 && params.min_speed_factor <= 1.0) {
            return Err(ConfigError::InvalidMinSpeedFactor(params.min_speed_factor))
        }

        if params.duty_min > params.duty_max {
            return Err(ConfigError::InvalidDutyBounds {
                min: params.duty_min,
                max: params.duty_max
            })
        }

        // ---- TIMING ----

        if params.tick_period_ms == 0 {
            return Err(ConfigError::ZeroTickPeriod)
        }

        Ok(Self {
            weights: params.sensor_weights.clone(),
            detect_level: params.detect_level,
            kp: params.kp,
            kd: params.kd,
            max_turn,
            base_speed: params.base_speed,
            left_correction: params.left_correction,
            right_correction: params.right_correction,
            curve_sensitivity: params.curve_sensitivity,
            min_speed_factor: params.min_speed_factor,
            duty_min: params.duty_min,
            duty_max: params.duty_max,
            tick_period: Duration::from_millis(params.tick_period_ms),
            tm_interval_ms: params.tm_interval_ms,
            tc_poll_interval_ms: params.tc_poll_interval_ms,
            debug_interval_ms: params.debug_interval_ms,
        })
    }

    /// Number of sensors in the array.
    pub fn num_sensors(&self) -> usize {
        self.weights.len()
    }

    /// Per-sensor weights, leftmost first.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn detect_level(&self) -> DetectLevel {
        self.detect_level
    }

    pub fn kp(&self) -> f64 {
        self.kp
    }

    pub fn kd(&self) -> f64 {
        self.kd
    }

    /// Sign of the turn which corrects a positive offset.
    ///
    /// The gains carry the steering convention: with the sensor weights
    /// increasing to the robot's right and a positive turn speeding up the
    /// right wheel, a real chassis needs negative gains and this is `-1`.
    pub fn steer_sign(&self) -> f64 {
        if self.kp < 0.0 || (self.kp == 0.0 && self.kd < 0.0) {
            -1.0
        }
        else {
            1.0
        }
    }

    /// Largest turn magnitude, also the magnitude of the search turn.
    pub fn max_turn(&self) -> f64 {
        self.max_turn
    }

    pub fn base_speed(&self) -> u16 {
        self.base_speed
    }

    pub fn left_correction(&self) -> f64 {
        self.left_correction
    }

    pub fn right_correction(&self) -> f64 {
        self.right_correction
    }

    pub fn curve_sensitivity(&self) -> f64 {
        self.curve_sensitivity
    }

    pub fn min_speed_factor(&self) -> f64 {
        self.min_speed_factor
    }

    pub fn duty_min(&self) -> u16 {
        self.duty_min
    }

    pub fn duty_max(&self) -> u16 {
        self.duty_max
    }

    /// Period the loop is ticked at.
    pub fn tick_period(&self) -> Duration {
        self.tick_period
    }

    pub fn tick_period_ms(&self) -> u64 {
        self.tick_period.as_millis() as u64
    }

    pub fn tm_interval_ms(&self) -> u64 {
        self.tm_interval_ms
    }

    pub fn tc_poll_interval_ms(&self) -> u64 {
        self.tc_poll_interval_ms
    }

    pub fn debug_interval_ms(&self) -> u64 {
        self.debug_interval_ms
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

/// Parameters of the reference robot used throughout the unit tests.
#[cfg(test)]
pub(crate) fn test_params() -> LoopParams {
    LoopParams {
        num_sensors: 8,
        sensor_weights: vec![-7.0, -5.0, -3.0, -1.0, 1.0, 3.0, 5.0, 7.0],
        detect_level: DetectLevel::Low,
        kp: 50.0,
        kd: 10.0,
        max_turn: None,
        base_speed: 30000,
        left_correction: 1.0,
        right_correction: 1.0,
        curve_sensitivity: 10.0,
        min_speed_factor: 1.0,
        duty_min: 5000,
        duty_max: 65535,
        tick_period_ms: 10,
        tm_interval_ms: 500,
        tc_poll_interval_ms: 100,
        debug_interval_ms: 0,
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> LoopConfig {
    LoopConfig::from_params(&test_params()).unwrap()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_valid_params() {
        let cfg = test_config();
        assert_eq!(cfg.num_sensors(), 8);
        assert_eq!(cfg.max_turn(), 30000.0);
        assert_eq!(cfg.tick_period(), Duration::from_millis(10));

        let mut params = test_params();
        params.max_turn = Some(12000.0);
        assert_eq!(LoopConfig::from_params(&params).unwrap().max_turn(), 12000.0);
    }

    #[test]
    fn test_steer_sign() {
        assert_eq!(test_config().steer_sign(), 1.0);

        let mut params = test_params();
        params.kp = -50.0;
        params.kd = -10.0;
        assert_eq!(LoopConfig::from_params(&params).unwrap().steer_sign(), -1.0);

        params.kp = 0.0;
        assert_eq!(LoopConfig::from_params(&params).unwrap().steer_sign(), -1.0);

        params.kd = 0.0;
        assert_eq!(LoopConfig::from_params(&params).unwrap().steer_sign(), 1.0);
    }

    #[test]
    fn test_sensor_errors() {
        let mut params = test_params();
        params.num_sensors = 0;
        params.sensor_weights = vec![];
        assert_eq!(LoopConfig::from_params(&params), Err(ConfigError::NoSensors));

        let mut params = test_params();
        params.num_sensors = 6;
        assert_eq!(
            LoopConfig::from_params(&params),
            Err(ConfigError::WeightCountMismatch { num_sensors: 6, num_weights: 8 })
        );

        let mut params = test_params();
        params.sensor_weights = vec![-7.0, -5.0, -1.0, -3.0, 3.0, 1.0, 5.0, 7.0];
        assert!(matches!(
            LoopConfig::from_params(&params),
            Err(ConfigError::WeightsNotIncreasing(_))
        ));

        let mut params = test_params();
        params.sensor_weights[7] = f64::NAN;
        assert!(matches!(
            LoopConfig::from_params(&params),
            Err(ConfigError::WeightsNotIncreasing(_))
        ));

        let mut params = test_params();
        params.sensor_weights = vec![-7.0, -5.0, -3.0, -1.0, 1.0, 3.0, 5.0, 8.0];
        assert!(matches!(
            LoopConfig::from_params(&params),
            Err(ConfigError::WeightsNotSymmetric(_))
        ));
    }

    #[test]
    fn test_mixer_errors() {
        let mut params = test_params();
        params.duty_min = 60000;
        params.duty_max = 50000;
        assert_eq!(
            LoopConfig::from_params(&params),
            Err(ConfigError::InvalidDutyBounds { min: 60000, max: 50000 })
        );

        let mut params = test_params();
        params.left_correction = 0.0;
        assert_eq!(
            LoopConfig::from_params(&params),
            Err(ConfigError::InvalidCorrection("left", 0.0))
        );

        let mut params = test_params();
        params.curve_sensitivity = -1.0;
        assert_eq!(
            LoopConfig::from_params(&params),
            Err(ConfigError::InvalidCurveSensitivity(-1.0))
        );

        for factor in [0.0, 1.5].iter() {
            let mut params = test_params();
            params.min_speed_factor = *factor;
            assert_eq!(
                LoopConfig::from_params(&params),
                Err(ConfigError::InvalidMinSpeedFactor(*factor))
            );
        }
    }

    #[test]
    fn test_ctrl_errors() {
        let mut params = test_params();
        params.kd = f64::INFINITY;
        assert_eq!(
            LoopConfig::from_params(&params),
            Err(ConfigError::NonFiniteGain("kd", f64::INFINITY))
        );

        let mut params = test_params();
        params.max_turn = Some(-1.0);
        assert_eq!(
            LoopConfig::from_params(&params),
            Err(ConfigError::InvalidMaxTurn(-1.0))
        );

        let mut params = test_params();
        params.kd = -10.0;
        assert_eq!(
            LoopConfig::from_params(&params),
            Err(ConfigError::GainSignMismatch { kp: 50.0, kd: -10.0 })
        );

        let mut params = test_params();
        params.tick_period_ms = 0;
        assert_eq!(LoopConfig::from_params(&params), Err(ConfigError::ZeroTickPeriod));
    }
}
