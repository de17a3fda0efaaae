//! # Simulated line tracer
//!
//! A very small model of the robot on a track, so the executable and the tests can run the full
//! loop without hardware. The world tracks only the lateral position of the line under the sensor
//! array, in the same units as the sensor weights.
//!
//! The chassis follows differential drive kinematics: driving the right motor faster than the left
//! pivots the robot left, which moves a fixed line towards the positive (right) side of the array.
//! A positive turn therefore pushes the line further right, and the controller needs negative gains
//! to recentre it.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use serde::Deserialize;
use std::{cell::RefCell, rc::Rc};

// Internal
use comms_if::eqpt::{ActuatorError, ActuatorSink, SensorError, SensorSource};
use crate::sensor_array::DetectLevel;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the simulated world.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimParams {
    /// Offset of the line at the start of the simulation
    pub initial_offset: f64,

    /// Rate the line drifts across the array with no steering, i.e. how
    /// sharply the track curves
    ///
    /// Units: weight units per second
    pub drift_rate: f64,

    /// Rate the line moves across the array for a full scale difference in
    /// motor duties
    ///
    /// Units: weight units per second
    pub steer_gain: f64,

    /// A sensor sees the line if its weight is within this distance of the
    /// line offset
    pub line_half_width: f64,
}

/// The simulated world.
#[derive(Debug)]
pub struct SimWorld {
    params: SimParams,

    /// Sensor positions, same as the sensor weights
    sensor_positions: Vec<f64>,

    detect_level: DetectLevel,

    line_offset: f64,

    left_duty: u16,
    right_duty: u16,

    time_s: f64,
}

/// Shared handle to the simulated world.
pub type SimHandle = Rc<RefCell<SimWorld>>;

/// The simulated sensor array.
pub struct SimSensors(SimHandle);

/// The simulated motors.
pub struct SimMotors(SimHandle);

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for SimParams {
    fn default() -> Self {
        Self {
            initial_offset: 3.0,
            drift_rate: 0.0,
            steer_gain: 20.0,
            line_half_width: 1.0,
        }
    }
}

impl SimWorld {
    /// Create a new world with sensors at the given positions.
    pub fn new(params: SimParams, sensor_positions: &[f64], detect_level: DetectLevel) -> Self {
        Self {
            line_offset: params.initial_offset,
            params,
            sensor_positions: sensor_positions.to_vec(),
            detect_level,
            left_duty: 0,
            right_duty: 0,
            time_s: 0.0,
        }
    }

    /// Create the world along with the sensor source and actuator sink that
    /// act on it.
    pub fn build(
        params: SimParams,
        sensor_positions: &[f64],
        detect_level: DetectLevel
    ) -> (SimHandle, SimSensors, SimMotors) {
        let world = Rc::new(RefCell::new(Self::new(params, sensor_positions, detect_level)));
        (world.clone(), SimSensors(world.clone()), SimMotors(world))
    }

    /// Advance the world by `dt_s` seconds using the current motor duties.
    pub fn step(&mut self, dt_s: f64) {
        let steer = (self.right_duty as f64 - self.left_duty as f64) / u16::MAX as f64;

        self.line_offset += (self.params.drift_rate + self.params.steer_gain * steer) * dt_s;
        self.time_s += dt_s;
    }

    /// Which sensors are over the line.
    pub fn detections(&self) -> Vec<bool> {
        self.sensor_positions
            .iter()
            .map(|p| (p - self.line_offset).abs() <= self.params.line_half_width)
            .collect()
    }

    /// Raw sensor levels, as the hardware would output them.
    pub fn levels(&self) -> Vec<bool> {
        self.detections()
            .into_iter()
            .map(|d| match self.detect_level {
                DetectLevel::Low => !d,
                DetectLevel::High => d
            })
            .collect()
    }

    /// True offset of the line from the centre of the array.
    pub fn line_offset(&self) -> f64 {
        self.line_offset
    }

    pub fn duties(&self) -> (u16, u16) {
        (self.left_duty, self.right_duty)
    }

    /// Simulated time elapsed.
    ///
    /// Units: seconds
    pub fn time_s(&self) -> f64 {
        self.time_s
    }
}

impl SensorSource for SimSensors {
    fn read_all(&mut self) -> Result<Vec<bool>, SensorError> {
        self.0
            .try_borrow()
            .map(|w| w.levels())
            .map_err(|_| SensorError::DeviceUnavailable("simulation busy".into()))
    }
}

impl ActuatorSink for SimMotors {
    fn set_duty(&mut self, left: u16, right: u16) -> Result<(), ActuatorError> {
        let mut world = self.0
            .try_borrow_mut()
            .map_err(|_| ActuatorError::DeviceUnavailable("simulation busy".into()))?;

        world.left_duty = left;
        world.right_duty = right;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), ActuatorError> {
        self.set_duty(0, 0)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const WEIGHTS: [f64; 8] = [-7.0, -5.0, -3.0, -1.0, 1.0, 3.0, 5.0, 7.0];

    #[test]
    fn test_sensors() {
        let params = SimParams { initial_offset: 0.0, ..Default::default() };
        let (world, mut sensors, _) = SimWorld::build(params, &WEIGHTS, DetectLevel::Low);

        assert_eq!(
            world.borrow().detections(),
            vec![false, false, false, true, true, false, false, false]
        );
        assert_eq!(
            sensors.read_all().unwrap(),
            vec![true, true, true, false, false, true, true, true]
        );
    }

    #[test]
    fn test_steering() {
        let params = SimParams { initial_offset: 0.0, ..Default::default() };
        let (world, _, mut motors) = SimWorld::build(params, &WEIGHTS, DetectLevel::Low);

        // Right faster than left pivots left, the line moves right
        motors.set_duty(0, u16::MAX).unwrap();
        world.borrow_mut().step(0.1);
        assert!((world.borrow().line_offset() - 2.0).abs() < 1e-9);

        motors.stop().unwrap();
        world.borrow_mut().step(0.1);
        assert!((world.borrow().line_offset() - 2.0).abs() < 1e-9);
        assert_eq!(world.borrow().duties(), (0, 0));

        // Left faster pivots right and brings it back
        motors.set_duty(u16::MAX, 0).unwrap();
        world.borrow_mut().step(0.1);
        assert!(world.borrow().line_offset().abs() < 1e-9);
        assert!((world.borrow().time_s() - 0.3).abs() < 1e-9);
    }
}
