//! Property and closed loop tests of the line following pipeline.

use proptest::prelude::*;

use comms_if::eqpt::{ActuatorError, ActuatorSink, SensorError, SensorSource};

use line_lib::{
    loop_ctrl::{ControlLoop, LoopConfig, LoopParams, LoopState},
    pos_est::{self, PositionEstimate},
    sensor_array::DetectLevel,
    sim::{SimParams, SimWorld},
};

const WEIGHTS: [f64; 8] = [-7.0, -5.0, -3.0, -1.0, 1.0, 3.0, 5.0, 7.0];

fn params() -> LoopParams {
    LoopParams {
        num_sensors: 8,
        sensor_weights: WEIGHTS.to_vec(),
        detect_level: DetectLevel::Low,
        kp: -3000.0,
        kd: -1000.0,
        max_turn: None,
        base_speed: 20000,
        left_correction: 1.0,
        right_correction: 1.0,
        curve_sensitivity: 10.0,
        min_speed_factor: 0.3,
        duty_min: 5000,
        duty_max: 65535,
        tick_period_ms: 10,
        tm_interval_ms: 500,
        tc_poll_interval_ms: 100,
        debug_interval_ms: 0,
    }
}

proptest! {
    #[test]
    fn offset_is_mean_of_detected_weights(
        reading in prop::collection::vec(any::<bool>(), 8),
        last_offset in -7.0f64..7.0
    ) {
        let est = pos_est::estimate(&reading, &WEIGHTS, last_offset);

        let detected: Vec<f64> = reading
            .iter()
            .zip(WEIGHTS.iter())
            .filter(|(d, _)| **d)
            .map(|(_, w)| *w)
            .collect();

        if detected.is_empty() {
            prop_assert_eq!(est, PositionEstimate { offset: last_offset, detected: false });
        }
        else {
            let mean = detected.iter().sum::<f64>() / detected.len() as f64;
            prop_assert!(est.detected);
            prop_assert!((est.offset - mean).abs() < 1e-9);
            prop_assert!(est.offset >= -7.0 && est.offset <= 7.0);
        }
    }

    #[test]
    fn mirrored_reading_negates_offset(reading in prop::collection::vec(any::<bool>(), 8)) {
        let mirrored: Vec<bool> = reading.iter().rev().copied().collect();

        let est = pos_est::estimate(&reading, &WEIGHTS, 0.0);
        let est_mirrored = pos_est::estimate(&mirrored, &WEIGHTS, 0.0);

        prop_assert_eq!(est.detected, est_mirrored.detected);
        prop_assert!((est.offset + est_mirrored.offset).abs() < 1e-9);
    }
}

/// Sensor source always returning the same raw levels.
struct FixedLevels(Vec<bool>);

impl SensorSource for FixedLevels {
    fn read_all(&mut self) -> Result<Vec<bool>, SensorError> {
        Ok(self.0.clone())
    }
}

/// Actuator sink recording the last duties written.
#[derive(Default)]
struct LastDuty(Option<(u16, u16)>);

impl ActuatorSink for LastDuty {
    fn set_duty(&mut self, left: u16, right: u16) -> Result<(), ActuatorError> {
        self.0 = Some((left, right));
        Ok(())
    }

    fn stop(&mut self) -> Result<(), ActuatorError> {
        self.set_duty(0, 0)
    }
}

#[test]
fn centred_raw_reading_drives_straight() {
    let config = LoopConfig::from_params(&params()).unwrap();

    // Active low sensors, the middle two are over the line
    let levels = vec![true, true, true, false, false, true, true, true];

    let mut ctrl = ControlLoop::new(config, FixedLevels(levels), LastDuty::default());
    ctrl.start().unwrap();
    ctrl.tick().unwrap();

    let snap = ctrl.snapshot();
    assert!(snap.detected);
    assert_eq!(snap.offset, 0.0);
    assert_eq!(snap.turn, 0.0);
    assert_eq!(snap.cmd.left_duty, 20000);
    assert_eq!(snap.cmd.right_duty, 20000);
    assert_eq!(ctrl.mixer().sink().0, Some((20000, 20000)));
}

/// Run the loop against the simulated track, returning the line offset and
/// detection after every tick.
fn run_sim(params: &LoopParams, initial_offset: f64, num_ticks: usize) -> Vec<(f64, bool)> {
    let config = LoopConfig::from_params(params).unwrap();
    let dt_s = config.tick_period().as_secs_f64();

    let (world, sensors, motors) = SimWorld::build(
        SimParams {
            initial_offset,
            ..Default::default()
        },
        config.weights(),
        config.detect_level()
    );

    let mut ctrl = ControlLoop::new(config, sensors, motors);
    ctrl.start().unwrap();

    let mut trace = Vec::with_capacity(num_ticks);
    for _ in 0..num_ticks {
        ctrl.tick().unwrap();
        world.borrow_mut().step(dt_s);
        trace.push((world.borrow().line_offset(), ctrl.snapshot().detected));
    }

    assert_eq!(ctrl.state(), LoopState::Running);

    ctrl.stop().unwrap();
    assert_eq!(world.borrow().duties(), (0, 0));

    trace
}

#[test]
fn closed_loop_recentres_the_line() {
    let trace = run_sim(&params(), 3.0, 1000);

    for (i, (offset, detected)) in trace.iter().enumerate() {
        assert!(detected, "line lost on tick {}", i);

        if i >= 300 {
            assert!(offset.abs() < 0.5, "offset {} on tick {}", offset, i);
        }
    }
}

#[test]
fn closed_loop_finds_a_line_right_of_the_array() {
    // Nothing is seen at first, the search pivots right towards the line
    let trace = run_sim(&params(), 9.0, 1000);

    assert!(!trace[0].1);
    assert!(trace[1].0 < 9.0);

    for (i, (offset, detected)) in trace.iter().enumerate().skip(600) {
        assert!(detected, "line lost on tick {}", i);
        assert!(offset.abs() < 0.5, "offset {} on tick {}", offset, i);
    }
}

#[test]
fn closed_loop_with_positive_gains_loses_the_line() {
    let mut p = params();
    p.kp = 3000.0;
    p.kd = 1000.0;

    let trace = run_sim(&p, 3.0, 1000);

    assert!(trace.iter().any(|(_, detected)| !detected));
    assert!(trace[999].0 > 8.0);
}
