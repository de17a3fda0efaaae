//! # Control Tick Benchmark

use criterion::{criterion_group, criterion_main, Criterion};

use line_lib::{
    loop_ctrl::{ControlLoop, LoopConfig, LoopParams},
    sensor_array::DetectLevel,
    sim::{SimParams, SimWorld},
};

fn tick_benchmark(c: &mut Criterion) {
    // ---- Build the simulated robot ----

    let params = LoopParams {
        num_sensors: 8,
        sensor_weights: vec![-7.0, -5.0, -3.0, -1.0, 1.0, 3.0, 5.0, 7.0],
        detect_level: DetectLevel::Low,
        kp: -3000.0,
        kd: -1000.0,
        max_turn: None,
        base_speed: 20000,
        left_correction: 0.77,
        right_correction: 1.0,
        curve_sensitivity: 10.0,
        min_speed_factor: 0.3,
        duty_min: 5000,
        duty_max: 65535,
        tick_period_ms: 10,
        tm_interval_ms: 500,
        tc_poll_interval_ms: 100,
        debug_interval_ms: 0,
    };
    let config = LoopConfig::from_params(&params).unwrap();
    let dt_s = config.tick_period().as_secs_f64();

    let (world, sensors, motors) = SimWorld::build(
        SimParams::default(),
        config.weights(),
        config.detect_level()
    );

    let mut ctrl = ControlLoop::new(config, sensors, motors);
    ctrl.start().unwrap();

    // ---- Benchmark ----

    c.bench_function("control_tick", |b| {
        b.iter(|| {
            ctrl.tick().unwrap();
            world.borrow_mut().step(dt_s);
        })
    });
}

criterion_group!(benches, tick_benchmark);
criterion_main!(benches);
