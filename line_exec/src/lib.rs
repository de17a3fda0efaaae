//! # Line tracer library.
//!
//! This library allows other crates in the workspace, and the benchmarks and
//! tests, to access items defined inside the line tracer crate.
//!
//! Each control cycle runs
//! `SensorArray::read -> pos_est::estimate -> PdCtrl::step -> MotorMixer::drive -> MotorMixer::write`
//! inside [`loop_ctrl::ControlLoop::tick`].

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Sensor array - turns raw sensor levels into line detections
pub mod sensor_array;

/// Position estimation - converts line detections into an offset from the line
pub mod pos_est;

/// PD controller - converts the offset into a turn correction
pub mod pd_ctrl;

/// Motor mixer - converts the base speed and turn into motor duties
pub mod motor_mixer;

/// Control loop - runs the line following pipeline and its lifecycle
pub mod loop_ctrl;

/// Telemetry client - publishes loop snapshots without blocking the loop
pub mod tm_client;

/// Equipment drivers - the sensor and motor hardware
pub mod eqpt;

/// Simulation - a simulated robot and track
pub mod sim;

/// Data store - state shared between the executable's modules
pub mod data_store;
