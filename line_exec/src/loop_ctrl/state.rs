//! Implementations for the ControlLoop state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, trace, warn};
use serde::Serialize;

// Internal
use super::{EStopHandle, LoopConfig, LoopCtrlError, LoopState};
use crate::{
    motor_mixer::{MotorCommand, MotorMixer},
    pd_ctrl::PdCtrl,
    pos_est,
    sensor_array::{SensorArray, SensorReading},
};
use comms_if::eqpt::{ActuatorSink, SensorSource};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The line following control loop.
pub struct ControlLoop<S: SensorSource, A: ActuatorSink> {
    config: LoopConfig,

    sensors: SensorArray<S>,
    pd_ctrl: PdCtrl,
    mixer: MotorMixer<A>,

    state: LoopState,
    estop: EStopHandle,

    snapshot: LoopSnapshot,
}

/// The latest values computed by the loop, for telemetry and debugging.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoopSnapshot {
    /// Number of ticks executed
    pub cycle: u64,

    /// Line detections of the last tick, leftmost first
    pub sensors: SensorReading,

    /// Line offset of the last tick, or the last known offset if the line was
    /// lost
    pub offset: f64,

    /// True if the line was seen on the last tick
    pub detected: bool,

    /// Turn output by the controller, before saturation
    pub turn: f64,

    /// Last command written to the motors
    pub cmd: MotorCommand,

    /// Base speed duty
    pub base_speed: u16,

    pub state: LoopState,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<S: SensorSource, A: ActuatorSink> ControlLoop<S, A> {

    /// Create a new loop in the `Stopped` state.
    ///
    /// The motors are not touched until the first lifecycle call.
    pub fn new(config: LoopConfig, sensor_source: S, actuator_sink: A) -> Self {
        let sensors = SensorArray::new(
            sensor_source,
            config.num_sensors(),
            config.detect_level()
        );

        let snapshot = LoopSnapshot {
            sensors: vec![false; config.num_sensors()],
            base_speed: config.base_speed(),
            ..Default::default()
        };

        Self {
            config,
            sensors,
            pd_ctrl: PdCtrl::new(),
            mixer: MotorMixer::new(actuator_sink),
            state: LoopState::Stopped,
            estop: EStopHandle::new(),
            snapshot,
        }
    }

    /// Begin following the line.
    ///
    /// Only valid from `Stopped`. Clears the controller history so nothing
    /// from a previous run leaks into this one.
    pub fn start(&mut self) -> Result<(), LoopCtrlError> {
        if self.state != LoopState::Stopped {
            return Err(LoopCtrlError::InvalidTransition {
                from: self.state,
                request: "start"
            })
        }

        if self.estop.is_triggered() {
            warn!("Start refused, an emergency stop has been requested");
            self.mixer.write_stop();
            self.snapshot.cmd = MotorCommand::STOP;
            return Err(LoopCtrlError::EmergencyStopLatched)
        }

        self.pd_ctrl.reset();
        self.set_state(LoopState::Running);

        Ok(())
    }

    /// Execute one cycle of line following.
    ///
    /// Only valid while `Running`, otherwise nothing is read or written. A
    /// pending emergency stop request is honoured instead of running the
    /// cycle. Sensor and motor faults are absorbed, they never make this
    /// return an error.
    pub fn tick(&mut self) -> Result<(), LoopCtrlError> {
        if self.state != LoopState::Running {
            return Err(LoopCtrlError::NotRunning(self.state))
        }

        if self.estop.is_triggered() {
            self.enter_emergency_stop();
            return Ok(())
        }

        // ---- PIPELINE ----

        let reading = self.sensors.read();

        let estimate = pos_est::estimate(
            &reading,
            self.config.weights(),
            self.pd_ctrl.last_offset()
        );

        let turn = self.pd_ctrl.step(&estimate, &self.config);

        let cmd = self.mixer.drive(
            self.config.base_speed(),
            estimate.offset,
            turn,
            &self.config
        );

        self.snapshot.cycle += 1;
        self.snapshot.sensors = reading;
        self.snapshot.offset = estimate.offset;
        self.snapshot.detected = estimate.detected;
        self.snapshot.turn = turn;

        // The stop request may have arrived during the read
        if self.estop.is_triggered() {
            self.enter_emergency_stop();
            return Ok(())
        }

        self.mixer.write(&cmd);
        self.snapshot.cmd = cmd;

        trace!(
            "Tick {}: offset {:+.2} ({}), turn {:+.1}, duty L {} R {}",
            self.snapshot.cycle,
            estimate.offset,
            if estimate.detected { "ON" } else { "LOST" },
            turn,
            cmd.left_duty,
            cmd.right_duty
        );

        Ok(())
    }

    /// Stop following the line.
    ///
    /// The stop command is always written first. From `Running` the loop
    /// returns to `Stopped`, from `EmergencyStopped` it stays where it is.
    pub fn stop(&mut self) -> Result<(), LoopCtrlError> {
        self.mixer.write_stop();
        self.snapshot.cmd = self.mixer.stop();

        if self.state == LoopState::Running {
            self.set_state(LoopState::Stopped);
        }

        Ok(())
    }

    /// Stop the motors and latch the loop in `EmergencyStopped`.
    ///
    /// The motors are zeroed before anything else happens, whatever the
    /// state. Repeated calls are harmless. Calling this while `Stopped` still
    /// zeroes the motors but is reported as an invalid transition.
    pub fn emergency_stop(&mut self) -> Result<(), LoopCtrlError> {
        self.mixer.write_stop();
        self.snapshot.cmd = MotorCommand::STOP;

        match self.state {
            LoopState::Running => {
                self.estop.trigger();
                self.set_state(LoopState::EmergencyStopped);
                Ok(())
            },
            LoopState::EmergencyStopped => Ok(()),
            LoopState::Stopped => Err(LoopCtrlError::InvalidTransition {
                from: self.state,
                request: "emergency stop"
            })
        }
    }

    /// Directly drive the motors while line following is stopped.
    ///
    /// The duties are clamped into the configured bounds. Returns the command
    /// actually written.
    pub fn drive_manual(
        &mut self,
        left_duty: u16,
        right_duty: u16
    ) -> Result<MotorCommand, LoopCtrlError> {
        if self.state != LoopState::Stopped {
            return Err(LoopCtrlError::InvalidTransition {
                from: self.state,
                request: "drive manually"
            })
        }

        if self.estop.is_triggered() {
            return Err(LoopCtrlError::EmergencyStopLatched)
        }

        let cmd = self.mixer.limit(left_duty, right_duty, &self.config);
        self.mixer.write(&cmd);
        self.snapshot.cmd = cmd;

        Ok(cmd)
    }

    /// Get a handle which can trigger an emergency stop from elsewhere.
    pub fn estop_handle(&self) -> EStopHandle {
        self.estop.clone()
    }

    /// Latest values computed by the loop.
    pub fn snapshot(&self) -> &LoopSnapshot {
        &self.snapshot
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// Number of discarded sensor reads.
    pub fn sensor_fault_count(&self) -> u64 {
        self.sensors.fault_count()
    }

    /// Number of failed motor writes.
    pub fn actuator_fault_count(&self) -> u64 {
        self.mixer.fault_count()
    }

    /// Access the motor mixer, and through it the actuator sink.
    pub fn mixer(&self) -> &MotorMixer<A> {
        &self.mixer
    }

    fn enter_emergency_stop(&mut self) {
        self.mixer.write_stop();
        self.snapshot.cmd = MotorCommand::STOP;
        self.set_state(LoopState::EmergencyStopped);
    }

    fn set_state(&mut self, state: LoopState) {
        if state != self.state {
            info!("Control loop {} -> {}", self.state, state);
        }
        self.state = state;
        self.snapshot.state = state;
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::loop_ctrl::{test_config, test_params};
    use comms_if::eqpt::{ActuatorError, SensorError};
    use std::{cell::RefCell, rc::Rc};

    /// Raw levels for a reading where the listed sensors see the line.
    fn line_at(indices: &[usize]) -> Vec<bool> {
        (0..8).map(|i| !indices.contains(&i)).collect()
    }

    /// Sensor source returning whatever the test last put in it.
    #[derive(Clone)]
    struct SharedSource(Rc<RefCell<Result<Vec<bool>, SensorError>>>);

    impl SensorSource for SharedSource {
        fn read_all(&mut self) -> Result<Vec<bool>, SensorError> {
            self.0.borrow().clone()
        }
    }

    /// Log of every operation on the motors.
    #[derive(Debug, Clone, Copy, PartialEq)]
    enum MotorOp {
        Duty(u16, u16),
        Stop,
    }

    #[derive(Clone, Default)]
    struct SharedSink {
        ops: Rc<RefCell<Vec<MotorOp>>>,
        fail: Rc<RefCell<bool>>,
    }

    impl ActuatorSink for SharedSink {
        fn set_duty(&mut self, left: u16, right: u16) -> Result<(), ActuatorError> {
            if *self.fail.borrow() {
                return Err(ActuatorError::WriteFailed(0))
            }
            self.ops.borrow_mut().push(MotorOp::Duty(left, right));
            Ok(())
        }

        fn stop(&mut self) -> Result<(), ActuatorError> {
            self.ops.borrow_mut().push(MotorOp::Stop);
            Ok(())
        }
    }

    struct Rig {
        source: SharedSource,
        sink: SharedSink,
        ctrl: ControlLoop<SharedSource, SharedSink>,
    }

    fn rig_with(config: LoopConfig) -> Rig {
        let source = SharedSource(Rc::new(RefCell::new(Ok(line_at(&[3, 4])))));
        let sink = SharedSink::default();
        let ctrl = ControlLoop::new(config, source.clone(), sink.clone());
        Rig { source, sink, ctrl }
    }

    fn rig() -> Rig {
        rig_with(test_config())
    }

    impl Rig {
        fn set_levels(&self, levels: Vec<bool>) {
            *self.source.0.borrow_mut() = Ok(levels);
        }

        fn ops(&self) -> Vec<MotorOp> {
            self.sink.ops.borrow().clone()
        }
    }

    #[test]
    fn test_lifecycle() {
        let mut r = rig();
        assert_eq!(r.ctrl.state(), LoopState::Stopped);

        r.ctrl.start().unwrap();
        assert_eq!(r.ctrl.state(), LoopState::Running);
        assert!(matches!(
            r.ctrl.start(),
            Err(LoopCtrlError::InvalidTransition { from: LoopState::Running, .. })
        ));

        r.ctrl.stop().unwrap();
        assert_eq!(r.ctrl.state(), LoopState::Stopped);
        assert_eq!(r.ops(), vec![MotorOp::Stop]);

        // Can be restarted after a normal stop
        r.ctrl.start().unwrap();
        assert_eq!(r.ctrl.snapshot().state, LoopState::Running);
    }

    #[test]
    fn test_tick_not_running() {
        let mut r = rig();
        assert_eq!(
            r.ctrl.tick(),
            Err(LoopCtrlError::NotRunning(LoopState::Stopped))
        );
        assert!(r.ops().is_empty());
        assert_eq!(r.ctrl.snapshot().cycle, 0);
    }

    #[test]
    fn test_tick_centred() {
        let mut r = rig();
        r.ctrl.start().unwrap();
        r.ctrl.tick().unwrap();

        let snap = r.ctrl.snapshot();
        assert_eq!(snap.offset, 0.0);
        assert!(snap.detected);
        assert_eq!(snap.turn, 0.0);
        assert_eq!(snap.cmd.left_duty, snap.cmd.right_duty);
        assert_eq!(snap.cycle, 1);
        assert_eq!(r.ops(), vec![MotorOp::Duty(30000, 30000)]);
    }

    #[test]
    fn test_tick_idempotent_without_derivative() {
        let mut params = test_params();
        params.kd = 0.0;
        let mut r = rig_with(LoopConfig::from_params(&params).unwrap());
        r.set_levels(line_at(&[5, 6]));

        r.ctrl.start().unwrap();
        r.ctrl.tick().unwrap();
        let first = r.ctrl.snapshot().clone();
        r.ctrl.tick().unwrap();
        let second = r.ctrl.snapshot().clone();

        assert_eq!(first.turn, second.turn);
        assert_eq!(first.cmd, second.cmd);
        assert_eq!(first.turn, 200.0);
    }

    #[test]
    fn test_restart_resets_controller() {
        let mut r = rig();
        r.set_levels(line_at(&[7]));
        r.ctrl.start().unwrap();
        r.ctrl.tick().unwrap();
        r.ctrl.stop().unwrap();

        r.set_levels(line_at(&[5, 6]));
        r.ctrl.start().unwrap();
        r.ctrl.tick().unwrap();

        // kp * 4 + kd * (4 - 0), no history from the first run
        assert_eq!(r.ctrl.snapshot().turn, 240.0);
    }

    #[test]
    fn test_line_loss_searches() {
        let mut r = rig();
        r.set_levels(line_at(&[0, 1]));
        r.ctrl.start().unwrap();
        r.ctrl.tick().unwrap();

        r.set_levels(line_at(&[]));
        r.ctrl.tick().unwrap();
        let first = r.ctrl.snapshot().clone();
        r.ctrl.tick().unwrap();
        let second = r.ctrl.snapshot().clone();

        assert!(!first.detected);
        assert_eq!(first.offset, -6.0);
        assert_eq!(first.turn, -30000.0);
        assert_eq!(second.turn, first.turn);
        assert_eq!(first.cmd, MotorCommand { left_duty: 60000, right_duty: 5000 });
    }

    #[test]
    fn test_sensor_fault_is_line_loss() {
        let mut r = rig();
        r.set_levels(line_at(&[6]));
        r.ctrl.start().unwrap();
        r.ctrl.tick().unwrap();

        *r.source.0.borrow_mut() = Err(SensorError::ReadFailed(3));
        r.ctrl.tick().unwrap();

        assert_eq!(r.ctrl.state(), LoopState::Running);
        assert!(!r.ctrl.snapshot().detected);
        assert_eq!(r.ctrl.snapshot().turn, 30000.0);
        assert_eq!(r.ctrl.sensor_fault_count(), 1);
    }

    #[test]
    fn test_actuator_fault_absorbed() {
        let mut r = rig();
        r.ctrl.start().unwrap();

        *r.sink.fail.borrow_mut() = true;
        assert!(r.ctrl.tick().is_ok());
        assert!(r.ctrl.tick().is_ok());
        assert_eq!(r.ctrl.actuator_fault_count(), 2);

        *r.sink.fail.borrow_mut() = false;
        r.ctrl.tick().unwrap();
        assert_eq!(r.ops(), vec![MotorOp::Duty(30000, 30000)]);
    }

    #[test]
    fn test_emergency_stop() {
        let mut r = rig();

        // Not valid from stopped, but the motors are still zeroed
        assert!(matches!(
            r.ctrl.emergency_stop(),
            Err(LoopCtrlError::InvalidTransition { from: LoopState::Stopped, .. })
        ));
        assert_eq!(r.ops(), vec![MotorOp::Stop]);

        r.ctrl.start().unwrap();
        r.ctrl.tick().unwrap();
        r.ctrl.emergency_stop().unwrap();
        assert_eq!(r.ctrl.state(), LoopState::EmergencyStopped);
        assert_eq!(r.ctrl.snapshot().cmd, MotorCommand::STOP);

        // Idempotent
        r.ctrl.emergency_stop().unwrap();
        assert_eq!(r.ctrl.state(), LoopState::EmergencyStopped);

        // Absorbing
        assert!(r.ctrl.start().is_err());
        assert!(r.ctrl.tick().is_err());
        assert!(r.ctrl.drive_manual(8000, 8000).is_err());

        // Stop re-issues zero duty without leaving the state
        r.ctrl.stop().unwrap();
        assert_eq!(r.ctrl.state(), LoopState::EmergencyStopped);
        assert_eq!(
            r.ops(),
            vec![
                MotorOp::Stop,
                MotorOp::Duty(30000, 30000),
                MotorOp::Stop,
                MotorOp::Stop,
                MotorOp::Stop
            ]
        );
    }

    #[test]
    fn test_estop_handle() {
        let mut r = rig();
        let handle = r.ctrl.estop_handle();

        r.ctrl.start().unwrap();
        r.ctrl.tick().unwrap();

        handle.trigger();
        r.ctrl.tick().unwrap();

        assert_eq!(r.ctrl.state(), LoopState::EmergencyStopped);
        assert_eq!(r.ops(), vec![MotorOp::Duty(30000, 30000), MotorOp::Stop]);
        assert_eq!(r.ctrl.snapshot().cycle, 1);
    }

    #[test]
    fn test_estop_handle_blocks_start() {
        let mut r = rig();
        r.ctrl.estop_handle().trigger();

        assert_eq!(r.ctrl.start(), Err(LoopCtrlError::EmergencyStopLatched));
        assert_eq!(r.ctrl.state(), LoopState::Stopped);
        assert_eq!(r.ops(), vec![MotorOp::Stop]);
    }

    #[test]
    fn test_manual_drive() {
        let mut r = rig();

        let cmd = r.ctrl.drive_manual(100, 9000).unwrap();
        assert_eq!(cmd, MotorCommand { left_duty: 5000, right_duty: 9000 });
        assert_eq!(r.ops(), vec![MotorOp::Duty(5000, 9000)]);

        r.ctrl.start().unwrap();
        assert!(r.ctrl.drive_manual(8000, 8000).is_err());
    }
}
