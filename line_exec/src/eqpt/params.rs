//! Parameters for the line tracer hardware

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use super::Polarity;
use crate::sim::SimParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Hardware parameters, as read from `line_hw.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct HwParams {
    /// GPIO (BCM) number of each line sensor, leftmost first
    pub sensor_pins: Vec<u8>,

    /// GPIO (BCM) number of the kill switch, if one is fitted
    #[serde(default)]
    pub kill_switch_pin: Option<u8>,

    /// True if the kill switch pulls its pin low when pressed
    #[serde(default = "default_true")]
    pub kill_switch_active_low: bool,

    /// I2C address of the PCA9685 PWM board
    pub pca9685_address: u8,

    /// PWM frequency of the motor outputs
    ///
    /// Units: Hertz
    pub pwm_freq_hz: f64,

    /// Wiring of the left motor's H-bridge
    pub left_motor: MotorWiringParams,

    /// Wiring of the right motor's H-bridge
    pub right_motor: MotorWiringParams,

    /// Simulated chassis used in place of the hardware
    #[serde(default)]
    pub sim: SimParams,
}

/// H-bridge wiring of one motor.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MotorWiringParams {
    /// PWM channel connected to the bridge's forward input
    pub fwd_channel: u8,

    /// PWM channel connected to the bridge's reverse input
    pub rev_channel: u8,

    /// Which of the two inputs actually drives the wheel forwards
    pub polarity: Polarity,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn default_true() -> bool {
    true
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_hw_params() {
        let p: HwParams = util::params::from_str(r#"
            sensor_pins = [5, 6, 13, 19, 26, 16, 20, 21]
            kill_switch_pin = 4
            pca9685_address = 0x40
            pwm_freq_hz = 1000.0

            [left_motor]
            fwd_channel = 0
            rev_channel = 1
            polarity = "FwdPin"

            [right_motor]
            fwd_channel = 2
            rev_channel = 3
            polarity = "RevPin"
        "#).unwrap();

        assert_eq!(p.sensor_pins.len(), 8);
        assert_eq!(p.kill_switch_pin, Some(4));
        assert!(p.kill_switch_active_low);
        assert_eq!(p.pca9685_address, 0x40);
        assert_eq!(p.left_motor.polarity, Polarity::FwdPin);
        assert_eq!(p.right_motor.polarity, Polarity::RevPin);
        assert_eq!(p.sim, SimParams::default());
    }
}
