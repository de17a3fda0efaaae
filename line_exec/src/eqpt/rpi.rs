//! Raspberry Pi construction of the line tracer equipment

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::info;
use pwm_pca9685::{Address, Pca9685};
use rppal::{
    gpio::{Gpio, InputPin},
    i2c::I2c,
};

use super::{GpioKillSwitch, GpioSensorSource, HwParams, PwmActuatorSink};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Internal oscillator frequency of the PCA9685.
const PCA9685_OSC_HZ: f64 = 25_000_000.0;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RpiEqptError {
    #[error("GPIO error: {0}")]
    Gpio(rppal::gpio::Error),

    #[error("I2C error: {0}")]
    I2c(rppal::i2c::Error),

    #[error("Could not configure the PCA9685")]
    Pca9685,

    #[error("Could not set up the motors: {0}")]
    Motors(comms_if::eqpt::ActuatorError),
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Open the sensor pins with their pull-ups enabled.
pub fn sensor_source(params: &HwParams) -> Result<GpioSensorSource<InputPin>, RpiEqptError> {
    let gpio = Gpio::new().map_err(RpiEqptError::Gpio)?;

    let pins = params.sensor_pins
        .iter()
        .map(|&p| gpio.get(p).map(|pin| pin.into_input_pullup()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(RpiEqptError::Gpio)?;

    info!("Opened {} sensor pins", pins.len());

    Ok(GpioSensorSource::new(pins))
}

/// Open the kill switch pin, if there is one.
pub fn kill_switch(params: &HwParams) -> Result<Option<GpioKillSwitch<InputPin>>, RpiEqptError> {
    let pin_num = match params.kill_switch_pin {
        Some(p) => p,
        None => return Ok(None)
    };

    let gpio = Gpio::new().map_err(RpiEqptError::Gpio)?;
    let pin = gpio.get(pin_num).map_err(RpiEqptError::Gpio)?;

    let pin = match params.kill_switch_active_low {
        true => pin.into_input_pullup(),
        false => pin.into_input_pulldown()
    };

    info!("Kill switch on GPIO {}", pin_num);

    Ok(Some(GpioKillSwitch::new(pin, params.kill_switch_active_low)))
}

/// Open the PCA9685 board driving the motors and wire it up.
pub fn actuator_sink(params: &HwParams) -> Result<PwmActuatorSink<Pca9685<I2c>>, RpiEqptError> {
    let i2c = I2c::new().map_err(RpiEqptError::I2c)?;

    let mut pwm = Pca9685::new(i2c, Address::from(params.pca9685_address))
        .map_err(|_| RpiEqptError::Pca9685)?;

    // prescale = round(osc / (4096 * freq)) - 1, limited to the chip's range
    let prescale = (PCA9685_OSC_HZ / (4096.0 * params.pwm_freq_hz)).round() - 1.0;
    let prescale = util::maths::clamp(prescale, 3.0, 255.0) as u8;

    pwm.set_prescale(prescale).map_err(|_| RpiEqptError::Pca9685)?;
    pwm.enable().map_err(|_| RpiEqptError::Pca9685)?;

    info!(
        "PCA9685 at 0x{:02x} running at {} Hz (prescale {})",
        params.pca9685_address,
        params.pwm_freq_hz,
        prescale
    );

    PwmActuatorSink::from_params(pwm, &params.left_motor, &params.right_motor)
        .map_err(RpiEqptError::Motors)
}
