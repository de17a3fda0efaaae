//! PWM motor drivers
//!
//! Each motor is driven by an H-bridge with a forward and a reverse input. Which input actually
//! turns the wheel forwards depends on how the motor was wired, so it is given per motor by a
//! [`Polarity`] rather than assumed.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use embedded_hal::blocking::i2c::{Write, WriteRead};
use embedded_hal::PwmPin;
use log::{error, info};
use pwm_pca9685::{Channel, Pca9685};
use serde::Deserialize;

use comms_if::eqpt::{ActuatorError, ActuatorSink};
use super::MotorWiringParams;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of counts in one PCA9685 PWM period.
const PCA9685_MAX_PWM: u16 = 4096;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Trait to provide a unified API for PWM boards and pins driving the motors.
pub trait MotorDriver {

    /// The type the underlying driver uses to identify a channel
    type Channel: Copy;

    /// Set the duty cycle of a channel.
    ///
    /// `duty_cycle` is between 0.0 and 1.0, values outside this range are rejected.
    fn set_duty_cycle(&mut self, channel: Self::Channel, duty_cycle: f64)
        -> Result<(), ActuatorError>;

    /// Get the channel for a channel number.
    fn channel(&self, number: u8) -> Option<Self::Channel>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// H-bridge wiring of one motor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorWiring<C> {
    pub fwd: C,
    pub rev: C,
    pub polarity: Polarity,
}

/// An [`ActuatorSink`] writing the motor duties through a [`MotorDriver`].
pub struct PwmActuatorSink<D: MotorDriver> {
    driver: D,
    left: MotorWiring<D::Channel>,
    right: MotorWiring<D::Channel>,
}

/// A bank of individual PWM pins, channels are indexes into the bank.
pub struct PwmPinBank<P: PwmPin<Duty = u16>> {
    pins: Vec<P>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The H-bridge input that drives a wheel forwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Polarity {
    FwdPin,
    RevPin,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<C: Copy> MotorWiring<C> {
    /// Channel the duty is written to, and the channel held at zero.
    fn drive_and_idle(&self) -> (C, C) {
        match self.polarity {
            Polarity::FwdPin => (self.fwd, self.rev),
            Polarity::RevPin => (self.rev, self.fwd),
        }
    }
}

impl<D: MotorDriver> PwmActuatorSink<D> {
    /// Create a new sink from a driver and the wiring of each motor.
    pub fn new(
        driver: D,
        left: MotorWiring<D::Channel>,
        right: MotorWiring<D::Channel>
    ) -> Self {
        Self { driver, left, right }
    }

    /// Create a new sink from the wiring parameters, checking the driver has every channel.
    pub fn from_params(
        driver: D,
        left: &MotorWiringParams,
        right: &MotorWiringParams
    ) -> Result<Self, ActuatorError> {
        let left = Self::wiring(&driver, left)?;
        let right = Self::wiring(&driver, right)?;

        Ok(Self::new(driver, left, right))
    }

    fn wiring(
        driver: &D,
        params: &MotorWiringParams
    ) -> Result<MotorWiring<D::Channel>, ActuatorError> {
        let channel = |n: u8| driver
            .channel(n)
            .ok_or_else(|| ActuatorError::DeviceUnavailable(format!("no PWM channel {}", n)));

        Ok(MotorWiring {
            fwd: channel(params.fwd_channel)?,
            rev: channel(params.rev_channel)?,
            polarity: params.polarity,
        })
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    fn write_side(&mut self, wiring: MotorWiring<D::Channel>, duty: u16)
        -> Result<(), ActuatorError>
    {
        let (drive, idle) = wiring.drive_and_idle();

        // Zero the idle input first so both inputs are never high together
        self.driver.set_duty_cycle(idle, 0.0)?;
        self.driver.set_duty_cycle(drive, duty as f64 / u16::MAX as f64)
    }
}

impl<D: MotorDriver> ActuatorSink for PwmActuatorSink<D> {
    fn set_duty(&mut self, left: u16, right: u16) -> Result<(), ActuatorError> {
        // Attempt both sides even if the first fails
        let left_result = self.write_side(self.left, left);
        let right_result = self.write_side(self.right, right);

        left_result.and(right_result)
    }

    fn stop(&mut self) -> Result<(), ActuatorError> {
        let mut result = Ok(());

        for wiring in [self.left, self.right].iter() {
            for &channel in [wiring.fwd, wiring.rev].iter() {
                if let Err(e) = self.driver.set_duty_cycle(channel, 0.0) {
                    result = Err(e);
                }
            }
        }

        result
    }
}

/// PWM outputs keep their last duty when the process ends, so the motors are
/// zeroed however the sink goes away, including while unwinding a panic.
impl<D: MotorDriver> Drop for PwmActuatorSink<D> {
    fn drop(&mut self) {
        match self.stop() {
            Ok(_) => info!("Motor outputs zeroed"),
            Err(e) => error!("Could not zero the motor outputs: {}", e)
        }
    }
}

impl<I2C, E> MotorDriver for Pca9685<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>
{
    type Channel = Channel;

    fn set_duty_cycle(
        &mut self,
        channel: Self::Channel,
        duty_cycle: f64
    ) -> Result<(), ActuatorError> {

        // If the duty cycle is out of range return an error
        if !(0.0..=1.0).contains(&duty_cycle) {
            return Err(ActuatorError::InvalidDuty((duty_cycle * u16::MAX as f64) as u16))
        }

        let counts = (duty_cycle * PCA9685_MAX_PWM as f64) as u16;

        let result = if counts == 0 {
            self.set_channel_full_off(channel)
        }
        else if counts >= PCA9685_MAX_PWM {
            self.set_channel_full_on(channel, 0)
        }
        else {
            self.set_channel_on_off(channel, 0, counts)
        };

        match result {
            Ok(_) => Ok(()),
            Err(pwm_pca9685::Error::I2C(_)) => Err(ActuatorError::WriteFailed(channel as usize)),
            Err(pwm_pca9685::Error::InvalidInputData) => Err(ActuatorError::InvalidDuty(counts))
        }
    }

    fn channel(&self, number: u8) -> Option<Self::Channel> {
        let channel = match number {
            0 => Channel::C0,
            1 => Channel::C1,
            2 => Channel::C2,
            3 => Channel::C3,
            4 => Channel::C4,
            5 => Channel::C5,
            6 => Channel::C6,
            7 => Channel::C7,
            8 => Channel::C8,
            9 => Channel::C9,
            10 => Channel::C10,
            11 => Channel::C11,
            12 => Channel::C12,
            13 => Channel::C13,
            14 => Channel::C14,
            15 => Channel::C15,
            _ => return None
        };

        Some(channel)
    }
}

impl<P: PwmPin<Duty = u16>> PwmPinBank<P> {
    /// Create a bank from the given pins, enabling each of them.
    pub fn new(pins: Vec<P>) -> Self {
        let mut pins = pins;
        for p in pins.iter_mut() {
            p.set_duty(0);
            p.enable();
        }

        Self { pins }
    }

    pub fn pins(&self) -> &[P] {
        &self.pins
    }
}

impl<P: PwmPin<Duty = u16>> MotorDriver for PwmPinBank<P> {
    type Channel = usize;

    fn set_duty_cycle(
        &mut self,
        channel: Self::Channel,
        duty_cycle: f64
    ) -> Result<(), ActuatorError> {
        if !(0.0..=1.0).contains(&duty_cycle) {
            return Err(ActuatorError::InvalidDuty((duty_cycle * u16::MAX as f64) as u16))
        }

        let pin = self.pins
            .get_mut(channel)
            .ok_or(ActuatorError::WriteFailed(channel))?;

        let duty = (duty_cycle * pin.get_max_duty() as f64).round() as u16;
        pin.set_duty(duty);

        Ok(())
    }

    fn channel(&self, number: u8) -> Option<Self::Channel> {
        let index = number as usize;
        match index < self.pins.len() {
            true => Some(index),
            false => None
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
