//! `embedded-hal` / `embedded-graphics` adapters.
//!
//! Any board whose HAL implements `embedded-hal` 1.0 can drive the car:
//!
//! - H-bridge motor: two direction pins (IN1/IN2) and a PWM enable (ENA)
//! - Steering: hobby servo on a 50 Hz PWM channel (20 ms period)
//! - LED: plain output pin
//!
//! Faces go to any `embedded-graphics` monochrome draw target, e.g. an
//! SSD1305/SSD1306 buffered-graphics driver with its `flush` as the hook.
//!
//! # Wiring
//!
//! - IN1 high, IN2 low → forward
//! - IN1 low, IN2 high → backward
//! - both low, ENA 0% → stopped (coast)

use core::fmt::Debug;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::{DrawTarget, OriginDimensions, Pixel, Point};
use embedded_hal::digital::{self, OutputPin};
use embedded_hal::pwm::{self, SetDutyCycle};
use thiserror::Error;

use crate::animation::Bitmap;
use crate::traits::{angle_to_pulse_us, clamp_duty, Actuators, DisplaySink};

/// Servo PWM period at 50 Hz, in microseconds.
pub const SERVO_PERIOD_US: u16 = 20_000;

/// Error from an embedded-hal pin or PWM channel.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum EmbeddedError {
    /// A digital output failed.
    #[error("output pin error: {0:?}")]
    Pin(digital::ErrorKind),
    /// A PWM channel failed.
    #[error("pwm error: {0:?}")]
    Pwm(pwm::ErrorKind),
}

fn pin_err<E: digital::Error>(e: E) -> EmbeddedError {
    EmbeddedError::Pin(digital::Error::kind(&e))
}

fn pwm_err<E: pwm::Error>(e: E) -> EmbeddedError {
    EmbeddedError::Pwm(pwm::Error::kind(&e))
}

/// Car driven through an H-bridge, a steering servo and an LED pin.
///
/// # Example
///
/// ```ignore
/// use car_agent::hal::HBridgeCar;
///
/// // in1/in2/led: OutputPin, ena: 1 kHz PWM, servo: 50 Hz PWM
/// let car = HBridgeCar::new(in1, in2, ena, servo, led)?;
/// ```
pub struct HBridgeCar<In1, In2, Drive, Servo, Led> {
    in1: In1,
    in2: In2,
    drive: Drive,
    servo: Servo,
    led: Led,
}

impl<In1, In2, Drive, Servo, Led> HBridgeCar<In1, In2, Drive, Servo, Led>
where
    In1: OutputPin,
    In2: OutputPin,
    Drive: SetDutyCycle,
    Servo: SetDutyCycle,
    Led: OutputPin,
{
    /// Takes ownership of the pins and leaves the motor stopped.
    pub fn new(in1: In1, in2: In2, drive: Drive, servo: Servo, led: Led) -> Result<Self, EmbeddedError> {
        let mut car = Self {
            in1,
            in2,
            drive,
            servo,
            led,
        };
        car.stop()?;
        Ok(car)
    }

    /// Hands the pins back.
    pub fn into_parts(self) -> (In1, In2, Drive, Servo, Led) {
        (self.in1, self.in2, self.drive, self.servo, self.led)
    }

    fn set_drive(&mut self, in1_high: bool, duty_pct: f32) -> Result<(), EmbeddedError> {
        // Drop power before flipping direction pins
        self.drive.set_duty_cycle_fully_off().map_err(pwm_err)?;
        if in1_high {
            self.in2.set_low().map_err(pin_err)?;
            self.in1.set_high().map_err(pin_err)?;
        } else {
            self.in1.set_low().map_err(pin_err)?;
            self.in2.set_high().map_err(pin_err)?;
        }
        let percent = clamp_duty(duty_pct).round() as u8;
        self.drive.set_duty_cycle_percent(percent).map_err(pwm_err)
    }
}

impl<In1, In2, Drive, Servo, Led> Actuators for HBridgeCar<In1, In2, Drive, Servo, Led>
where
    In1: OutputPin,
    In2: OutputPin,
    Drive: SetDutyCycle,
    Servo: SetDutyCycle,
    Led: OutputPin,
{
    type Error = EmbeddedError;

    fn steer(&mut self, angle_deg: f32) -> Result<(), EmbeddedError> {
        let pulse = angle_to_pulse_us(angle_deg) as u16;
        self.servo
            .set_duty_cycle_fraction(pulse, SERVO_PERIOD_US)
            .map_err(pwm_err)
    }

    fn forward(&mut self, duty_pct: f32) -> Result<(), EmbeddedError> {
        self.set_drive(true, duty_pct)
    }

    fn backward(&mut self, duty_pct: f32) -> Result<(), EmbeddedError> {
        self.set_drive(false, duty_pct)
    }

    fn stop(&mut self) -> Result<(), EmbeddedError> {
        self.drive.set_duty_cycle_fully_off().map_err(pwm_err)?;
        self.in1.set_low().map_err(pin_err)?;
        self.in2.set_low().map_err(pin_err)
    }

    fn led_on(&mut self) -> Result<(), EmbeddedError> {
        self.led.set_high().map_err(pin_err)
    }

    fn led_off(&mut self) -> Result<(), EmbeddedError> {
        self.led.set_low().map_err(pin_err)
    }

    fn release(&mut self) -> Result<(), EmbeddedError> {
        self.stop()?;
        self.center()?;
        self.led_off()?;
        // No pulse at all lets the servo go limp
        self.servo.set_duty_cycle_fully_off().map_err(pwm_err)
    }
}

/// Face panel over an `embedded-graphics` draw target.
pub struct EmbeddedDisplay<T: DrawTarget> {
    target: T,
    flush: fn(&mut T) -> Result<(), T::Error>,
}

impl<T> EmbeddedDisplay<T>
where
    T: DrawTarget<Color = BinaryColor> + OriginDimensions,
    T::Error: Debug,
{
    /// Wraps a draw target that needs no flushing.
    pub fn new(target: T) -> Self {
        Self {
            target,
            flush: |_| Ok(()),
        }
    }

    /// Calls `flush` after every frame (buffered drivers).
    pub fn with_flush(mut self, flush: fn(&mut T) -> Result<(), T::Error>) -> Self {
        self.flush = flush;
        self
    }

    /// The wrapped draw target.
    pub fn target(&self) -> &T {
        &self.target
    }

    /// Returns the wrapped draw target.
    pub fn into_inner(self) -> T {
        self.target
    }
}

impl<T> DisplaySink for EmbeddedDisplay<T>
where
    T: DrawTarget<Color = BinaryColor> + OriginDimensions,
    T::Error: Debug,
{
    type Error = T::Error;

    fn size(&self) -> (u32, u32) {
        let size = self.target.size();
        (size.width, size.height)
    }

    fn show(&mut self, bitmap: &Bitmap) -> Result<(), T::Error> {
        self.target.clear(BinaryColor::Off)?;
        self.target.draw_iter(
            bitmap
                .lit_pixels()
                .map(|(x, y)| Pixel(Point::new(x as i32, y as i32), BinaryColor::On)),
        )?;
        (self.flush)(&mut self.target)
    }

    fn clear(&mut self) -> Result<(), T::Error> {
        self.target.clear(BinaryColor::Off)?;
        (self.flush)(&mut self.target)
    }
}
