//! Hardware abstraction traits for the drive motor, steering servo and LED.
//!
//! This module defines the actuator interface that lets car-agent work
//! across different platforms (Raspberry Pi GPIO, embedded-hal boards,
//! desktop simulation, test mocks).
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`Actuators`] | Drive motor, steering servo and status LED |
//! | [`Delay`] | Blocking sleep for timed motion scripts and playback |
//!
//! # Implementation
//!
//! For testing and desktop development, use the mock implementations
//! from [`crate::hal::mock`] or the logging simulation in [`crate::hal::sim`].
//! For boards exposing `embedded-hal` pins, use `hal::embedded`
//! (requires the `embedded` feature).
//!
//! # Example
//!
//! ```rust
//! use car_agent::traits::Actuators;
//! use car_agent::hal::{ActuatorEvent, MockActuators};
//!
//! let mut car = MockActuators::new();
//! car.steer(25.0).unwrap();
//! car.forward(60.0).unwrap();
//! car.stop().unwrap();
//!
//! assert_eq!(car.events().len(), 3);
//! assert_eq!(car.events()[0], ActuatorEvent::Steer(25.0));
//! ```

use core::time::Duration;

/// Steering travel limit either side of centre, in degrees.
pub const MAX_STEER_DEG: f32 = 90.0;

/// Servo pulse width for a centred wheel, in microseconds.
pub const SERVO_CENTER_US: u32 = 1500;

/// Pulse width change between centre and full lock, in microseconds.
pub const SERVO_HALF_RANGE_US: f32 = 1000.0;

/// Converts a steering angle to a servo pulse width.
///
/// The angle is clamped to ±[`MAX_STEER_DEG`] and mapped linearly onto
/// 500-2500µs with 1500µs at centre. A NaN angle is treated as centre.
///
/// # Examples
///
/// ```
/// use car_agent::traits::angle_to_pulse_us;
///
/// assert_eq!(angle_to_pulse_us(0.0), 1500);
/// assert_eq!(angle_to_pulse_us(90.0), 2500);
/// assert_eq!(angle_to_pulse_us(-90.0), 500);
/// assert_eq!(angle_to_pulse_us(45.0), 2000);
/// assert_eq!(angle_to_pulse_us(200.0), 2500);
/// ```
pub fn angle_to_pulse_us(angle_deg: f32) -> u32 {
    let angle = if angle_deg.is_nan() {
        0.0
    } else {
        angle_deg.clamp(-MAX_STEER_DEG, MAX_STEER_DEG)
    };
    (SERVO_CENTER_US as f32 + (angle / MAX_STEER_DEG) * SERVO_HALF_RANGE_US) as u32
}

/// Clamps a motor duty cycle to 0-100%.
#[inline]
pub fn clamp_duty(duty_pct: f32) -> f32 {
    if duty_pct.is_nan() {
        0.0
    } else {
        duty_pct.clamp(0.0, 100.0)
    }
}

/// Actuator trait - abstracts the car's drive motor, steering and LED.
///
/// The drive motor sits behind an H-bridge (two direction pins plus a PWM
/// enable), steering is a hobby servo, and the LED is a plain output pin.
///
/// # Implementation Notes
///
/// - Duty cycles are percentages and should be clamped with [`clamp_duty`]
/// - Steering angles should be converted with [`angle_to_pulse_us`]
/// - `stop()` must leave both H-bridge inputs low with zero duty
///
/// # Example Implementation
///
/// ```rust,ignore
/// use car_agent::traits::{Actuators, angle_to_pulse_us};
///
/// struct MyCar { /* GPIO handles */ }
///
/// impl Actuators for MyCar {
///     type Error = ();
///
///     fn steer(&mut self, angle_deg: f32) -> Result<(), ()> {
///         let pulse = angle_to_pulse_us(angle_deg);
///         // Write servo pulse width...
///         Ok(())
///     }
///     // ...
/// }
/// ```
pub trait Actuators {
    /// Error type for actuator operations.
    ///
    /// Must be `Send` so sub-tasks on other threads can hand it back.
    type Error: core::fmt::Debug + Send;

    /// Point the steering servo at `angle_deg` (negative = left).
    fn steer(&mut self, angle_deg: f32) -> Result<(), Self::Error>;

    /// Drive forward at `duty_pct` percent PWM.
    fn forward(&mut self, duty_pct: f32) -> Result<(), Self::Error>;

    /// Drive backward at `duty_pct` percent PWM.
    fn backward(&mut self, duty_pct: f32) -> Result<(), Self::Error>;

    /// Cut motor power and release both H-bridge inputs.
    fn stop(&mut self) -> Result<(), Self::Error>;

    /// Turn the status LED on.
    fn led_on(&mut self) -> Result<(), Self::Error>;

    /// Turn the status LED off.
    fn led_off(&mut self) -> Result<(), Self::Error>;

    /// Centre the steering.
    fn center(&mut self) -> Result<(), Self::Error> {
        self.steer(0.0)
    }

    /// Put the hardware in a safe state and release it for process exit.
    ///
    /// The default stops the motor, centres the wheels and turns the LED off.
    /// Implementations holding servo or GPIO handles should also switch the
    /// servo pulse off and hand the pins back.
    fn release(&mut self) -> Result<(), Self::Error> {
        self.stop()?;
        self.center()?;
        self.led_off()
    }
}

/// Blocking delay used by motion scripts, LED patterns and frame playback.
///
/// Shared between the concurrent sub-tasks of a reaction, so it takes
/// `&self`. Tests swap in [`MockDelay`](crate::hal::MockDelay) to run
/// scripts without sleeping.
pub trait Delay: Send + Sync {
    /// Block the calling thread for `duration`.
    fn delay(&self, duration: Duration);

    /// Block the calling thread for `ms` milliseconds.
    fn delay_ms(&self, ms: u64) {
        self.delay(Duration::from_millis(ms));
    }
}
