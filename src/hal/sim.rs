//! Logging simulation of the car hardware.
//!
//! Used by the desktop binary when no GPIO is available: every actuator
//! call and every frame is reported through `tracing`, so a run can be
//! followed with `RUST_LOG=car_agent=debug`.

use core::convert::Infallible;

use tracing::{debug, trace};

use crate::animation::Bitmap;
use crate::traits::{angle_to_pulse_us, clamp_duty, Actuators, DisplaySink};

/// Simulated motor, servo and LED.
#[derive(Debug, Default)]
pub struct SimActuators {
    angle: f32,
    duty: f32,
    led: bool,
}

impl SimActuators {
    /// Creates a stopped, centred car with the LED off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last commanded steering angle.
    pub fn angle(&self) -> f32 {
        self.angle
    }

    /// Current duty; negative when reversing.
    pub fn duty(&self) -> f32 {
        self.duty
    }

    /// LED state.
    pub fn led(&self) -> bool {
        self.led
    }
}

impl Actuators for SimActuators {
    type Error = Infallible;

    fn steer(&mut self, angle_deg: f32) -> Result<(), Infallible> {
        self.angle = angle_deg;
        debug!(angle = angle_deg, pulse_us = angle_to_pulse_us(angle_deg), "steer");
        Ok(())
    }

    fn forward(&mut self, duty_pct: f32) -> Result<(), Infallible> {
        self.duty = clamp_duty(duty_pct);
        debug!(duty = self.duty, "forward");
        Ok(())
    }

    fn backward(&mut self, duty_pct: f32) -> Result<(), Infallible> {
        self.duty = -clamp_duty(duty_pct);
        debug!(duty = -self.duty, "backward");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Infallible> {
        self.duty = 0.0;
        debug!("stop");
        Ok(())
    }

    fn led_on(&mut self) -> Result<(), Infallible> {
        self.led = true;
        trace!("led on");
        Ok(())
    }

    fn led_off(&mut self) -> Result<(), Infallible> {
        self.led = false;
        trace!("led off");
        Ok(())
    }
}

/// Simulated face panel that logs frames instead of drawing them.
#[derive(Debug)]
pub struct SimDisplay {
    width: u32,
    height: u32,
    frames: u64,
}

impl SimDisplay {
    /// Creates a panel of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frames: 0,
        }
    }

    /// Frames shown since start.
    pub fn frames_shown(&self) -> u64 {
        self.frames
    }
}

impl DisplaySink for SimDisplay {
    type Error = Infallible;

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn show(&mut self, bitmap: &Bitmap) -> Result<(), Infallible> {
        self.frames += 1;
        trace!(frame = self.frames, lit = bitmap.lit_count(), "frame");
        Ok(())
    }

    fn clear(&mut self) -> Result<(), Infallible> {
        debug!("display cleared");
        Ok(())
    }
}
