//! Timed motion scripts and LED blink patterns.
//!
//! A script is a fixed list of [`Step`]s run in order against the
//! actuators. Sleeps go through [`Delay`], so tests can run a whole
//! choreography instantly and inspect what was asked for.

use core::time::Duration;

use crate::traits::{Actuators, Delay};

/// One step of a motion script.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Step {
    /// Centre the steering.
    Center,
    /// Point the steering at an angle in degrees.
    Steer(f32),
    /// Drive forward at a duty percentage.
    Forward(f32),
    /// Drive backward at a duty percentage.
    Backward(f32),
    /// Cut motor power.
    Stop,
    /// Hold the current state.
    Sleep(u64),
}

/// Excited wiggle: a short dash, four zig-zags, and a final dash.
pub const HAPPY_MOTION: &[Step] = &[
    Step::Center,
    Step::Forward(70.0),
    Step::Sleep(250),
    Step::Steer(25.0),
    Step::Forward(60.0),
    Step::Sleep(180),
    Step::Stop,
    Step::Sleep(50),
    Step::Steer(-25.0),
    Step::Forward(60.0),
    Step::Sleep(180),
    Step::Stop,
    Step::Sleep(50),
    Step::Steer(20.0),
    Step::Forward(60.0),
    Step::Sleep(180),
    Step::Stop,
    Step::Sleep(50),
    Step::Steer(-20.0),
    Step::Forward(60.0),
    Step::Sleep(180),
    Step::Stop,
    Step::Sleep(50),
    Step::Center,
    Step::Forward(65.0),
    Step::Sleep(220),
];

/// Dejected retreat: back off, shake the wheels, creep forward.
pub const SAD_MOTION: &[Step] = &[
    Step::Center,
    Step::Backward(45.0),
    Step::Sleep(400),
    Step::Stop,
    Step::Sleep(80),
    Step::Steer(-20.0),
    Step::Sleep(180),
    Step::Steer(20.0),
    Step::Sleep(180),
    Step::Steer(-15.0),
    Step::Sleep(180),
    Step::Center,
    Step::Sleep(100),
    Step::Forward(40.0),
    Step::Sleep(200),
];

/// Runs `script` in order, stopping at the first actuator error.
///
/// The script may end with the motor running; callers are expected to
/// return the car to rest afterwards.
pub fn run_script<A: Actuators>(actuators: &mut A, delay: &dyn Delay, script: &[Step]) -> Result<(), A::Error> {
    for step in script {
        match *step {
            Step::Center => actuators.center()?,
            Step::Steer(angle) => actuators.steer(angle)?,
            Step::Forward(duty) => actuators.forward(duty)?,
            Step::Backward(duty) => actuators.backward(duty)?,
            Step::Stop => actuators.stop()?,
            Step::Sleep(ms) => delay.delay_ms(ms),
        }
    }
    Ok(())
}

/// Total time a script spends sleeping.
pub fn script_duration(script: &[Step]) -> Duration {
    script
        .iter()
        .map(|step| match step {
            Step::Sleep(ms) => Duration::from_millis(*ms),
            _ => Duration::ZERO,
        })
        .sum()
}

/// An on/off LED blink pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LedPattern {
    /// Time lit per cycle, in milliseconds.
    pub on_ms: u64,
    /// Time dark per cycle, in milliseconds.
    pub off_ms: u64,
    /// Number of on/off cycles.
    pub cycles: u32,
}

impl LedPattern {
    /// Quick flicker during the happy reaction.
    pub const HAPPY: LedPattern = LedPattern::new(100, 100, 6);

    /// Slow pulse during the sad reaction.
    pub const SAD: LedPattern = LedPattern::new(300, 300, 3);

    /// Creates a pattern.
    pub const fn new(on_ms: u64, off_ms: u64, cycles: u32) -> Self {
        Self { on_ms, off_ms, cycles }
    }

    /// Total running time of the pattern, saturating at `u64::MAX` ms.
    pub fn duration(&self) -> Duration {
        let cycle = self.on_ms.saturating_add(self.off_ms);
        Duration::from_millis(cycle.saturating_mul(u64::from(self.cycles)))
    }
}

/// Blinks the LED through `pattern`, ending with it off.
pub fn run_led_pattern<A: Actuators>(actuators: &mut A, delay: &dyn Delay, pattern: LedPattern) -> Result<(), A::Error> {
    for _ in 0..pattern.cycles {
        actuators.led_on()?;
        delay.delay_ms(pattern.on_ms);
        actuators.led_off()?;
        delay.delay_ms(pattern.off_ms);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{ActuatorEvent, MockActuators, MockDelay};

    // =========================================================================
    // Script Tests
    // =========================================================================

    #[test]
    fn happy_motion_sequence() {
        let mut car = MockActuators::new();
        let delay = MockDelay::new();

        run_script(&mut car, &delay, HAPPY_MOTION).unwrap();

        let steers: Vec<f32> = car
            .events()
            .iter()
            .filter_map(|e| match e {
                ActuatorEvent::Steer(a) => Some(*a),
                _ => None,
            })
            .collect();
        assert_eq!(steers, vec![0.0, 25.0, -25.0, 20.0, -20.0, 0.0]);
        assert_eq!(car.duty, 65.0);
        assert_eq!(delay.total(), Duration::from_millis(250 + 4 * 230 + 220));
    }

    #[test]
    fn sad_motion_sequence() {
        let mut car = MockActuators::new();
        let delay = MockDelay::new();

        run_script(&mut car, &delay, SAD_MOTION).unwrap();

        let events = car.events();
        assert_eq!(events[0], ActuatorEvent::Steer(0.0));
        assert_eq!(events[1], ActuatorEvent::Backward(45.0));
        assert_eq!(events[2], ActuatorEvent::Stop);
        assert_eq!(events.last(), Some(&ActuatorEvent::Forward(40.0)));
        assert_eq!(delay.total(), script_duration(SAD_MOTION));
        assert_eq!(script_duration(SAD_MOTION), Duration::from_millis(1320));
    }

    #[test]
    fn script_stops_on_error() {
        let mut car = MockActuators::failing();
        let delay = MockDelay::new();
        assert!(run_script(&mut car, &delay, HAPPY_MOTION).is_err());
        assert_eq!(delay.calls(), 0);
    }

    // =========================================================================
    // LED Pattern Tests
    // =========================================================================

    #[test]
    fn led_pattern_toggles_and_ends_off() {
        let mut car = MockActuators::new();
        let delay = MockDelay::new();

        run_led_pattern(&mut car, &delay, LedPattern::HAPPY).unwrap();

        let events = car.events();
        assert_eq!(events.len(), 12);
        assert_eq!(events.iter().filter(|e| **e == ActuatorEvent::LedOn).count(), 6);
        assert_eq!(events.last(), Some(&ActuatorEvent::LedOff));
        assert!(!car.led);
        assert_eq!(delay.total(), LedPattern::HAPPY.duration());
    }

    #[test]
    fn pattern_durations() {
        assert_eq!(LedPattern::HAPPY.duration(), Duration::from_millis(1200));
        assert_eq!(LedPattern::SAD.duration(), Duration::from_millis(1800));
        assert_eq!(LedPattern::new(10, 10, 0).duration(), Duration::ZERO);
    }

    #[test]
    fn huge_pattern_duration_saturates() {
        let max = Duration::from_millis(u64::MAX);
        assert_eq!(LedPattern::new(u64::MAX, 1, 1).duration(), max);
        assert_eq!(LedPattern::new(u64::MAX / 2, u64::MAX / 2, u32::MAX).duration(), max);
        assert_eq!(LedPattern::new(1 << 40, 0, u32::MAX).duration(), max);
    }
}
