//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for all hardware and animation traits,
//! enabling development and testing on desktop without a car attached.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockActuators`] | [`Actuators`] | Records motor/servo/LED calls in order |
//! | [`MockDisplay`] | [`DisplaySink`] | Records every bitmap shown |
//! | [`MockSource`] | [`AnimationSource`] | In-memory animations with decode counters |
//! | [`MockDelay`] | [`Delay`] | Records requested sleeps without sleeping |
//!
//! # Example
//!
//! ```rust
//! use car_agent::hal::{ActuatorEvent, MockActuators, MockDelay};
//! use car_agent::reactions::{run_script, HAPPY_MOTION};
//!
//! let mut car = MockActuators::new();
//! let delay = MockDelay::new();
//!
//! run_script(&mut car, &delay, HAPPY_MOTION).unwrap();
//!
//! assert_eq!(car.events()[0], ActuatorEvent::Steer(0.0));
//! assert_eq!(car.events()[1], ActuatorEvent::Forward(70.0));
//! assert_eq!(car.events().last(), Some(&ActuatorEvent::Forward(65.0)));
//! ```
//!
//! [`Actuators`]: crate::traits::Actuators
//! [`DisplaySink`]: crate::traits::DisplaySink
//! [`AnimationSource`]: crate::traits::AnimationSource
//! [`Delay`]: crate::traits::Delay

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::animation::{Bitmap, DecodedFrame};
use crate::error::AnimationError;
use crate::traits::{Actuators, AnimationSource, Delay, DisplaySink};

// ============================================================================
// Hardware Mocks
// ============================================================================

/// One recorded actuator call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ActuatorEvent {
    /// `steer(angle)`
    Steer(f32),
    /// `forward(duty)`
    Forward(f32),
    /// `backward(duty)`
    Backward(f32),
    /// `stop()`
    Stop,
    /// `led_on()`
    LedOn,
    /// `led_off()`
    LedOff,
    /// `release()` finished
    Release,
}

impl ActuatorEvent {
    /// Whether this call touched the drive motor or steering.
    pub fn is_motion(&self) -> bool {
        matches!(
            self,
            ActuatorEvent::Steer(_)
                | ActuatorEvent::Forward(_)
                | ActuatorEvent::Backward(_)
                | ActuatorEvent::Stop
        )
    }

    /// Whether this call touched the LED.
    pub fn is_led(&self) -> bool {
        matches!(self, ActuatorEvent::LedOn | ActuatorEvent::LedOff)
    }
}

/// Shared, cloneable view of a [`MockActuators`] event log.
///
/// Lets a test keep reading events after the mock has been moved into a
/// [`CarContext`](crate::CarContext).
#[derive(Clone, Debug, Default)]
pub struct EventLog(Arc<Mutex<Vec<ActuatorEvent>>>);

impl EventLog {
    fn push(&self, event: ActuatorEvent) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).push(event);
    }

    /// Snapshot of every event recorded so far.
    pub fn events(&self) -> Vec<ActuatorEvent> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Forgets recorded events.
    pub fn clear(&self) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

/// Mock actuators for testing.
///
/// Records every call in order and tracks the resulting state. Set
/// [`fail`](Self::fail) to make every call return `Err(())`.
///
/// # Example
///
/// ```rust
/// use car_agent::hal::MockActuators;
/// use car_agent::traits::Actuators;
///
/// let mut car = MockActuators::new();
/// let log = car.log();
///
/// car.backward(45.0).unwrap();
/// car.led_on().unwrap();
///
/// assert_eq!(car.duty, -45.0);
/// assert!(car.led);
/// assert_eq!(log.events().len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct MockActuators {
    /// Last steering angle.
    pub angle: f32,
    /// Last duty cycle; negative when driving backward.
    pub duty: f32,
    /// LED state.
    pub led: bool,
    /// Whether `release()` has run.
    pub released: bool,
    /// When set, every call fails without changing state.
    pub fail: bool,
    log: EventLog,
}

impl MockActuators {
    /// Creates a new mock with everything off and centred.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock where every call fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Recorded events, oldest first.
    pub fn events(&self) -> Vec<ActuatorEvent> {
        self.log.events()
    }

    /// A handle to the event log that outlives moves of the mock.
    pub fn log(&self) -> EventLog {
        self.log.clone()
    }

    fn record(&mut self, event: ActuatorEvent) -> Result<(), ()> {
        if self.fail {
            return Err(());
        }
        match event {
            ActuatorEvent::Steer(angle) => self.angle = angle,
            ActuatorEvent::Forward(duty) => self.duty = duty,
            ActuatorEvent::Backward(duty) => self.duty = -duty,
            ActuatorEvent::Stop => self.duty = 0.0,
            ActuatorEvent::LedOn => self.led = true,
            ActuatorEvent::LedOff => self.led = false,
            ActuatorEvent::Release => self.released = true,
        }
        self.log.push(event);
        Ok(())
    }
}

impl Actuators for MockActuators {
    type Error = ();

    fn steer(&mut self, angle_deg: f32) -> Result<(), ()> {
        self.record(ActuatorEvent::Steer(angle_deg))
    }

    fn forward(&mut self, duty_pct: f32) -> Result<(), ()> {
        self.record(ActuatorEvent::Forward(duty_pct))
    }

    fn backward(&mut self, duty_pct: f32) -> Result<(), ()> {
        self.record(ActuatorEvent::Backward(duty_pct))
    }

    fn stop(&mut self) -> Result<(), ()> {
        self.record(ActuatorEvent::Stop)
    }

    fn led_on(&mut self) -> Result<(), ()> {
        self.record(ActuatorEvent::LedOn)
    }

    fn led_off(&mut self) -> Result<(), ()> {
        self.record(ActuatorEvent::LedOff)
    }

    fn release(&mut self) -> Result<(), ()> {
        self.stop()?;
        self.center()?;
        self.led_off()?;
        self.record(ActuatorEvent::Release)
    }
}

/// Mock display for testing.
///
/// Keeps a copy of every bitmap shown.
#[derive(Debug)]
pub struct MockDisplay {
    width: u32,
    height: u32,
    shown: Vec<Bitmap>,
    /// Number of times `clear` was called.
    pub clears: usize,
    /// When set, `show` fails.
    pub fail_show: bool,
}

impl MockDisplay {
    /// Creates a mock panel of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            shown: Vec::new(),
            clears: 0,
            fail_show: false,
        }
    }

    /// Every bitmap shown, oldest first.
    pub fn shown(&self) -> &[Bitmap] {
        &self.shown
    }

    /// The bitmap currently on the panel, if any.
    pub fn last(&self) -> Option<&Bitmap> {
        self.shown.last()
    }
}

impl DisplaySink for MockDisplay {
    type Error = ();

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn show(&mut self, bitmap: &Bitmap) -> Result<(), ()> {
        if self.fail_show {
            return Err(());
        }
        self.shown.push(bitmap.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), ()> {
        self.clears += 1;
        Ok(())
    }
}

// ============================================================================
// Animation Mocks
// ============================================================================

/// In-memory animation source for testing.
///
/// Counts decode attempts per name so tests can check the cache decodes
/// each animation once.
///
/// # Example
///
/// ```rust
/// use car_agent::hal::MockSource;
/// use car_agent::traits::AnimationSource;
///
/// let source = MockSource::new().with_frames("Idle", 2, 16, 8);
///
/// assert_eq!(source.decode("Idle").unwrap().len(), 2);
/// assert!(source.decode("Missing").unwrap_err().is_not_found());
/// assert_eq!(source.decodes_of("Idle"), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockSource {
    animations: HashMap<String, Vec<DecodedFrame>>,
    malformed: HashSet<String>,
    decodes: Mutex<HashMap<String, usize>>,
}

impl MockSource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `count` generated `width × height` frames under `name`.
    ///
    /// Frames differ from each other and from other names: frame `i` lights
    /// the first `i + 1` pixels of row 0, and row 1 follows the name's bytes.
    pub fn with_frames(mut self, name: &str, count: usize, width: u32, height: u32) -> Self {
        let frames = (0..count)
            .map(|i| {
                let mut bitmap = Bitmap::new(width, height);
                for x in 0..=(i as u32) {
                    bitmap.set(x, 0, true);
                }
                for (x, byte) in name.bytes().enumerate() {
                    bitmap.set(x as u32, 1, byte % 2 == 1);
                }
                DecodedFrame::new(bitmap, None)
            })
            .collect();
        self.animations.insert(name.to_string(), frames);
        self
    }

    /// Adds explicit frames under `name`.
    pub fn with_animation(mut self, name: &str, frames: Vec<DecodedFrame>) -> Self {
        self.animations.insert(name.to_string(), frames);
        self
    }

    /// Makes `name` exist but fail to decode.
    pub fn with_malformed(mut self, name: &str) -> Self {
        self.malformed.insert(name.to_string());
        self
    }

    /// Decode attempts made for `name`.
    pub fn decodes_of(&self, name: &str) -> usize {
        self.decodes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    /// Decode attempts made for any name.
    pub fn total_decodes(&self) -> usize {
        self.decodes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }
}

impl AnimationSource for MockSource {
    fn decode(&self, name: &str) -> Result<Vec<DecodedFrame>, AnimationError> {
        *self
            .decodes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.to_string())
            .or_insert(0) += 1;

        if self.malformed.contains(name) {
            return Err(AnimationError::Malformed {
                name: name.to_string(),
                reason: "mock malformed".to_string(),
            });
        }
        self.animations
            .get(name)
            .cloned()
            .ok_or_else(|| AnimationError::NotFound(name.to_string()))
    }
}

// ============================================================================
// Time Mocks
// ============================================================================

/// Mock delay for testing.
///
/// Returns immediately and records what was asked for. Clones share the
/// same history.
///
/// # Example
///
/// ```rust
/// use car_agent::hal::MockDelay;
/// use car_agent::traits::Delay;
/// use std::time::Duration;
///
/// let delay = MockDelay::new();
/// delay.delay_ms(250);
/// delay.delay_ms(50);
///
/// assert_eq!(delay.calls(), 2);
/// assert_eq!(delay.total(), Duration::from_millis(300));
/// ```
#[derive(Clone, Debug, Default)]
pub struct MockDelay {
    history: Arc<Mutex<Vec<Duration>>>,
}

impl MockDelay {
    /// Creates a delay with empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every requested delay, oldest first.
    pub fn history(&self) -> Vec<Duration> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Sum of all requested delays.
    pub fn total(&self) -> Duration {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .sum()
    }

    /// Number of delay calls.
    pub fn calls(&self) -> usize {
        self.history.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Delay for MockDelay {
    fn delay(&self, duration: Duration) {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(duration);
    }
}
