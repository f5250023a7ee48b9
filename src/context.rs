//! The car's hardware handle.
//!
//! [`CarContext`] owns the actuators, the face display, the animation cache
//! and the delay. It is built once at startup and shared as
//! `Arc<CarContext<..>>` by the reactions, the ambient idle behavior and the
//! shutdown path.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::animation::AnimationCache;
use crate::error::AnimationError;
use crate::traits::{Actuators, AnimationSource, Delay, DisplaySink};

/// Locks `mutex`, recovering the data if a previous holder panicked.
///
/// Hardware state stays usable after a panicking job; the worker has
/// already logged the panic.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared hardware and animation state.
///
/// # Thread Safety
///
/// Actuators and display each sit behind their own `Mutex`. Locks are held
/// for a single call, never across a sleep, so the motion, LED and display
/// sub-tasks of one reaction can run side by side.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use car_agent::CarContext;
/// use car_agent::hal::{MockActuators, MockDelay, MockDisplay, MockSource};
///
/// let ctx = CarContext::new(
///     MockActuators::new(),
///     MockDisplay::new(8, 4),
///     MockSource::new().with_frames("Idle", 2, 8, 4),
///     Arc::new(MockDelay::new()),
/// )
/// .unwrap();
///
/// assert!(ctx.play("Idle", 1));
/// ctx.rest(Some("Idle")).unwrap();
/// assert!(ctx.with_actuators(|car| car.led));
/// ```
pub struct CarContext<A, D, S> {
    actuators: Mutex<A>,
    display: Mutex<D>,
    animations: AnimationCache<S>,
    delay: Arc<dyn Delay>,
}

impl<A, D, S> CarContext<A, D, S>
where
    A: Actuators,
    D: DisplaySink,
    S: AnimationSource,
{
    /// Takes ownership of the hardware and puts it in a safe state:
    /// motor stopped, wheels centred, LED on.
    ///
    /// Consuming the handles means the hardware can only be initialised once.
    pub fn new(mut actuators: A, display: D, source: S, delay: Arc<dyn Delay>) -> Result<Self, A::Error> {
        actuators.stop()?;
        actuators.center()?;
        actuators.led_on()?;
        let (width, height) = display.size();
        info!(width, height, "hardware ready");

        Ok(Self {
            actuators: Mutex::new(actuators),
            display: Mutex::new(display),
            animations: AnimationCache::new(source),
            delay,
        })
    }

    /// Actuator handle that locks per call.
    pub fn actuators(&self) -> SharedActuators<'_, A> {
        SharedActuators(&self.actuators)
    }

    /// Runs `f` with exclusive access to the actuators.
    pub fn with_actuators<R>(&self, f: impl FnOnce(&mut A) -> R) -> R {
        f(&mut lock(&self.actuators))
    }

    /// Runs `f` with exclusive access to the display.
    pub fn with_display<R>(&self, f: impl FnOnce(&mut D) -> R) -> R {
        f(&mut lock(&self.display))
    }

    /// The animation cache.
    pub fn animations(&self) -> &AnimationCache<S> {
        &self.animations
    }

    /// The delay used for every timed step.
    pub fn delay(&self) -> &dyn Delay {
        &*self.delay
    }

    /// Plays `name` `repeat` times; `false` if it could not be played.
    ///
    /// On failure the display keeps whatever it showed last.
    pub fn play(&self, name: &str, repeat: u32) -> bool {
        self.animations.play_blocking(name, repeat, &self.display, self.delay())
    }

    /// Plays `name` `repeat` times, returning the number of frames shown.
    pub fn try_play(&self, name: &str, repeat: u32) -> Result<usize, AnimationError> {
        self.animations.play(name, repeat, &self.display, self.delay())
    }

    /// Shows the first frame of `name` without animating.
    pub fn show_first_frame(&self, name: &str) -> bool {
        let Some(frame) = self.animations.first_frame(name) else {
            return false;
        };
        match lock(&self.display).show(&frame.bitmap) {
            Ok(()) => true,
            Err(e) => {
                warn!(name, error = ?e, "failed to show resting frame");
                false
            }
        }
    }

    /// Returns the car to rest: motor stopped, wheels centred, LED on and,
    /// if given, the first frame of `resting_face` on the display.
    ///
    /// Every step is attempted; the first actuator error is returned.
    pub fn rest(&self, resting_face: Option<&str>) -> Result<(), A::Error> {
        let result = {
            let mut car = lock(&self.actuators);
            let stop = car.stop();
            let center = car.center();
            let led = car.led_on();
            stop.and(center).and(led)
        };
        if let Some(face) = resting_face {
            self.show_first_frame(face);
        }
        debug!("car at rest");
        result
    }

    /// Clears the display and releases the actuators.
    ///
    /// Both steps run even if the first fails; errors are logged.
    pub fn shutdown(&self) {
        if let Err(e) = lock(&self.display).clear() {
            warn!(error = ?e, "failed to clear display");
        }
        match lock(&self.actuators).release() {
            Ok(()) => info!("hardware released"),
            Err(e) => warn!(error = ?e, "failed to release actuators"),
        }
    }
}

/// [`Actuators`] view of a [`CarContext`] that locks for each call.
///
/// Lets the motion and LED sub-tasks interleave their calls instead of one
/// holding the hardware for a whole script.
pub struct SharedActuators<'a, A>(&'a Mutex<A>);

impl<A: Actuators> Actuators for SharedActuators<'_, A> {
    type Error = A::Error;

    fn steer(&mut self, angle_deg: f32) -> Result<(), A::Error> {
        lock(self.0).steer(angle_deg)
    }

    fn forward(&mut self, duty_pct: f32) -> Result<(), A::Error> {
        lock(self.0).forward(duty_pct)
    }

    fn backward(&mut self, duty_pct: f32) -> Result<(), A::Error> {
        lock(self.0).backward(duty_pct)
    }

    fn stop(&mut self) -> Result<(), A::Error> {
        lock(self.0).stop()
    }

    fn led_on(&mut self) -> Result<(), A::Error> {
        lock(self.0).led_on()
    }

    fn led_off(&mut self) -> Result<(), A::Error> {
        lock(self.0).led_off()
    }

    fn center(&mut self) -> Result<(), A::Error> {
        lock(self.0).center()
    }

    fn release(&mut self) -> Result<(), A::Error> {
        lock(self.0).release()
    }
}
