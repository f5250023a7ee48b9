//! Hardware Abstraction Layer implementations.
//!
//! This module contains concrete implementations of the traits
//! defined in [`crate::traits`] for various platforms.
//!
//! # Available Implementations
//!
//! - `mock`: Recording test doubles for unit and integration tests
//! - `sim`: Logging simulation used by the desktop binary
//! - `embedded`: `embedded-hal` pins/PWM and `embedded-graphics` panels (requires `embedded` feature)

use std::thread;
use std::time::Duration;

use crate::traits::Delay;

pub mod mock;
pub mod sim;

#[cfg(feature = "embedded")]
pub mod embedded;

pub use mock::*;
pub use sim::*;

#[cfg(feature = "embedded")]
pub use embedded::*;

/// [`Delay`] backed by `std::thread::sleep`.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdDelay;

impl Delay for StdDelay {
    fn delay(&self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn std_delay_sleeps() {
        let start = Instant::now();
        StdDelay.delay_ms(20);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
