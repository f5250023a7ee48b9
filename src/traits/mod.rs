//! Trait definitions for hardware abstraction and animation sources.
//!
//! This module defines the seams that let car-agent:
//! - Run on different hardware (GPIO/PWM boards, desktop simulation, test mocks)
//! - Load face animations from different sources
//!
//! # Submodules
//!
//! - `hardware`: Actuators (motor, steering, LED) and blocking delays
//! - `display`: Bitmap display sink
//! - `animation`: Animation source (decoder) contract
//!
//! # Hardware Abstraction
//!
//! - [`Actuators`]: H-bridge drive motor, steering servo and status LED
//! - [`DisplaySink`]: Renders one bitmap to the face panel
//! - [`Delay`]: Blocking sleep used by timed scripts and playback
//! - [`AnimationSource`]: Decodes a named animation into timed frames

pub mod animation;
pub mod display;
pub mod hardware;

pub use animation::*;
pub use display::*;
pub use hardware::*;
