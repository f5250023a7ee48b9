//! # car-agent
//!
//! Reaction controller for a small robot car. Short text commands arriving
//! over TCP (`RIGHT`, `WRONG`, `FACE Blink 3`, ...) become timed physical
//! reactions: motor and steering choreography, LED blinking and face
//! animations on a monochrome panel, all running together.
//!
//! ## Features
//!
//! - **Hardware abstraction**: Traits for actuators, display and animation sources
//! - **Single-worker queue**: Reactions run one at a time, in arrival order
//! - **Concurrent sub-tasks**: Motion, LED and display start together and are joined
//! - **Decode-once cache**: Each face animation is decoded once and replayed from memory
//! - **Ambient behavior**: Resting face with occasional blinks while idle
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `traits` - Hardware and animation-source abstractions
//! - `animation` - Bitmaps, frames, the animation cache and the sprite source
//! - `context` - The shared hardware handle
//! - `queue` - Single-worker behavior queue
//! - `reactions` - Happy/sad/face jobs and ambient idle behavior
//! - `commands` / `dispatch` - Wire protocol parsing and dispatch
//! - `services` - TCP listener (`server` feature)
//! - `hal` - Concrete implementations (mock, simulation, embedded-hal)
//!
//! ## Example
//!
//! ```rust
//! use std::sync::{mpsc, Arc};
//! use car_agent::{job, BehaviorQueue, CarContext, Dispatcher, NoIdle, Reactions};
//! use car_agent::config::Config;
//! use car_agent::hal::{MockActuators, MockDelay, MockDisplay, MockSource};
//!
//! let config = Config::default();
//! let source = MockSource::new()
//!     .with_frames("Happy", 2, 8, 4)
//!     .with_frames("Love", 2, 8, 4)
//!     .with_frames("Idle", 1, 8, 4);
//! let ctx = Arc::new(
//!     CarContext::new(MockActuators::new(), MockDisplay::new(8, 4), source, Arc::new(MockDelay::new()))
//!         .unwrap(),
//! );
//!
//! let queue = BehaviorQueue::start(NoIdle, &config.queue).unwrap();
//! let reactions = Reactions::new(Arc::clone(&ctx), config.reactions.clone());
//! let dispatcher = Dispatcher::from_config(queue.clone(), reactions, &config);
//!
//! assert_eq!(dispatcher.handle_line("RIGHT").as_str(), "OK RIGHT");
//!
//! // Wait for the reaction to finish
//! let (tx, rx) = mpsc::channel();
//! queue.enqueue(job(move |_| Ok(tx.send(())?))).unwrap();
//! rx.recv().unwrap();
//!
//! queue.stop();
//! queue.join();
//! ctx.shutdown();
//! ```

#![warn(missing_docs)]

/// Face animations: bitmaps, frames, cache and sprite source.
pub mod animation;
/// Wire command parsing and replies.
pub mod commands;
/// Builder-style configuration shared by the binary and tests.
pub mod config;
/// Shared hardware handle.
pub mod context;
/// Request dispatch onto the behavior queue.
pub mod dispatch;
/// Error types.
pub mod error;
/// Hardware abstraction layer implementations (mock, simulation, embedded-hal).
pub mod hal;
/// Single-worker behavior queue.
pub mod queue;
/// Reaction choreography and ambient behavior.
pub mod reactions;
/// Core traits for hardware abstraction and animation sources.
pub mod traits;

/// TCP command listener (feature-gated).
#[cfg(feature = "server")]
pub mod services;

// Re-exports for convenience
pub use animation::{AnimationCache, Bitmap, Frame};
pub use commands::{Command, Reply, Request};
pub use context::{CarContext, SharedActuators};
pub use dispatch::{Dispatcher, LineHandler};
pub use error::{AnimationError, QueueError, ServerError};
pub use queue::{job, BehaviorQueue, IdleBehavior, Job, NoIdle, QueueStats};
pub use reactions::{AmbientIdle, ReactionFactory, ReactionKind, ReactionState, Reactions};
pub use traits::{Actuators, AnimationSource, Delay, DisplaySink};
