//! Error types shared across the crate.
//!
//! Hardware traits keep an associated `Error` type (see [`crate::traits`]);
//! the errors here cover the parts the crate owns: animation loading, the
//! behavior queue and the command listener.

use std::io;

use thiserror::Error;

/// Failure to load or play a named animation.
///
/// None of these are fatal. Playback callers treat them as "nothing to show"
/// and fall back to holding the last frame.
#[derive(Debug, Error)]
pub enum AnimationError {
    /// No animation with this name exists in the source.
    #[error("animation `{0}` not found")]
    NotFound(String),

    /// The name cannot refer to an animation (path separators, empty, ...).
    #[error("invalid animation name `{0}`")]
    InvalidName(String),

    /// The source exists but could not be decoded.
    #[error("animation `{name}` is malformed: {reason}")]
    Malformed {
        /// Animation name.
        name: String,
        /// What the decoder rejected.
        reason: String,
    },

    /// The source decoded to zero frames.
    #[error("animation `{0}` has no frames")]
    Empty(String),

    /// Reading the source failed for a reason other than absence.
    #[error("failed to read animation `{name}`")]
    Io {
        /// Animation name.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The display sink refused a frame during playback.
    #[error("display rejected a frame of `{name}`: {reason}")]
    Display {
        /// Animation name.
        name: String,
        /// Debug rendering of the sink's error.
        reason: String,
    },
}

impl AnimationError {
    /// Returns true if the animation simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AnimationError::NotFound(_))
    }
}

/// Errors returned by [`BehaviorQueue`](crate::BehaviorQueue).
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    /// The queue was stopped; the job was dropped without running.
    #[error("behavior queue is stopped")]
    Stopped,
}

/// Errors from the TCP command listener.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configured host/port did not form a socket address.
    #[error("invalid listen address `{0}`")]
    InvalidAddress(String),

    /// Binding the listening socket failed.
    #[error("failed to bind {addr}")]
    Bind {
        /// Address we tried to bind.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}
