//! Animation source contract.
//!
//! An [`AnimationSource`] turns an animation name into an ordered list of
//! decoded frames. Decoding (file parsing, resizing, colour-depth reduction)
//! is the expensive part; [`AnimationCache`](crate::AnimationCache) makes
//! sure it runs at most once per successfully loaded name.

use crate::animation::DecodedFrame;
use crate::error::AnimationError;

/// Decodes named animations into timed bitmap frames.
///
/// Failures are reported as values (`NotFound`, `Malformed`, ...) and never
/// panic; the cache and the reactions decide what to show instead.
pub trait AnimationSource: Send + Sync {
    /// Decodes every frame of `name`, in playback order.
    ///
    /// A frame's duration is `None` when the source did not specify one;
    /// the cache substitutes [`DEFAULT_FRAME_DURATION`](crate::animation::DEFAULT_FRAME_DURATION).
    fn decode(&self, name: &str) -> Result<Vec<DecodedFrame>, AnimationError>;
}
