//! Face animations: bitmaps, timed frames, the decode-once cache and the
//! text sprite source.
//!
//! - [`Bitmap`] / [`Frame`]: 1-bit frames with a display time
//! - [`AnimationCache`]: loads each name once, plays frames with exact timing
//! - [`DirectorySource`]: reads `<dir>/<Name>.txt` sprite files

mod cache;
mod frame;
mod source;

pub use cache::{AnimationCache, Frames};
pub use frame::{Bitmap, DecodedFrame, Frame, DEFAULT_FRAME_DURATION};
pub use source::{parse_sprite, DirectorySource, SPRITE_EXTENSION};
