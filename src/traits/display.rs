//! Display abstraction for the car's face panel.
//!
//! This module defines the [`DisplaySink`] trait for pushing 1-bit bitmaps
//! to a small monochrome panel (SSD1305/SSD1306 OLEDs and the like).

use crate::animation::Bitmap;

/// Display trait for rendering face frames.
///
/// Implementors provide hardware-specific rendering for monochrome panels,
/// or record frames for testing.
///
/// # Example
///
/// ```ignore
/// use car_agent::traits::DisplaySink;
/// use car_agent::animation::Bitmap;
///
/// struct MyPanel { /* ... */ }
///
/// impl DisplaySink for MyPanel {
///     type Error = ();
///
///     fn size(&self) -> (u32, u32) { (128, 32) }
///     fn show(&mut self, bitmap: &Bitmap) -> Result<(), ()> {
///         // Copy pixels into the frame buffer and flush...
///         Ok(())
///     }
///     fn clear(&mut self) -> Result<(), ()> { Ok(()) }
/// }
/// ```
pub trait DisplaySink {
    /// Error type for display operations.
    type Error: core::fmt::Debug;

    /// Panel size in pixels as `(width, height)`.
    fn size(&self) -> (u32, u32);

    /// Replaces the panel contents with `bitmap`.
    ///
    /// Bitmaps are expected to match [`size`](Self::size); implementations
    /// may crop anything outside the panel.
    fn show(&mut self, bitmap: &Bitmap) -> Result<(), Self::Error>;

    /// Blanks the panel.
    fn clear(&mut self) -> Result<(), Self::Error>;
}
