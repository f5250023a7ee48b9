//! Bitmaps and timed frames.

use std::time::Duration;

/// Frame duration used when the source did not specify one.
pub const DEFAULT_FRAME_DURATION: Duration = Duration::from_millis(80);

/// A 1-bit bitmap, stored row-major.
///
/// # Example
///
/// ```rust
/// use car_agent::animation::Bitmap;
///
/// let face = Bitmap::from_rows(&[
///     ".#..#.",
///     "......",
///     ".####.",
/// ]);
/// assert_eq!((face.width(), face.height()), (6, 3));
/// assert!(face.get(1, 0));
/// assert_eq!(face.lit_count(), 6);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    pixels: Vec<bool>,
}

impl Bitmap {
    /// Creates a blank (all off) bitmap.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![false; (width as usize) * (height as usize)],
        }
    }

    /// Builds a bitmap from text rows.
    ///
    /// `#`, `@` and `1` are lit pixels; every other character is unlit.
    /// Short rows are padded to the widest row.
    pub fn from_rows<R: AsRef<str>>(rows: &[R]) -> Self {
        let width = rows
            .iter()
            .map(|row| row.as_ref().chars().count())
            .max()
            .unwrap_or(0) as u32;
        let mut bitmap = Self::new(width, rows.len() as u32);
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.as_ref().chars().enumerate() {
                if matches!(ch, '#' | '@' | '1') {
                    bitmap.set(x as u32, y as u32, true);
                }
            }
        }
        bitmap
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| (y as usize) * (self.width as usize) + x as usize)
    }

    /// Returns the pixel at `(x, y)`; out-of-bounds pixels read as off.
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.index(x, y).is_some_and(|i| self.pixels[i])
    }

    /// Sets the pixel at `(x, y)`; out-of-bounds writes are ignored.
    pub fn set(&mut self, x: u32, y: u32, on: bool) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = on;
        }
    }

    /// Number of lit pixels.
    pub fn lit_count(&self) -> usize {
        self.pixels.iter().filter(|&&p| p).count()
    }

    /// Iterates the coordinates of lit pixels, row by row.
    pub fn lit_pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let width = self.width.max(1) as usize;
        self.pixels
            .iter()
            .enumerate()
            .filter(|(_, &on)| on)
            .map(move |(i, _)| ((i % width) as u32, (i / width) as u32))
    }

    /// Returns a copy centred on a `width × height` canvas.
    ///
    /// Larger bitmaps are cropped around their centre, smaller ones padded
    /// with unlit pixels.
    pub fn fit(&self, width: u32, height: u32) -> Bitmap {
        if self.width == width && self.height == height {
            return self.clone();
        }
        let dx = (i64::from(width) - i64::from(self.width)) / 2;
        let dy = (i64::from(height) - i64::from(self.height)) / 2;
        let mut out = Bitmap::new(width, height);
        for (x, y) in self.lit_pixels() {
            let tx = i64::from(x) + dx;
            let ty = i64::from(y) + dy;
            if tx >= 0 && ty >= 0 {
                out.set(tx as u32, ty as u32, true);
            }
        }
        out
    }
}

/// One frame as produced by an [`AnimationSource`](crate::traits::AnimationSource).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedFrame {
    /// Frame contents.
    pub bitmap: Bitmap,
    /// Display time, if the source specified one.
    pub duration: Option<Duration>,
}

impl DecodedFrame {
    /// Creates a decoded frame.
    pub fn new(bitmap: Bitmap, duration: Option<Duration>) -> Self {
        Self { bitmap, duration }
    }

    /// Resolves the duration, substituting [`DEFAULT_FRAME_DURATION`].
    pub fn into_frame(self) -> Frame {
        Frame {
            bitmap: self.bitmap,
            duration: self.duration.unwrap_or(DEFAULT_FRAME_DURATION),
        }
    }
}

/// A cached, playable frame: a bitmap and how long it stays on screen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Frame contents.
    pub bitmap: Bitmap,
    /// Display time.
    pub duration: Duration,
}
