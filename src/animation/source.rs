//! Text sprite animation source.
//!
//! Faces are stored one animation per file as `<dir>/<Name>.txt`. Each frame
//! starts with a header line holding its display time, followed by the
//! bitmap rows:
//!
//! ```text
//! = 120
//! ..##....##..
//! ............
//! ..########..
//! =
//! ..--....##..
//! ............
//! ..########..
//! ```
//!
//! `= <millis>` sets the frame's duration; a bare `=` leaves it to the
//! cache default. In rows, `#`, `@` and `1` are lit pixels. Blank lines
//! before the first header and trailing blank rows of a frame are ignored.
//! Frames are centred/cropped to the configured panel size on load.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use super::frame::{Bitmap, DecodedFrame};
use crate::error::AnimationError;
use crate::traits::AnimationSource;

/// File extension of sprite files.
pub const SPRITE_EXTENSION: &str = "txt";

/// Loads text sprites from a directory.
#[derive(Clone, Debug)]
pub struct DirectorySource {
    dir: PathBuf,
    width: u32,
    height: u32,
}

impl DirectorySource {
    /// Creates a source reading `<dir>/<name>.txt`, fitting frames to
    /// `width × height`.
    pub fn new(dir: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        Self {
            dir: dir.into(),
            width,
            height,
        }
    }

    /// Directory the sprites are read from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a given animation name resolves to.
    ///
    /// Returns `None` for names that could escape the sprite directory.
    pub fn path_for(&self, name: &str) -> Option<PathBuf> {
        valid_name(name).then(|| self.dir.join(format!("{name}.{SPRITE_EXTENSION}")))
    }
}

impl AnimationSource for DirectorySource {
    fn decode(&self, name: &str) -> Result<Vec<DecodedFrame>, AnimationError> {
        let path = self
            .path_for(name)
            .ok_or_else(|| AnimationError::InvalidName(name.to_string()))?;

        let text = fs::read_to_string(&path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => AnimationError::NotFound(name.to_string()),
            _ => AnimationError::Io {
                name: name.to_string(),
                source,
            },
        })?;

        let frames = parse_sprite(&text).map_err(|reason| AnimationError::Malformed {
            name: name.to_string(),
            reason,
        })?;
        debug!(name, frames = frames.len(), path = ?path, "decoded sprite file");

        Ok(frames
            .into_iter()
            .map(|frame| DecodedFrame::new(frame.bitmap.fit(self.width, self.height), frame.duration))
            .collect())
    }
}

/// Names are plain file stems: no separators, no leading dot.
fn valid_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0'])
        && !name.chars().any(char::is_whitespace)
}

/// Parses sprite text into frames at their native size.
///
/// Returns a description of the first problem on malformed input.
pub fn parse_sprite(text: &str) -> Result<Vec<DecodedFrame>, String> {
    let mut frames = Vec::new();
    let mut current: Option<(Option<Duration>, Vec<&str>)> = None;

    for (index, line) in text.lines().enumerate() {
        let line = line.trim_end();
        if let Some(header) = line.strip_prefix('=') {
            if let Some((duration, rows)) = current.take() {
                frames.push(build_frame(frames.len(), duration, rows)?);
            }
            let header = header.trim();
            let duration = if header.is_empty() {
                None
            } else {
                let ms: u64 = header
                    .parse()
                    .map_err(|_| format!("line {}: bad frame duration `{header}`", index + 1))?;
                Some(Duration::from_millis(ms))
            };
            current = Some((duration, Vec::new()));
        } else {
            match current.as_mut() {
                Some((_, rows)) => rows.push(line),
                None if line.trim().is_empty() => {}
                None => return Err(format!("line {}: bitmap row before first `=` header", index + 1)),
            }
        }
    }

    if let Some((duration, rows)) = current {
        frames.push(build_frame(frames.len(), duration, rows)?);
    }
    Ok(frames)
}

fn build_frame(index: usize, duration: Option<Duration>, mut rows: Vec<&str>) -> Result<DecodedFrame, String> {
    while rows.last().is_some_and(|row| row.trim().is_empty()) {
        rows.pop();
    }
    if rows.is_empty() {
        return Err(format!("frame {index} has no bitmap rows"));
    }
    Ok(DecodedFrame::new(Bitmap::from_rows(&rows), duration))
}
