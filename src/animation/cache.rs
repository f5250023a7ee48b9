//! Decode-once animation cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, warn};

use super::frame::{DecodedFrame, Frame};
use crate::error::AnimationError;
use crate::traits::{AnimationSource, Delay, DisplaySink};

/// Frames of one loaded animation, shared between players.
pub type Frames = Arc<[Frame]>;

/// Loads each named animation once and serves it from memory afterwards.
///
/// Entries live for the life of the cache and are never evicted: reaction
/// playback has to start without decode latency. Failed loads are not
/// cached, so an animation file added while running becomes playable on the
/// next request.
///
/// # Thread Safety
///
/// - Lookups take a read lock on the frame map and clone an `Arc`.
/// - Decodes are serialized by a separate mutex and re-check the map, so
///   concurrent first requests for one name decode it exactly once.
/// - Playback holds no cache lock while sleeping between frames.
///
/// # Example
///
/// ```rust
/// use car_agent::AnimationCache;
/// use car_agent::hal::MockSource;
///
/// let cache = AnimationCache::new(MockSource::new().with_frames("Blink", 3, 8, 4));
///
/// assert!(cache.ensure("Blink"));
/// assert!(cache.ensure("Blink"));
/// assert_eq!(cache.decode_count(), 1);
///
/// assert!(!cache.ensure("Missing"));
/// assert!(cache.first_frame("Blink").is_some());
/// ```
pub struct AnimationCache<S> {
    source: S,
    frames: RwLock<HashMap<String, Frames>>,
    decoding: Mutex<()>,
    decodes: AtomicUsize,
}

impl<S: AnimationSource> AnimationCache<S> {
    /// Creates an empty cache over `source`.
    pub fn new(source: S) -> Self {
        Self {
            source,
            frames: RwLock::new(HashMap::new()),
            decoding: Mutex::new(()),
            decodes: AtomicUsize::new(0),
        }
    }

    /// The underlying source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Returns cached frames without attempting a load.
    pub fn get(&self, name: &str) -> Option<Frames> {
        self.frames
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Returns the frames for `name`, decoding them on first use.
    pub fn load(&self, name: &str) -> Result<Frames, AnimationError> {
        if let Some(frames) = self.get(name) {
            return Ok(frames);
        }

        let _decoding = self.decoding.lock().unwrap_or_else(PoisonError::into_inner);
        // Another thread may have finished the same decode while we waited.
        if let Some(frames) = self.get(name) {
            return Ok(frames);
        }

        self.decodes.fetch_add(1, Ordering::Relaxed);
        let decoded = self.source.decode(name)?;
        if decoded.is_empty() {
            return Err(AnimationError::Empty(name.to_string()));
        }
        let frames: Frames = decoded.into_iter().map(DecodedFrame::into_frame).collect();
        debug!(name, frames = frames.len(), "animation cached");

        let mut map = self.frames.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(map.entry(name.to_string()).or_insert(frames)))
    }

    /// Loads `name` if needed; returns whether it is now available.
    pub fn ensure(&self, name: &str) -> bool {
        match self.load(name) {
            Ok(_) => true,
            Err(e) => {
                warn!(name, error = %e, "animation unavailable");
                false
            }
        }
    }

    /// Loads every name in `names`, returning how many are available.
    pub fn preload<N: AsRef<str>>(&self, names: &[N]) -> usize {
        names.iter().filter(|name| self.ensure(name.as_ref())).count()
    }

    /// First frame of `name`, for showing a resting pose without playing.
    pub fn first_frame(&self, name: &str) -> Option<Frame> {
        self.load(name).ok().and_then(|frames| frames.first().cloned())
    }

    /// Plays `name` `repeat` times on `display`, sleeping each frame's
    /// duration after showing it.
    ///
    /// Returns the number of frames shown. The display lock is taken per
    /// frame, never across a sleep.
    pub fn play<D: DisplaySink>(
        &self,
        name: &str,
        repeat: u32,
        display: &Mutex<D>,
        delay: &dyn Delay,
    ) -> Result<usize, AnimationError> {
        let frames = self.load(name)?;
        let mut shown = 0;
        for _ in 0..repeat {
            for frame in frames.iter() {
                display
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .show(&frame.bitmap)
                    .map_err(|e| AnimationError::Display {
                        name: name.to_string(),
                        reason: format!("{e:?}"),
                    })?;
                shown += 1;
                delay.delay(frame.duration);
            }
        }
        Ok(shown)
    }

    /// Like [`play`](Self::play), but reports failure as `false` and logs it.
    pub fn play_blocking<D: DisplaySink>(
        &self,
        name: &str,
        repeat: u32,
        display: &Mutex<D>,
        delay: &dyn Delay,
    ) -> bool {
        match self.play(name, repeat, display, delay) {
            Ok(_) => true,
            Err(e) => {
                warn!(name, error = %e, "playback skipped");
                false
            }
        }
    }

    /// Number of decode attempts made so far (successful or not).
    pub fn decode_count(&self) -> usize {
        self.decodes.load(Ordering::Relaxed)
    }

    /// Whether `name` is already cached.
    pub fn is_cached(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Names currently cached, sorted.
    pub fn cached_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .frames
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{Bitmap, DEFAULT_FRAME_DURATION};
    use crate::hal::{MockDelay, MockDisplay, MockSource};
    use std::thread;
    use std::time::Duration;

    fn cache() -> AnimationCache<MockSource> {
        AnimationCache::new(
            MockSource::new()
                .with_frames("Blink", 2, 8, 4)
                .with_frames("Idle", 4, 8, 4)
                .with_malformed("Broken"),
        )
    }

    #[test]
    fn ensure_decodes_once() {
        let cache = cache();
        for _ in 0..5 {
            assert!(cache.ensure("Blink"));
        }
        assert_eq!(cache.decode_count(), 1);
        assert_eq!(cache.source().decodes_of("Blink"), 1);
    }

    #[test]
    fn cached_frames_are_shared() {
        let cache = cache();
        let a = cache.load("Idle").unwrap();
        let b = cache.load("Idle").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.len(), 4);
    }

    #[test]
    fn failures_are_not_cached() {
        let cache = cache();
        assert!(!cache.ensure("Missing"));
        assert!(!cache.ensure("Missing"));
        assert_eq!(cache.decode_count(), 2);
        assert!(!cache.is_cached("Missing"));
    }

    #[test]
    fn malformed_is_reported() {
        let cache = cache();
        assert!(matches!(
            cache.load("Broken"),
            Err(AnimationError::Malformed { .. })
        ));
    }

    #[test]
    fn empty_animation_is_rejected() {
        let cache = AnimationCache::new(MockSource::new().with_animation("Nothing", Vec::new()));
        assert!(matches!(cache.load("Nothing"), Err(AnimationError::Empty(_))));
        assert!(!cache.is_cached("Nothing"));
    }

    #[test]
    fn default_duration_applied() {
        let cache = cache();
        let frames = cache.load("Blink").unwrap();
        assert!(frames.iter().all(|f| f.duration == DEFAULT_FRAME_DURATION));
    }

    #[test]
    fn first_frame_without_playing() {
        let cache = cache();
        let frame = cache.first_frame("Idle").unwrap();
        assert_eq!(frame.bitmap, cache.load("Idle").unwrap()[0].bitmap);
        assert!(cache.first_frame("Missing").is_none());
    }

    #[test]
    fn play_repeats_every_frame() {
        let cache = cache();
        let display = Mutex::new(MockDisplay::new(8, 4));
        let delay = MockDelay::new();

        let shown = cache.play("Blink", 3, &display, &delay).unwrap();

        assert_eq!(shown, 6);
        assert_eq!(display.lock().unwrap().shown().len(), 6);
        assert_eq!(delay.total(), DEFAULT_FRAME_DURATION * 6);
    }

    #[test]
    fn play_honours_source_durations() {
        let frames = vec![
            DecodedFrame::new(Bitmap::new(2, 2), Some(Duration::from_millis(30))),
            DecodedFrame::new(Bitmap::new(2, 2), Some(Duration::from_millis(70))),
        ];
        let cache = AnimationCache::new(MockSource::new().with_animation("Wink", frames));
        let display = Mutex::new(MockDisplay::new(2, 2));
        let delay = MockDelay::new();

        cache.play("Wink", 2, &display, &delay).unwrap();

        assert_eq!(delay.total(), Duration::from_millis(200));
        assert_eq!(
            delay.history(),
            vec![30, 70, 30, 70]
                .into_iter()
                .map(Duration::from_millis)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn play_missing_returns_false() {
        let cache = cache();
        let display = Mutex::new(MockDisplay::new(8, 4));
        let delay = MockDelay::new();

        assert!(!cache.play_blocking("Missing", 1, &display, &delay));
        assert!(display.lock().unwrap().shown().is_empty());
    }

    #[test]
    fn play_reports_display_failure() {
        let cache = cache();
        let mut panel = MockDisplay::new(8, 4);
        panel.fail_show = true;
        let display = Mutex::new(panel);
        let delay = MockDelay::new();

        assert!(matches!(
            cache.play("Blink", 1, &display, &delay),
            Err(AnimationError::Display { .. })
        ));
    }

    #[test]
    fn concurrent_first_loads_decode_once() {
        let cache = Arc::new(cache());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.ensure("Idle"))
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(cache.source().decodes_of("Idle"), 1);
    }

    #[test]
    fn preload_counts_available() {
        let cache = cache();
        assert_eq!(cache.preload(&["Idle", "Blink", "Missing"]), 2);
        assert_eq!(cache.cached_names(), vec!["Blink".to_string(), "Idle".to_string()]);
    }
}
