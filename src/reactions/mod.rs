//! Reaction choreography.
//!
//! A reaction is one behavior-queue job that runs three sub-tasks side by
//! side and waits for all of them:
//!
//! - **display**: plays the chosen face animation
//! - **LED**: blinks a [`LedPattern`]
//! - **motion**: runs a fixed [`Step`] script
//!
//! Afterwards the car always returns to rest, even if a sub-task failed.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use car_agent::{CarContext, ReactionState, Reactions};
//! use car_agent::config::ReactionConfig;
//! use car_agent::hal::{MockActuators, MockDelay, MockDisplay, MockSource};
//!
//! let source = MockSource::new()
//!     .with_frames("Happy", 2, 8, 4)
//!     .with_frames("Love", 2, 8, 4)
//!     .with_frames("Idle", 1, 8, 4);
//! let ctx = Arc::new(
//!     CarContext::new(MockActuators::new(), MockDisplay::new(8, 4), source, Arc::new(MockDelay::new()))
//!         .unwrap(),
//! );
//! let reactions = Reactions::new(ctx, ReactionConfig::default());
//!
//! let mut state = ReactionState::default();
//! (reactions.happy())(&mut state).unwrap();
//! assert_eq!(state.last_happy(), Some("Happy"));
//!
//! (reactions.happy())(&mut state).unwrap();
//! assert_eq!(state.last_happy(), Some("Love"));
//! ```

mod ambient;
mod motion;

pub use ambient::AmbientIdle;
pub use motion::{
    run_led_pattern, run_script, script_duration, LedPattern, Step, HAPPY_MOTION, SAD_MOTION,
};

use std::sync::Arc;
use std::thread;

use anyhow::anyhow;
use tracing::{debug, info, warn};

use crate::config::{ReactionConfig, ShortString};
use crate::context::CarContext;
use crate::queue::{job, panic_message, Job};
use crate::traits::{Actuators, AnimationSource, DisplaySink};

/// The two emotional reactions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReactionKind {
    /// Answer was right.
    Happy,
    /// Answer was wrong.
    Sad,
}

/// Returns the candidate after `last`, wrapping around.
///
/// Falls back to the first candidate when `last` is unset or not among
/// `candidates`; `None` only when there are no candidates.
///
/// ```rust
/// use car_agent::reactions::pick_next;
///
/// let faces = ["Happy", "Love"];
/// assert_eq!(pick_next(&faces, None), Some("Happy"));
/// assert_eq!(pick_next(&faces, Some("Happy")), Some("Love"));
/// assert_eq!(pick_next(&faces, Some("Love")), Some("Happy"));
/// assert_eq!(pick_next(&faces, Some("Sad")), Some("Happy"));
/// ```
pub fn pick_next<'a, N: AsRef<str>>(candidates: &'a [N], last: Option<&str>) -> Option<&'a str> {
    let next = last
        .and_then(|last| candidates.iter().position(|c| c.as_ref() == last))
        .map_or(0, |i| (i + 1) % candidates.len());
    candidates.get(next).map(AsRef::as_ref)
}

/// Which animation each reaction kind showed last.
///
/// Owned by the behavior worker and lent to one job at a time, so it needs
/// no lock. Only sound because at most one job runs at any instant.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReactionState {
    last_happy: Option<String>,
    last_sad: Option<String>,
}

impl ReactionState {
    /// Last happy animation shown.
    pub fn last_happy(&self) -> Option<&str> {
        self.last_happy.as_deref()
    }

    /// Last sad animation shown.
    pub fn last_sad(&self) -> Option<&str> {
        self.last_sad.as_deref()
    }

    /// Picks the next animation for `kind` and remembers it.
    pub fn choose<N: AsRef<str>>(&mut self, kind: ReactionKind, candidates: &[N]) -> Option<String> {
        let last = match kind {
            ReactionKind::Happy => &mut self.last_happy,
            ReactionKind::Sad => &mut self.last_sad,
        };
        let choice = pick_next(candidates, last.as_deref())?.to_string();
        *last = Some(choice.clone());
        Some(choice)
    }
}

/// Builds behavior-queue jobs.
///
/// The dispatcher depends on this trait rather than on [`Reactions`], so it
/// can be driven without hardware types.
pub trait ReactionFactory: Send + Sync + 'static {
    /// Job for a correct answer.
    fn happy(&self) -> Job;

    /// Job for a wrong answer.
    fn sad(&self) -> Job;

    /// Job that plays one animation `repeat` times.
    fn face(&self, name: &str, repeat: u32) -> Job;
}

/// The reaction library over one [`CarContext`].
pub struct Reactions<A, D, S> {
    ctx: Arc<CarContext<A, D, S>>,
    config: ReactionConfig,
}

impl<A, D, S> Clone for Reactions<A, D, S> {
    fn clone(&self) -> Self {
        Self {
            ctx: Arc::clone(&self.ctx),
            config: self.config.clone(),
        }
    }
}

impl<A, D, S> Reactions<A, D, S>
where
    A: Actuators + Send + 'static,
    D: DisplaySink + Send + 'static,
    S: AnimationSource + 'static,
{
    /// Creates the library.
    pub fn new(ctx: Arc<CarContext<A, D, S>>, config: ReactionConfig) -> Self {
        Self { ctx, config }
    }

    /// The shared hardware handle.
    pub fn context(&self) -> &Arc<CarContext<A, D, S>> {
        &self.ctx
    }

    /// Reaction settings.
    pub fn config(&self) -> &ReactionConfig {
        &self.config
    }

    /// Job for a correct answer.
    pub fn happy(&self) -> Job {
        let this = self.clone();
        job(move |state| this.perform(ReactionKind::Happy, state))
    }

    /// Job for a wrong answer.
    pub fn sad(&self) -> Job {
        let this = self.clone();
        job(move |state| this.perform(ReactionKind::Sad, state))
    }

    /// Job that plays `name` `repeat` times without motion or LED.
    ///
    /// A missing animation is logged and the job still succeeds.
    pub fn face(&self, name: &str, repeat: u32) -> Job {
        let ctx = Arc::clone(&self.ctx);
        let name = name.to_string();
        job(move |_state| {
            match ctx.try_play(&name, repeat) {
                Ok(frames) => debug!(name = %name, repeat, frames, "face played"),
                Err(e) => warn!(name = %name, error = %e, "face not played"),
            }
            Ok(())
        })
    }

    /// Runs one full reaction: animation, LED and motion together, then rest.
    ///
    /// Returns the first sub-task error (a panic counts as one), or the rest
    /// error if the sub-tasks all succeeded.
    pub fn perform(&self, kind: ReactionKind, state: &mut ReactionState) -> anyhow::Result<()> {
        let (candidates, pattern, script): (&[ShortString], _, _) = match kind {
            ReactionKind::Happy => (&self.config.happy, self.config.happy_led, HAPPY_MOTION),
            ReactionKind::Sad => (&self.config.sad, self.config.sad_led, SAD_MOTION),
        };
        let face = state.choose(kind, candidates);
        info!(reaction = ?kind, face = face.as_deref().unwrap_or("-"), "reaction start");

        let ctx = &*self.ctx;
        let repeat = self.config.reaction_repeat;
        let outcome = thread::scope(|s| {
            let display = s.spawn(|| {
                if let Some(face) = face.as_deref() {
                    if !ctx.play(face, repeat) {
                        warn!(face, "animation not found, holding last frame");
                    }
                }
            });
            let led = s.spawn(|| run_led_pattern(&mut ctx.actuators(), ctx.delay(), pattern));
            let motion = s.spawn(|| run_script(&mut ctx.actuators(), ctx.delay(), script));

            let display = display
                .join()
                .map_err(|p| anyhow!("display task panicked: {}", panic_message(&*p)));
            let led = flatten("led", led.join());
            let motion = flatten("motion", motion.join());
            display.and(led).and(motion)
        });

        let rest = ctx
            .rest(Some(self.config.ambient_rest.as_str()))
            .map_err(|e| anyhow!("failed to return to rest: {e:?}"));

        outcome.and(rest)?;
        info!(reaction = ?kind, "reaction done");
        Ok(())
    }
}

fn flatten<E: core::fmt::Debug>(task: &str, joined: thread::Result<Result<(), E>>) -> anyhow::Result<()> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(anyhow!("{task} task failed: {e:?}")),
        Err(p) => Err(anyhow!("{task} task panicked: {}", panic_message(&*p))),
    }
}

impl<A, D, S> ReactionFactory for Reactions<A, D, S>
where
    A: Actuators + Send + 'static,
    D: DisplaySink + Send + 'static,
    S: AnimationSource + 'static,
{
    fn happy(&self) -> Job {
        Reactions::happy(self)
    }

    fn sad(&self) -> Job {
        Reactions::sad(self)
    }

    fn face(&self, name: &str, repeat: u32) -> Job {
        Reactions::face(self, name, repeat)
    }
}
