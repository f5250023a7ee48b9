//! Ambient idle behavior: the car's resting face with the odd blink.

use std::collections::HashSet;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{trace, warn};

use crate::config::{ReactionConfig, ShortString};
use crate::context::CarContext;
use crate::queue::IdleBehavior;
use crate::traits::{Actuators, AnimationSource, DisplaySink};

/// Plays the resting or the blink animation once per idle poll.
///
/// The blink is picked with probability `blink_chance`, the resting face
/// otherwise. A missing animation is reported once, not on every poll.
pub struct AmbientIdle<A, D, S> {
    ctx: Arc<CarContext<A, D, S>>,
    rest: ShortString,
    blink: ShortString,
    blink_chance: f64,
    rng: StdRng,
    missing: HashSet<String>,
}

impl<A, D, S> AmbientIdle<A, D, S>
where
    A: Actuators + Send + 'static,
    D: DisplaySink + Send + 'static,
    S: AnimationSource + 'static,
{
    /// Creates the behavior with an entropy-seeded RNG.
    pub fn new(ctx: Arc<CarContext<A, D, S>>, config: &ReactionConfig) -> Self {
        Self::with_rng(ctx, config, StdRng::from_entropy())
    }

    /// Creates the behavior with a fixed seed, for reproducible runs.
    pub fn with_seed(ctx: Arc<CarContext<A, D, S>>, config: &ReactionConfig, seed: u64) -> Self {
        Self::with_rng(ctx, config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(ctx: Arc<CarContext<A, D, S>>, config: &ReactionConfig, rng: StdRng) -> Self {
        let chance = f64::from(config.blink_chance);
        Self {
            ctx,
            rest: config.ambient_rest.clone(),
            blink: config.ambient_blink.clone(),
            blink_chance: if chance.is_nan() { 0.0 } else { chance.clamp(0.0, 1.0) },
            rng,
            missing: HashSet::new(),
        }
    }

    /// Draws the next ambient animation name.
    pub fn pick(&mut self) -> &str {
        if self.rng.gen_bool(self.blink_chance) {
            &self.blink
        } else {
            &self.rest
        }
    }
}

impl<A, D, S> IdleBehavior for AmbientIdle<A, D, S>
where
    A: Actuators + Send + 'static,
    D: DisplaySink + Send + 'static,
    S: AnimationSource + 'static,
{
    fn on_idle(&mut self) {
        let name = self.pick().to_string();
        match self.ctx.try_play(&name, 1) {
            Ok(frames) => {
                trace!(name = %name, frames, "ambient");
                self.missing.remove(&name);
            }
            Err(e) => {
                if self.missing.insert(name.clone()) {
                    warn!(name = %name, error = %e, "ambient animation unavailable");
                }
            }
        }
    }
}
