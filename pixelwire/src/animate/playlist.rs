//! Rotates through a set of effects, cross-fading through black.

use std::time::Duration;

use super::effect::Effect;
use super::fade::{Fade, scale};
use crate::trace::info;

const DEFAULT_MIN_RUN: Duration = Duration::from_secs(30);
const DEFAULT_MAX_RUN: Duration = Duration::from_secs(300);
const DEFAULT_TRANSITION: Duration = Duration::from_secs(5);

/// Plays one effect at a time for a random duration, then switches to a
/// different one at random.
///
/// Each run lasts between the minimum and maximum run time. The effect fades
/// in over the transition time when it starts and fades out over the last
/// transition time of its run. A playlist is itself an [`Effect`], so it can
/// be streamed like any other.
pub struct Playlist {
    effects: Vec<Box<dyn Effect>>,
    current: Option<usize>,
    remaining: Duration,
    fade: Fade,
    min_run: Duration,
    max_run: Duration,
    transition: Duration,
}

impl Playlist {
    #[must_use]
    pub fn new(effects: Vec<Box<dyn Effect>>) -> Self {
        Self {
            effects,
            current: None,
            remaining: Duration::ZERO,
            fade: Fade::new(),
            min_run: DEFAULT_MIN_RUN,
            max_run: DEFAULT_MAX_RUN,
            transition: DEFAULT_TRANSITION,
        }
    }

    /// Bounds each run. `max` below `min` is raised to `min`.
    #[must_use]
    pub fn with_run_time(mut self, min: Duration, max: Duration) -> Self {
        self.min_run = min;
        self.max_run = max.max(min);
        self
    }

    #[must_use]
    pub const fn with_transition(mut self, transition: Duration) -> Self {
        self.transition = transition;
        self
    }

    /// Name of the effect playing now, if one has started.
    #[must_use]
    pub fn current(&self) -> Option<&str> {
        self.current.map(|i| self.effects[i].name())
    }

    fn next_index(&self) -> usize {
        let n = self.effects.len();
        match self.current {
            Some(current) if n > 1 => (current + 1 + rand::random::<usize>() % (n - 1)) % n,
            _ => rand::random::<usize>() % n,
        }
    }

    fn switch(&mut self) {
        let next = self.next_index();
        self.effects[next].reset();
        self.current = Some(next);
        self.fade.fade_in(self.transition);
        self.remaining = self.max_run.mul_f64(rand::random::<f64>()).max(self.min_run);
        info!(
            effect = self.effects[next].name(),
            run_ms = self.remaining.as_millis() as u64,
            "next effect"
        );
    }
}

impl Effect for Playlist {
    fn name(&self) -> &str {
        "playlist"
    }

    fn animate(&mut self, dt: Duration, pixels: &mut [u8]) {
        if self.effects.is_empty() {
            pixels.fill(0);
            return;
        }

        self.remaining = self.remaining.saturating_sub(dt);
        if self.current.is_none() || self.remaining.is_zero() {
            self.switch();
        } else if self.remaining <= self.transition {
            self.fade.fade_out(self.remaining);
        }

        if let Some(current) = self.current {
            self.effects[current].animate(dt, pixels);
        }
        scale(pixels, self.fade.advance(dt));
    }

    fn reset(&mut self) {
        self.current = None;
        self.remaining = Duration::ZERO;
        self.fade = Fade::new();
    }
}
