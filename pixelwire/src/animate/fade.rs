//! Brightness ramps applied on top of an effect's output.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Steady,
    In { remaining: Duration, total: Duration },
    Out { remaining: Duration, total: Duration },
    Dark,
}

/// A linear fade-in / fade-out envelope driven by elapsed time.
///
/// The level rises from 0 to 1 over a fade-in and falls from its current
/// value to 0 over a fade-out. A finished fade-out stays dark until the next
/// [`Fade::fade_in`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fade {
    phase: Phase,
}

impl Default for Fade {
    fn default() -> Self {
        Self::new()
    }
}

impl Fade {
    /// Starts at full brightness.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: Phase::Steady,
        }
    }

    /// Ramps up from dark over `over`. Ignored while a fade-in is running.
    pub fn fade_in(&mut self, over: Duration) {
        if matches!(self.phase, Phase::In { .. }) {
            return;
        }
        self.phase = if over.is_zero() {
            Phase::Steady
        } else {
            Phase::In {
                remaining: over,
                total: over,
            }
        };
    }

    /// Ramps down to dark over `over`. Ignored while fading out or dark.
    ///
    /// Interrupting a fade-in starts from the level it had reached.
    pub fn fade_out(&mut self, over: Duration) {
        if matches!(self.phase, Phase::Out { .. } | Phase::Dark) {
            return;
        }
        let remaining = match self.phase {
            Phase::In { .. } => over.mul_f64(f64::from(self.level())),
            _ => over,
        };
        self.phase = if remaining.is_zero() {
            Phase::Dark
        } else {
            Phase::Out {
                remaining,
                total: over,
            }
        };
    }

    /// Returns `true` from the start of a fade-out until the next fade-in.
    #[must_use]
    pub const fn is_fading_out(&self) -> bool {
        matches!(self.phase, Phase::Out { .. } | Phase::Dark)
    }

    /// Current level in `0.0..=1.0`.
    #[must_use]
    pub fn level(&self) -> f32 {
        match self.phase {
            Phase::Steady => 1.0,
            Phase::Dark => 0.0,
            Phase::In { remaining, total } => 1.0 - ratio(remaining, total),
            Phase::Out { remaining, total } => ratio(remaining, total),
        }
    }

    /// Moves the envelope forward by `dt` and returns the new level.
    pub fn advance(&mut self, dt: Duration) -> f32 {
        self.phase = match self.phase {
            Phase::In { remaining, total } => {
                let remaining = remaining.saturating_sub(dt);
                if remaining.is_zero() {
                    Phase::Steady
                } else {
                    Phase::In { remaining, total }
                }
            }
            Phase::Out { remaining, total } => {
                let remaining = remaining.saturating_sub(dt);
                if remaining.is_zero() {
                    Phase::Dark
                } else {
                    Phase::Out { remaining, total }
                }
            }
            phase => phase,
        };
        self.level()
    }
}

fn ratio(part: Duration, whole: Duration) -> f32 {
    (part.as_nanos() as f64 / whole.as_nanos() as f64) as f32
}

/// Multiplies every byte by `level`, truncating.
pub fn scale(pixels: &mut [u8], level: f32) {
    if level >= 1.0 {
        return;
    }
    let level = level.max(0.0);
    for b in pixels {
        *b = (f32::from(*b) * level) as u8;
    }
}
