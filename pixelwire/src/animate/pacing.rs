//! Frame rate, length and fade envelope for a paced stream.

use std::time::Duration;

/// How [`FrameClient::stream`](crate::net::FrameClient::stream) schedules
/// frames.
///
/// Frames go out on a fixed step of `1 / fps`, and every effect is advanced by
/// exactly that step regardless of scheduling jitter. An open-ended stream
/// never fades out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    fps: u32,
    frames: Option<u64>,
    fade_in: Duration,
    fade_out: Duration,
}

impl Pacing {
    /// Open-ended stream at `fps` frames per second (at least 1).
    #[must_use]
    pub fn new(fps: u32) -> Self {
        Self {
            fps: fps.max(1),
            frames: None,
            fade_in: Duration::ZERO,
            fade_out: Duration::ZERO,
        }
    }

    /// Stops after `frames` frames.
    #[must_use]
    pub const fn frames(mut self, frames: u64) -> Self {
        self.frames = Some(frames);
        self
    }

    /// Stops after `duration`, rounded to whole frames.
    #[must_use]
    pub fn duration(self, duration: Duration) -> Self {
        let frames = (duration.as_secs_f64() * f64::from(self.fps)).round() as u64;
        self.frames(frames)
    }

    #[must_use]
    pub const fn fade_in(mut self, fade_in: Duration) -> Self {
        self.fade_in = fade_in;
        self
    }

    /// Fades to black over the last `fade_out` of a bounded stream.
    #[must_use]
    pub const fn fade_out(mut self, fade_out: Duration) -> Self {
        self.fade_out = fade_out;
        self
    }

    #[must_use]
    pub const fn fps(&self) -> u32 {
        self.fps
    }

    /// Total frames, or `None` for an open-ended stream.
    #[must_use]
    pub const fn total_frames(&self) -> Option<u64> {
        self.frames
    }

    /// Time step between frames.
    #[must_use]
    pub fn period(&self) -> Duration {
        Duration::from_secs(1) / self.fps
    }

    /// Brightness of frame `n`, counting from 1.
    ///
    /// Frame `n` is shown `n` periods into the stream, so the fade-in reaches
    /// full level on its last frame and a bounded stream's last frame is dark
    /// when it has a fade-out.
    #[must_use]
    pub fn envelope(&self, n: u64) -> f32 {
        let period = self.period().as_nanos();
        let rising = ramp(period * u128::from(n), self.fade_in);
        let falling = match self.frames {
            Some(total) => ramp(period * u128::from(total.saturating_sub(n)), self.fade_out),
            None => 1.0,
        };
        rising.min(falling)
    }
}

fn ramp(elapsed_ns: u128, over: Duration) -> f32 {
    if over.is_zero() {
        return 1.0;
    }
    (elapsed_ns as f64 / over.as_nanos() as f64).min(1.0) as f32
}
