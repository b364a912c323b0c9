//! The [`Effect`] capability and colour helpers shared by effects.

use std::time::Duration;

use crate::strip::layout::COLORS_PER_LED;

/// A stateful animation that renders into an RGB frame buffer.
pub trait Effect: Send {
    /// Short lowercase name, as accepted by [`by_name`](super::by_name).
    fn name(&self) -> &str;

    /// Advances the animation by `dt` and writes the new frame.
    ///
    /// `pixels` holds `3 × led_count` bytes, red/green/blue per LED. Every
    /// byte must be written; the buffer is reused between calls.
    fn animate(&mut self, dt: Duration, pixels: &mut [u8]);

    /// Returns the animation to its starting state.
    fn reset(&mut self) {}
}

/// Converts hue (degrees), saturation and value to RGB channels in `0.0..=1.0`.
///
/// Hue wraps, so `-90.0` and `270.0` are the same colour.
#[must_use]
pub fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> [f32; 3] {
    let chroma = value * saturation;
    let sector = hue.rem_euclid(360.0) / 60.0;
    let x = chroma * (1.0 - (sector.rem_euclid(2.0) - 1.0).abs());
    let m = value - chroma;

    let [r, g, b] = match sector as u32 % 6 {
        0 => [chroma, x, 0.0],
        1 => [x, chroma, 0.0],
        2 => [0.0, chroma, x],
        3 => [0.0, x, chroma],
        4 => [x, 0.0, chroma],
        _ => [chroma, 0.0, x],
    };
    [r + m, g + m, b + m]
}

/// Scales `0.0..=1.0` channels to bytes.
#[must_use]
pub fn to_bytes(rgb: [f32; 3]) -> [u8; 3] {
    rgb.map(|c| (c.clamp(0.0, 1.0) * 255.0) as u8)
}

/// Writes `rgb` to every LED.
pub fn fill(pixels: &mut [u8], rgb: [u8; 3]) {
    for led in pixels.chunks_exact_mut(COLORS_PER_LED) {
        led.copy_from_slice(&rgb);
    }
}
