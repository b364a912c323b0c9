//! Built-in effects for a linear strip.

use std::time::Duration;

use super::effect::{Effect, fill, hsv_to_rgb, to_bytes};
use crate::strip::layout::COLORS_PER_LED;

/// Names accepted by [`by_name`].
pub const EFFECT_NAMES: &[&str] = &["solid", "chase", "rainbow", "wave"];

const CHASE_SPEED: f32 = 30.0;
const CHASE_WIDTH: usize = 10;
const RAINBOW_SPEED: f32 = 115.0;
const WAVE_SPEED: f32 = 0.3;
const WAVE_SPAN: f32 = 1.5;
const WAVE_LEAD: f32 = 0.25;
const WAVE_SHARPNESS: f32 = 250.0;

/// Builds a fresh effect by name. `rgb` colours the single-colour effects.
#[must_use]
pub fn by_name(name: &str, rgb: [u8; 3]) -> Option<Box<dyn Effect>> {
    let effect: Box<dyn Effect> = match name {
        "solid" => Box::new(Solid::new(rgb)),
        "chase" => Box::new(Chase::new(rgb)),
        "rainbow" => Box::new(Rainbow::default()),
        "wave" => Box::new(Wave::default()),
        _ => return None,
    };
    Some(effect)
}

/// One colour on every LED.
#[derive(Debug, Clone)]
pub struct Solid {
    rgb: [u8; 3],
}

impl Solid {
    #[must_use]
    pub const fn new(rgb: [u8; 3]) -> Self {
        Self { rgb }
    }
}

impl Effect for Solid {
    fn name(&self) -> &str {
        "solid"
    }

    fn animate(&mut self, _dt: Duration, pixels: &mut [u8]) {
        fill(pixels, self.rgb);
    }
}

/// A lit segment running along the strip and wrapping at the end.
#[derive(Debug, Clone)]
pub struct Chase {
    rgb: [u8; 3],
    width: usize,
    /// LEDs per second.
    speed: f32,
    position: f32,
}

impl Chase {
    #[must_use]
    pub const fn new(rgb: [u8; 3]) -> Self {
        Self {
            rgb,
            width: CHASE_WIDTH,
            speed: CHASE_SPEED,
            position: 0.0,
        }
    }

    /// Sets the segment length in LEDs.
    #[must_use]
    pub const fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    /// Sets the head's speed in LEDs per second.
    #[must_use]
    pub const fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }
}

impl Effect for Chase {
    fn name(&self) -> &str {
        "chase"
    }

    fn animate(&mut self, dt: Duration, pixels: &mut [u8]) {
        let leds = pixels.len() / COLORS_PER_LED;
        if leds == 0 {
            return;
        }
        self.position = (self.position + self.speed * dt.as_secs_f32()).rem_euclid(leds as f32);
        let head = (self.position as usize).min(leds - 1);

        for (i, led) in pixels.chunks_exact_mut(COLORS_PER_LED).enumerate() {
            let behind = (head + leds - i) % leds;
            let rgb = if behind < self.width { self.rgb } else { [0; 3] };
            led.copy_from_slice(&rgb);
        }
    }

    fn reset(&mut self) {
        self.position = 0.0;
    }
}

/// The full hue circle spread over the strip, rotating.
#[derive(Debug, Clone)]
pub struct Rainbow {
    /// Degrees per second.
    speed: f32,
    offset: f32,
}

impl Default for Rainbow {
    fn default() -> Self {
        Self {
            speed: RAINBOW_SPEED,
            offset: 0.0,
        }
    }
}

impl Rainbow {
    #[must_use]
    pub const fn with_speed(mut self, degrees_per_second: f32) -> Self {
        self.speed = degrees_per_second;
        self
    }
}

impl Effect for Rainbow {
    fn name(&self) -> &str {
        "rainbow"
    }

    fn animate(&mut self, dt: Duration, pixels: &mut [u8]) {
        let leds = pixels.len() / COLORS_PER_LED;
        self.offset = (self.offset + self.speed * dt.as_secs_f32()).rem_euclid(360.0);

        for (i, led) in pixels.chunks_exact_mut(COLORS_PER_LED).enumerate() {
            let hue = self.offset + i as f32 * 360.0 / leds as f32;
            led.copy_from_slice(&to_bytes(hsv_to_rgb(hue, 1.0, 1.0)));
        }
    }

    fn reset(&mut self) {
        self.offset = 0.0;
    }
}

/// A gaussian pulse sweeping from the first LED to the last, taking a new
/// random hue on every pass.
#[derive(Debug, Clone)]
pub struct Wave {
    progress: f32,
    color: [f32; 3],
}

impl Default for Wave {
    fn default() -> Self {
        Self {
            progress: 0.0,
            color: [1.0; 3],
        }
    }
}

impl Wave {
    fn intensity(&self, position: f32) -> f32 {
        let distance = position - (self.progress - WAVE_LEAD);
        (-distance * distance * WAVE_SHARPNESS).exp()
    }
}

impl Effect for Wave {
    fn name(&self) -> &str {
        "wave"
    }

    fn animate(&mut self, dt: Duration, pixels: &mut [u8]) {
        self.progress += WAVE_SPEED * dt.as_secs_f32();
        if self.progress > WAVE_SPAN {
            self.progress = 0.0;
            self.color = hsv_to_rgb(rand::random::<f32>() * 360.0, 1.0, 1.0);
        }

        let leds = pixels.len() / COLORS_PER_LED;
        for (i, led) in pixels.chunks_exact_mut(COLORS_PER_LED).enumerate() {
            let gain = self.intensity((i as f32 + 0.5) / leds as f32);
            for (byte, channel) in led.iter_mut().zip(self.color) {
                *byte = (256.0 * channel * gain).min(255.0) as u8;
            }
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leds(pixels: &[u8]) -> Vec<[u8; 3]> {
        pixels
            .chunks_exact(COLORS_PER_LED)
            .map(|led| [led[0], led[1], led[2]])
            .collect()
    }

    #[test]
    fn every_name_builds() {
        for name in EFFECT_NAMES {
            let effect = by_name(name, [1, 2, 3]).unwrap();
            assert_eq!(effect.name(), *name);
        }
        assert!(by_name("sparkle", [0; 3]).is_none());
    }

    #[test]
    fn solid_ignores_time() {
        let mut solid = Solid::new([10, 20, 30]);
        let mut pixels = [0u8; 6];
        solid.animate(Duration::from_secs(100), &mut pixels);
        assert_eq!(pixels, [10, 20, 30, 10, 20, 30]);
    }

    #[test]
    fn chase_moves_and_wraps() {
        let mut chase = Chase::new([255, 0, 0]).with_width(2).with_speed(1.0);
        let mut pixels = [0u8; 15];

        chase.animate(Duration::from_secs(1), &mut pixels);
        let lit: Vec<bool> = leds(&pixels).iter().map(|led| led[0] > 0).collect();
        assert_eq!(lit, [true, true, false, false, false]);

        chase.animate(Duration::from_secs(4), &mut pixels);
        let lit: Vec<bool> = leds(&pixels).iter().map(|led| led[0] > 0).collect();
        assert_eq!(lit, [true, false, false, false, true]);

        chase.reset();
        chase.animate(Duration::ZERO, &mut pixels);
        let lit: Vec<bool> = leds(&pixels).iter().map(|led| led[0] > 0).collect();
        assert_eq!(lit, [true, false, false, false, true]);
    }

    #[test]
    fn rainbow_spreads_hue_over_strip() {
        let mut rainbow = Rainbow::default();
        let mut pixels = [0u8; 9];
        rainbow.animate(Duration::ZERO, &mut pixels);
        assert_eq!(leds(&pixels), [[255, 0, 0], [0, 255, 0], [0, 0, 255]]);

        rainbow.animate(Duration::from_secs(1), &mut pixels);
        assert_ne!(leds(&pixels)[0], [255, 0, 0]);
        rainbow.reset();
        rainbow.animate(Duration::ZERO, &mut pixels);
        assert_eq!(leds(&pixels)[0], [255, 0, 0]);
    }

    #[test]
    fn wave_peaks_where_the_pulse_is() {
        let mut wave = Wave::default();
        let mut pixels = [0u8; 33];
        // Pulse centre reaches mid-strip.
        wave.animate(Duration::from_millis(2500), &mut pixels);
        let leds = leds(&pixels);
        assert_eq!(leds[5], [255, 255, 255]);
        assert_eq!(leds[0], [0, 0, 0]);
        assert_eq!(leds[10], [0, 0, 0]);
        assert!(leds[4][0] < 255 && leds[4][0] > 0);
    }

    #[test]
    fn wave_restarts_after_a_pass() {
        let mut wave = Wave::default();
        let mut pixels = [0u8; 30];
        wave.animate(Duration::from_secs(6), &mut pixels);
        // Pulse sits before the first LED again.
        assert!(pixels.iter().all(|&b| b < 8), "{pixels:?}");
    }
}
