//! Colour channel order.
//!
//! Frames always carry red, green, blue per LED. Strips disagree on the
//! order they expect on the wire, so each LED is first packed into a
//! `0x00RRGGBB` word and the wire bytes are then pulled out with per-order
//! bit shifts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Order in which a strip expects the three colour bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorOrder {
    #[default]
    Rgb,
    Rbg,
    Grb,
    Gbr,
    Brg,
    Bgr,
}

const RED: u32 = 16;
const GREEN: u32 = 8;
const BLUE: u32 = 0;

impl ColorOrder {
    pub const ALL: [Self; 6] = [
        Self::Rgb,
        Self::Rbg,
        Self::Grb,
        Self::Gbr,
        Self::Brg,
        Self::Bgr,
    ];

    /// Bit shifts that extract the first, second and third wire byte from a
    /// packed `0x00RRGGBB` word.
    #[must_use]
    pub const fn shifts(self) -> [u32; 3] {
        match self {
            Self::Rgb => [RED, GREEN, BLUE],
            Self::Rbg => [RED, BLUE, GREEN],
            Self::Grb => [GREEN, RED, BLUE],
            Self::Gbr => [GREEN, BLUE, RED],
            Self::Brg => [BLUE, RED, GREEN],
            Self::Bgr => [BLUE, GREEN, RED],
        }
    }

    /// Packs one LED into a `0x00RRGGBB` word.
    #[must_use]
    pub const fn pack(red: u8, green: u8, blue: u8) -> u32 {
        ((red as u32) << RED) | ((green as u32) << GREEN) | ((blue as u32) << BLUE)
    }

    /// Wire bytes for a packed LED word, in transmission order.
    #[must_use]
    pub const fn wire_bytes(self, led: u32) -> [u8; 3] {
        let [first, second, third] = self.shifts();
        [
            (led >> first) as u8,
            (led >> second) as u8,
            (led >> third) as u8,
        ]
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rgb => "rgb",
            Self::Rbg => "rbg",
            Self::Grb => "grb",
            Self::Gbr => "gbr",
            Self::Brg => "brg",
            Self::Bgr => "bgr",
        }
    }
}

impl fmt::Display for ColorOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a [`ColorOrder`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown colour order {0:?} (expected one of rgb, rbg, grb, gbr, brg, bgr)")]
pub struct ParseColorOrderError(String);

impl FromStr for ColorOrder {
    type Err = ParseColorOrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|order| order.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseColorOrderError(s.to_string()))
    }
}
