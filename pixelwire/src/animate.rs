//! Frame producers: effects, fades, a timed playlist, and the pacing used by
//! [`FrameClient::stream`](crate::net::FrameClient::stream).
//!
//! An [`Effect`] fills a `3 × led_count` RGB buffer each time it is advanced
//! by a time step. Effects know nothing about the network; the client calls
//! them at a fixed rate and sends whatever they produce.

pub mod effect;
pub mod effects;
pub mod fade;
pub mod pacing;
pub mod playlist;

pub use effect::{Effect, hsv_to_rgb};
pub use effects::{Chase, EFFECT_NAMES, Rainbow, Solid, Wave, by_name};
pub use fade::{Fade, scale};
pub use pacing::Pacing;
pub use playlist::Playlist;
