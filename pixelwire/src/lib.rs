//! Real-time pixel streaming from a TCP producer onto an addressable LED strip.
//!
//! Frames arrive over TCP ([`runtime::ingest`]), are queued in a
//! [`sync::FrameChannel`], and are encoded into the strip's PWM waveform by
//! [`runtime::render`] before being handed to a [`strip::Backend`].
//!
//! On the producer side, [`net::FrameClient`] sends single frames or streams
//! an [`animate::Effect`] at a fixed frame rate.

pub mod animate;
pub mod config;
pub mod frame;
pub mod net;
pub mod runtime;
pub mod strip;
pub mod sync;
pub mod trace;

pub use config::Config;
pub use frame::{Frame, FrameSink};
pub use trace::init_tracing;
