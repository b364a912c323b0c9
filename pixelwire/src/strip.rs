//! WS281x strip model: colour order, waveform symbols, the interleaved
//! transfer buffer, and the hardware [`Backend`] capability.
//!
//! # Waveform
//!
//! Each data bit is sent as three PWM symbols at 3× the strip frequency: a
//! fixed high symbol, a symbol that carries the bit, and a fixed low symbol.
//!
//! ```text
//! bit 1:  1 1 0
//! bit 0:  1 0 0
//! ```
//!
//! A colour byte therefore becomes a 24-bit symbol word ([`SymbolTable`]).
//! Symbol words are packed four at a time into three 32-bit machine words and
//! written into every other word of the [`TransferBuffer`], because the PWM
//! block serializes two channels from one buffer.

pub mod backend;
pub mod color;
pub mod encoder;
pub mod layout;
pub mod symbol;

pub use backend::{Backend, SimulatedBackend};
pub use color::ColorOrder;
pub use encoder::WaveformEncoder;
pub use layout::{TransferBuffer, TransferLayout};
pub use symbol::SymbolTable;
