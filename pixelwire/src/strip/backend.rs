//! Hardware transfer capability.
//!
//! The renderer never touches DMA, PWM, GPIO or clock registers. It only
//! hands a finished [`TransferBuffer`] to a [`Backend`] and waits for the
//! transfer to finish. Register-level drivers live outside this crate.

use std::time::Duration;

use minstant::Instant;

use crate::config::StripConfig;
use crate::trace::{debug, info};

use super::layout::{TransferBuffer, TransferLayout};

/// A DMA/PWM engine that clocks a transfer buffer out to the strip.
///
/// Driven exclusively by the render thread. `submit` must not be called
/// again until `wait` has reported the previous transfer complete.
pub trait Backend: Send + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Claims the hardware for `strip`. Called once, before any transfer.
    fn initialize(&mut self, strip: &StripConfig) -> Result<(), Self::Error>;

    /// Starts transmitting `buffer`. Returns without waiting for completion.
    fn submit(&mut self, buffer: &TransferBuffer) -> Result<(), Self::Error>;

    /// Blocks until the last submitted transfer has finished.
    ///
    /// This wait is not interruptible by the render worker's stop signal.
    /// It is bounded by one transfer's wire time (about 30 ms for 1000 LEDs
    /// at 800 kHz), and the stop signal is checked before the next frame is
    /// popped, so a stop request takes effect within one transfer.
    /// Implementations must return once the hardware reports completion or
    /// an error; they must not wait indefinitely.
    fn wait(&mut self) -> Result<(), Self::Error>;

    /// Releases the hardware.
    fn shutdown(&mut self) {}
}

/// Error from [`SimulatedBackend`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimulatedError {
    #[error("backend used before initialize")]
    NotInitialized,
    #[error("transfer buffer is {actual} bytes, layout needs {expected}")]
    BufferSize { expected: usize, actual: usize },
    #[error("transfer submitted while the previous one is in flight")]
    Busy,
}

/// A backend without hardware.
///
/// Checks every buffer against the strip layout and makes `wait` take as
/// long as the real wire time, so a pipeline on a development machine paces
/// like one driving a strip.
#[derive(Debug, Default)]
pub struct SimulatedBackend {
    layout: Option<TransferLayout>,
    in_flight: Option<(Instant, Duration)>,
    transfers: u64,
}

impl SimulatedBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Transfers completed so far.
    #[must_use]
    pub const fn transfers(&self) -> u64 {
        self.transfers
    }
}

impl Backend for SimulatedBackend {
    type Error = SimulatedError;

    fn initialize(&mut self, strip: &StripConfig) -> Result<(), SimulatedError> {
        let layout = strip.layout();
        info!(
            leds = strip.led_count,
            gpio = strip.gpio,
            dma = strip.dma,
            frequency = strip.frequency,
            buffer_bytes = layout.byte_len(),
            "simulated backend initialized"
        );
        self.layout = Some(layout);
        Ok(())
    }

    fn submit(&mut self, buffer: &TransferBuffer) -> Result<(), SimulatedError> {
        let layout = self.layout.ok_or(SimulatedError::NotInitialized)?;
        if buffer.len() != layout.byte_len() {
            return Err(SimulatedError::BufferSize {
                expected: layout.byte_len(),
                actual: buffer.len(),
            });
        }
        if self.in_flight.is_some() {
            return Err(SimulatedError::Busy);
        }
        self.in_flight = Some((Instant::now(), layout.transmit_time()));
        Ok(())
    }

    fn wait(&mut self) -> Result<(), SimulatedError> {
        let Some((started, duration)) = self.in_flight.take() else {
            return Ok(());
        };
        let remaining = duration.saturating_sub(started.elapsed());
        if !remaining.is_zero() {
            std::thread::sleep(remaining);
        }
        self.transfers += 1;
        Ok(())
    }

    fn shutdown(&mut self) {
        debug!(transfers = self.transfers, "simulated backend shut down");
        self.layout = None;
    }
}
