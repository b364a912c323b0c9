//! LED renderer.
//!
//! Pulls frames off a [`FrameChannel`], encodes them into the transfer
//! buffer and drives the [`Backend`]. A transfer is always waited out before
//! the next one is submitted, since both share one buffer.

use std::error::Error;
use std::sync::Arc;

use minstant::Instant;
use thiserror::Error;

use crate::config::StripConfig;
use crate::frame::Frame;
use crate::strip::layout::COLORS_PER_LED;
use crate::strip::{Backend, ColorOrder, WaveformEncoder};
use crate::sync::worker::FatalHandler;
use crate::sync::{CancellableWorker, FrameChannel, StopSignal, Tickable, Wake};
use crate::trace::{debug, info, trace};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("frame is {actual} bytes, strip needs {expected}")]
    FrameLength { expected: usize, actual: usize },
    #[error("backend initialization failed: {0}")]
    Initialize(#[source] Box<dyn Error + Send + Sync>),
    #[error("backend transfer failed: {0}")]
    Transfer(#[source] Box<dyn Error + Send + Sync>),
    #[error("renderer is running")]
    Running,
    #[error("render loop was lost to a panic")]
    LoopLost,
}

struct RenderLoop<B: Backend> {
    channel: Arc<FrameChannel>,
    encoder: WaveformEncoder,
    backend: B,
    /// Packed `0x00RRGGBB` per LED, reused across frames.
    colors: Vec<u32>,
    frames: u64,
}

impl<B: Backend> RenderLoop<B> {
    fn render(&mut self, frame: &Frame) -> Result<(), RenderError> {
        let started = Instant::now();

        let buffer = match frame {
            Frame::Clear => self.encoder.encode_off(),
            Frame::Pixels(bytes) => {
                let expected = self.colors.len() * COLORS_PER_LED;
                if bytes.len() != expected {
                    return Err(RenderError::FrameLength {
                        expected,
                        actual: bytes.len(),
                    });
                }
                for (color, rgb) in self.colors.iter_mut().zip(bytes.chunks_exact(COLORS_PER_LED)) {
                    *color = ColorOrder::pack(rgb[0], rgb[1], rgb[2]);
                }
                self.encoder.encode(&self.colors)
            }
        };

        self.backend
            .submit(buffer)
            .map_err(|e| RenderError::Transfer(Box::new(e)))?;
        self.backend
            .wait()
            .map_err(|e| RenderError::Transfer(Box::new(e)))?;

        self.frames += 1;
        trace!(
            frame = self.frames,
            clear = frame.is_clear(),
            render_us = started.elapsed().as_micros() as u64,
            queued = self.channel.len(),
            "frame rendered"
        );
        Ok(())
    }
}

impl<B: Backend> Tickable for RenderLoop<B> {
    type Error = RenderError;

    fn tick(&mut self, stop: &StopSignal) -> Result<(), RenderError> {
        match self.channel.pop_or_stop(stop) {
            Some(frame) => self.render(&frame),
            None => Ok(()),
        }
    }
}

impl<B: Backend> Drop for RenderLoop<B> {
    fn drop(&mut self) {
        debug!(frames = self.frames, "releasing backend");
        self.backend.shutdown();
    }
}

/// Renders frames from a [`FrameChannel`] onto a strip.
///
/// Owns the encoder, its transfer buffer and the backend. None of them are
/// touched by any thread other than the render worker.
pub struct LedRenderer<B: Backend> {
    worker: CancellableWorker<RenderLoop<B>>,
}

impl<B: Backend> LedRenderer<B> {
    /// Initializes `backend` for `strip` and prepares an idle renderer.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Initialize`] if the backend cannot claim the
    /// hardware.
    pub fn new(
        strip: &StripConfig,
        channel: Arc<FrameChannel>,
        mut backend: B,
    ) -> Result<Self, RenderError> {
        backend
            .initialize(strip)
            .map_err(|e| RenderError::Initialize(Box::new(e)))?;

        let tickable = RenderLoop {
            channel: Arc::clone(&channel),
            encoder: WaveformEncoder::new(strip.layout(), strip.color_order),
            backend,
            colors: vec![0; strip.led_count],
            frames: 0,
        };
        let waker: Arc<dyn Wake> = channel;
        Ok(Self {
            worker: CancellableWorker::new("pixel-render", tickable, waker),
        })
    }

    /// Pins the render thread to `core` from the next start.
    #[must_use]
    pub fn pinned_to(mut self, core: Option<usize>) -> Self {
        self.worker = self.worker.pinned_to(core);
        self
    }

    /// Routes fatal render errors to `handler` instead of exiting.
    #[must_use]
    pub fn with_fatal_handler(mut self, handler: FatalHandler) -> Self {
        self.worker = self.worker.with_fatal_handler(handler);
        self
    }

    /// Starts the render worker. No-op if already running.
    pub fn run(&mut self) {
        self.worker.start();
        info!("renderer started");
    }

    /// Stops the render worker after the frame in progress.
    pub fn stop(&mut self) {
        self.worker.stop();
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    /// Renders [`Frame::Clear`] on the calling thread.
    ///
    /// # Errors
    ///
    /// Fails with [`RenderError::Running`] unless the worker is stopped,
    /// and with [`RenderError::LoopLost`] once a panic has taken the loop.
    pub fn clear(&mut self) -> Result<(), RenderError> {
        if self.worker.is_running() {
            return Err(RenderError::Running);
        }
        // Reaps a loop that ended on a fatal error.
        self.worker.stop();
        let render = self.worker.get_mut().ok_or(RenderError::LoopLost)?;
        render.render(&Frame::Clear)
    }

    /// Frames rendered so far. `None` while the worker is running.
    pub fn frames_rendered(&mut self) -> Option<u64> {
        self.worker.get_mut().map(|render| render.frames)
    }

    /// The backend, while the worker is stopped.
    pub fn backend_mut(&mut self) -> Option<&mut B> {
        self.worker.get_mut().map(|render| &mut render.backend)
    }
}
