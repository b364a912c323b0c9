//! Frame type shared by the ingest and render sides.

use std::sync::Arc;

/// One full set of pixel values for the strip, or the clear sentinel.
///
/// A [`Frame::Pixels`] holds `3 × led_count` bytes, red/green/blue per LED in
/// LED order. The ingest server only ever builds pixel frames of exactly that
/// length; [`Frame::Clear`] asks the renderer to turn every LED off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Raw RGB bytes, LED-major.
    Pixels(Box<[u8]>),
    /// No data: blank the strip.
    Clear,
}

impl Frame {
    /// Builds a pixel frame from raw RGB bytes.
    #[must_use]
    pub fn pixels(bytes: impl Into<Box<[u8]>>) -> Self {
        Self::Pixels(bytes.into())
    }

    /// Returns `true` for the clear sentinel.
    #[must_use]
    pub const fn is_clear(&self) -> bool {
        matches!(self, Self::Clear)
    }

    /// Returns the pixel bytes; empty for the clear sentinel.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Pixels(bytes) => bytes,
            Self::Clear => &[],
        }
    }

    /// Number of pixel bytes carried.
    #[must_use]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Destination for frames produced by the ingest server.
///
/// Implementations must never block for long: the ingest worker calls
/// [`FrameSink::submit`] from its event loop.
pub trait FrameSink: Send + Sync {
    /// Accepts one frame.
    fn submit(&self, frame: Frame);
}

impl<T: FrameSink + ?Sized> FrameSink for Arc<T> {
    fn submit(&self, frame: Frame) {
        (**self).submit(frame);
    }
}
