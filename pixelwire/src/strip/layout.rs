//! Transfer buffer geometry.
//!
//! The PWM block drains one buffer for both of its channels, alternating
//! 32-bit words between them. Only channel 0 drives a strip, so live data
//! goes into the even words and every odd word stays zero:
//!
//! ```text
//! word:   0      1      2      3      4      5     ...
//!       [ d0 ] [ 0  ] [ d1 ] [ 0  ] [ d2 ] [ 0  ]  ...  [ reset: all zero ]
//! ```
//!
//! After the data each channel carries a run of zero words long enough for
//! the strip to latch (`reset_us`), plus one idle word.

use std::time::Duration;

use super::symbol::{SYMBOL_BYTES, SYMBOLS_PER_BIT};

/// Channels interleaved by the PWM block.
pub const PWM_CHANNELS: usize = 2;
/// Bytes per machine word.
pub const WORD_BYTES: usize = 4;
/// Colour bytes per LED.
pub const COLORS_PER_LED: usize = 3;
/// Colour symbols staged before a write: four 3-byte symbols fill three words.
pub const SYMBOLS_PER_GROUP: usize = 4;
/// Machine words produced by one staged group.
pub const WORDS_PER_GROUP: usize = SYMBOLS_PER_GROUP * SYMBOL_BYTES / WORD_BYTES;
/// Default minimum low time that latches a frame, in microseconds.
pub const DEFAULT_RESET_US: u32 = 55;

/// Size of the transfer buffer for one strip configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferLayout {
    led_count: usize,
    frequency: u32,
    data_words: usize,
    channel_words: usize,
}

impl TransferLayout {
    /// Computes the layout for `led_count` LEDs clocked at `frequency` Hz
    /// with a latch gap of at least `reset_us` microseconds.
    #[must_use]
    pub fn new(led_count: usize, frequency: u32, reset_us: u32) -> Self {
        let groups = (led_count * COLORS_PER_LED).div_ceil(SYMBOLS_PER_GROUP);
        let data_words = groups * WORDS_PER_GROUP;

        let symbol_rate = u64::from(frequency) * SYMBOLS_PER_BIT as u64;
        let reset_bits = u64::from(reset_us) * symbol_rate / 1_000_000;
        let reset_bytes = usize::try_from(reset_bits.div_ceil(8)).unwrap_or(usize::MAX);

        let channel_bytes =
            (data_words * WORD_BYTES).saturating_add(reset_bytes).next_multiple_of(WORD_BYTES);
        // One trailing idle word per channel.
        let channel_words = channel_bytes / WORD_BYTES + 1;

        Self {
            led_count,
            frequency,
            data_words,
            channel_words,
        }
    }

    #[must_use]
    pub const fn led_count(&self) -> usize {
        self.led_count
    }

    #[must_use]
    pub const fn frequency(&self) -> u32 {
        self.frequency
    }

    /// Bytes in one frame as received on the wire.
    #[must_use]
    pub const fn frame_len(&self) -> usize {
        self.led_count * COLORS_PER_LED
    }

    /// Live data words carried by channel 0.
    #[must_use]
    pub const fn data_words(&self) -> usize {
        self.data_words
    }

    /// Words per channel, data plus latch gap plus idle word.
    #[must_use]
    pub const fn channel_words(&self) -> usize {
        self.channel_words
    }

    /// Total buffer size across both channels.
    #[must_use]
    pub const fn byte_len(&self) -> usize {
        self.channel_words * WORD_BYTES * PWM_CHANNELS
    }

    /// Time the hardware needs to clock out one channel of the buffer.
    #[must_use]
    pub fn transmit_time(&self) -> Duration {
        let bits = (self.channel_words * WORD_BYTES * 8) as u64;
        let symbol_rate = u64::from(self.frequency) * SYMBOLS_PER_BIT as u64;
        if symbol_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(bits * 1_000_000_000 / symbol_rate)
    }
}

/// The hardware-facing byte buffer, in little-endian word order.
///
/// Allocated once per renderer and rewritten in place every frame. Words not
/// written by the encoder (the reserved channel and the latch gap) stay zero
/// for the buffer's whole life.
#[derive(Clone, PartialEq, Eq)]
pub struct TransferBuffer {
    bytes: Box<[u8]>,
}

impl TransferBuffer {
    /// Allocates a zeroed buffer for `layout`.
    #[must_use]
    pub fn new(layout: &TransferLayout) -> Self {
        Self {
            bytes: vec![0u8; layout.byte_len()].into_boxed_slice(),
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// All machine words, both channels interleaved.
    pub fn words(&self) -> impl Iterator<Item = u32> + '_ {
        self.bytes
            .chunks_exact(WORD_BYTES)
            .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
    }

    /// Channel 0 words only.
    pub fn channel_words(&self) -> impl Iterator<Item = u32> + '_ {
        self.words().step_by(PWM_CHANNELS)
    }

    /// Writes the `index`-th channel 0 word.
    ///
    /// # Panics
    ///
    /// Panics if `index` lies outside the buffer.
    #[inline]
    pub(crate) fn put_word(&mut self, index: usize, word: u32) {
        let offset = index * WORD_BYTES * PWM_CHANNELS;
        self.bytes[offset..offset + WORD_BYTES].copy_from_slice(&word.to_le_bytes());
    }
}

impl std::fmt::Debug for TransferBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferBuffer")
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}
