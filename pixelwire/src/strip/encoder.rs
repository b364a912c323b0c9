//! Frame → PWM waveform encoder.

use super::color::ColorOrder;
use super::layout::{SYMBOLS_PER_GROUP, TransferBuffer, TransferLayout, WORD_BYTES};
use super::symbol::{SYMBOL_BYTES, SYMBOLS_PER_BIT, SymbolTable};

const STAGING_BYTES: usize = SYMBOLS_PER_GROUP * SYMBOL_BYTES;

/// Encodes packed LED colours into a reusable [`TransferBuffer`].
///
/// Each colour byte becomes a 3-byte symbol. Symbols are staged four at a
/// time (12 bytes), then written as three big-endian machine words into the
/// channel 0 slots of the buffer. Nothing is allocated after construction.
#[derive(Debug, Clone)]
pub struct WaveformEncoder {
    table: SymbolTable,
    order: ColorOrder,
    layout: TransferLayout,
    buffer: TransferBuffer,
}

impl WaveformEncoder {
    #[must_use]
    pub fn new(layout: TransferLayout, order: ColorOrder) -> Self {
        Self {
            table: SymbolTable::new(),
            order,
            buffer: TransferBuffer::new(&layout),
            layout,
        }
    }

    #[must_use]
    pub const fn layout(&self) -> &TransferLayout {
        &self.layout
    }

    #[must_use]
    pub const fn order(&self) -> ColorOrder {
        self.order
    }

    /// The most recently encoded buffer.
    #[must_use]
    pub const fn buffer(&self) -> &TransferBuffer {
        &self.buffer
    }

    /// Encodes one `0x00RRGGBB` word per LED.
    ///
    /// # Panics
    ///
    /// Panics if `leds` holds more LEDs than the layout was built for.
    pub fn encode(&mut self, leds: &[u32]) -> &TransferBuffer {
        assert!(
            leds.len() <= self.layout.led_count(),
            "{} LEDs exceed layout of {}",
            leds.len(),
            self.layout.led_count()
        );

        let mut staging = [0u8; STAGING_BYTES];
        let mut staged = 0;
        let mut word = 0;

        for &led in leds {
            for byte in self.order.wire_bytes(led) {
                let at = staged * SYMBOL_BYTES;
                staging[at..at + SYMBOL_BYTES].copy_from_slice(&self.table.lookup_bytes(byte));
                staged += 1;

                if staged == SYMBOLS_PER_GROUP {
                    word = self.flush(&staging, word);
                    staging = [0u8; STAGING_BYTES];
                    staged = 0;
                }
            }
        }

        // Stragglers: unused symbol slots stay zero.
        if staged > 0 {
            self.flush(&staging, word);
        }

        &self.buffer
    }

    /// Encodes every LED as off.
    pub fn encode_off(&mut self) -> &TransferBuffer {
        let off = self.table.lookup_bytes(0);
        let mut staging = [0u8; STAGING_BYTES];
        for symbol in staging.chunks_exact_mut(SYMBOL_BYTES) {
            symbol.copy_from_slice(&off);
        }

        let symbols = self.layout.frame_len();
        let full_groups = symbols / SYMBOLS_PER_GROUP;
        let mut word = 0;
        for _ in 0..full_groups {
            word = self.flush(&staging, word);
        }

        let rest = symbols % SYMBOLS_PER_GROUP;
        if rest > 0 {
            staging[rest * SYMBOL_BYTES..].fill(0);
            self.flush(&staging, word);
        }

        &self.buffer
    }

    /// Writes a staged group as three words starting at `word`, returning
    /// the next word index.
    fn flush(&mut self, staging: &[u8; STAGING_BYTES], mut word: usize) -> usize {
        for chunk in staging.chunks_exact(WORD_BYTES) {
            self.buffer
                .put_word(word, u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
            word += 1;
        }
        word
    }
}

/// Recovers the colour bytes carried by a buffer's channel 0 words, in wire
/// order. Used to check encoder output.
#[must_use]
pub fn decode_channel(buffer: &TransferBuffer, color_bytes: usize) -> Vec<u8> {
    let stream: Vec<u8> = buffer
        .channel_words()
        .flat_map(u32::to_be_bytes)
        .collect();

    stream
        .chunks_exact(SYMBOL_BYTES)
        .take(color_bytes)
        .map(|s| {
            let symbol = u32::from_be_bytes([0, s[0], s[1], s[2]]);
            (0..8).fold(0u8, |byte, bit| {
                let carried = (symbol >> (bit * SYMBOLS_PER_BIT + 1)) & 1;
                byte | ((carried as u8) << bit)
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strip::layout::{DEFAULT_RESET_US, PWM_CHANNELS, WORDS_PER_GROUP};

    fn encoder(leds: usize, order: ColorOrder) -> WaveformEncoder {
        WaveformEncoder::new(TransferLayout::new(leds, 800_000, DEFAULT_RESET_US), order)
    }

    #[test]
    fn first_group_matches_hand_packed_words() {
        // Two LEDs, red then green. Four colour bytes: ff 00 00 00.
        let mut enc = encoder(2, ColorOrder::Rgb);
        enc.encode(&[ColorOrder::pack(0xFF, 0, 0), ColorOrder::pack(0, 0xFF, 0)]);

        let words: Vec<u32> = enc.buffer().words().take(6).collect();
        // Symbols db6db6 924924 924924 924924 packed into three words.
        assert_eq!(words, [0xDB6D_B692, 0, 0x4924_9249, 0, 0x2492_4924, 0]);
    }

    #[test]
    fn words_land_little_endian_in_memory() {
        let mut enc = encoder(4, ColorOrder::Rgb);
        enc.encode(&[ColorOrder::pack(0xFF, 0, 0); 4]);
        assert_eq!(&enc.buffer().as_bytes()[..4], &[0x92, 0xB6, 0x6D, 0xDB]);
    }

    #[test]
    fn channel_interleave_leaves_odd_words_zero() {
        let leds: Vec<u32> = (0..37u32).map(|i| i * 0x0003_0507).collect();
        let mut enc = encoder(leds.len(), ColorOrder::Grb);
        enc.encode(&leds);

        let layout = *enc.layout();
        let words: Vec<u32> = enc.buffer().words().collect();
        assert_eq!(words.len(), layout.channel_words() * PWM_CHANNELS);

        let data = layout.data_words();
        for (i, pair) in words.chunks_exact(2).enumerate() {
            assert_eq!(pair[1], 0, "reserved word {i} must be zero");
            if i >= data {
                assert_eq!(pair[0], 0, "latch word {i} must be zero");
            }
        }
        // Every data word carries at least one high symbol.
        assert!(words.iter().step_by(2).take(data - WORDS_PER_GROUP).all(|&w| w != 0));
    }

    #[test]
    fn decode_recovers_wire_bytes() {
        let leds = [
            ColorOrder::pack(0x12, 0x34, 0x56),
            ColorOrder::pack(0xFE, 0x01, 0x80),
            ColorOrder::pack(0x00, 0xFF, 0x7F),
        ];
        let mut enc = encoder(leds.len(), ColorOrder::Rgb);
        enc.encode(&leds);
        assert_eq!(
            decode_channel(enc.buffer(), 9),
            [0x12, 0x34, 0x56, 0xFE, 0x01, 0x80, 0x00, 0xFF, 0x7F]
        );
    }

    #[test]
    fn colour_order_reorders_wire_bytes() {
        let leds = [ColorOrder::pack(1, 2, 3), ColorOrder::pack(4, 5, 6)];
        let mut enc = encoder(leds.len(), ColorOrder::Bgr);
        enc.encode(&leds);
        assert_eq!(decode_channel(enc.buffer(), 6), [3, 2, 1, 6, 5, 4]);
    }

    #[test]
    fn straggler_group_pads_with_zero_slots() {
        // 1 LED = 3 symbols; the fourth slot of the group stays zero.
        let mut enc = encoder(1, ColorOrder::Rgb);
        enc.encode(&[ColorOrder::pack(0, 0, 0)]);
        let words: Vec<u32> = enc.buffer().channel_words().take(3).collect();
        assert_eq!(words, [0x9249_2492, 0x4924_9249, 0x2400_0000]);
    }

    #[test]
    fn encode_off_matches_encoding_black() {
        for leds in [1, 2, 3, 4, 5, 33] {
            let mut black = encoder(leds, ColorOrder::Rgb);
            black.encode(&vec![0; leds]);
            let mut off = encoder(leds, ColorOrder::Rgb);
            off.encode_off();
            assert_eq!(off.buffer(), black.buffer(), "{leds} LEDs");
        }
    }

    #[test]
    fn reencoding_overwrites_previous_frame() {
        let mut enc = encoder(8, ColorOrder::Rgb);
        enc.encode(&[0x00FF_FFFF; 8]);
        enc.encode(&[0; 8]);

        let mut fresh = encoder(8, ColorOrder::Rgb);
        fresh.encode(&[0; 8]);
        assert_eq!(enc.buffer(), fresh.buffer());
    }
}
