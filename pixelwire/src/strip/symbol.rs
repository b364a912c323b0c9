//! Byte → 24-bit waveform symbol lookup.

/// Symbol bits for a one: high, high, low.
pub const SYMBOL_HIGH: u32 = 0b110;
/// Symbol bits for a zero: high, low, low.
pub const SYMBOL_LOW: u32 = 0b100;
/// PWM symbols per data bit.
pub const SYMBOLS_PER_BIT: usize = 3;
/// Bytes one encoded colour byte occupies (8 bits × 3 symbols).
pub const SYMBOL_BYTES: usize = 3;

/// Encodes one byte as eight 3-bit groups, least significant bit first.
///
/// Data bit `i` lands in output bits `3i..=3i+2`. Read most significant
/// first, the word is the bit stream the strip expects.
#[must_use]
pub const fn encode_byte(byte: u8) -> u32 {
    let mut symbol = 0u32;
    let mut bit = 0;
    while bit < 8 {
        let group = if byte & (1 << bit) != 0 {
            SYMBOL_HIGH
        } else {
            SYMBOL_LOW
        };
        symbol |= group << (bit * SYMBOLS_PER_BIT);
        bit += 1;
    }
    symbol
}

/// Precomputed symbols for every byte value.
#[derive(Clone, PartialEq, Eq)]
pub struct SymbolTable {
    entries: [u32; 256],
}

impl SymbolTable {
    #[must_use]
    pub const fn new() -> Self {
        let mut entries = [0u32; 256];
        let mut byte = 0;
        while byte < 256 {
            entries[byte] = encode_byte(byte as u8);
            byte += 1;
        }
        Self { entries }
    }

    #[inline]
    #[must_use]
    pub const fn lookup(&self, byte: u8) -> u32 {
        self.entries[byte as usize]
    }

    /// The symbol as three bytes, most significant first.
    #[inline]
    #[must_use]
    pub const fn lookup_bytes(&self, byte: u8) -> [u8; SYMBOL_BYTES] {
        let [_, high, mid, low] = self.lookup(byte).to_be_bytes();
        [high, mid, low]
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolTable").finish_non_exhaustive()
    }
}
