use std::collections::HashMap;

use crate::error::EngineError;
use crate::word::Word;

/// A half-open `[start, end)` range of word-addresses whose materialization
/// is deferred until first touch.
#[derive(Debug, Clone, Copy)]
pub struct ZeroSegment<W> {
    pub start: W,
    pub end: W,
}

impl<W: Word> ZeroSegment<W> {
    fn contains(&self, wa: W) -> bool {
        wa >= self.start && wa < self.end
    }
}

/// Sparse word-addressed memory.
///
/// Backed by a standard hash map rather than a bespoke probing table: the
/// map's contract (amortized O(1) access, insertion order immaterial)
/// already satisfies the contract here, and a hand-rolled open-addressing
/// table would only duplicate what the standard library provides.
#[derive(Debug)]
pub struct Memory<W: Word> {
    words: HashMap<W, W>,
    zero_segments: Vec<ZeroSegment<W>>,
    zero_init: bool,
}

impl<W: Word> Memory<W> {
    pub fn new(zero_init: bool) -> Self {
        Self {
            words: HashMap::new(),
            zero_segments: Vec::new(),
            zero_init,
        }
    }

    /// Records a deferred zero-fill range. Never overlaps another.
    pub fn add_zero_segment(&mut self, start: W, end: W) {
        self.zero_segments.push(ZeroSegment { start, end });
    }

    pub fn zero_segment_count(&self) -> usize {
        self.zero_segments.len()
    }

    /// Observes materialization without side effects.
    pub fn contains_word(&self, wa: W) -> bool {
        self.words.contains_key(&wa)
    }

    /// Unconditional set, used only by the loader.
    pub fn write_word(&mut self, wa: W, value: W) {
        self.words.insert(wa, value);
    }

    /// Reads word `wa`, materializing it as zero on first touch if
    /// `zero_init` is set or `wa` falls inside a zero-segment.
    pub fn read_word(&mut self, wa: W) -> Result<W, EngineError> {
        if let Some(&value) = self.words.get(&wa) {
            return Ok(value);
        }
        if self.zero_init || self.zero_segments.iter().any(|seg| seg.contains(wa)) {
            self.words.insert(wa, W::ZERO);
            return Ok(W::ZERO);
        }
        Err(EngineError::UninitializedRead { addr: wa.to_u64() })
    }

    /// Flips the bit at bit-address `bit_addr`, materializing the
    /// containing word first if necessary so a second flip of the same
    /// bit XORs against the updated value, not against zero again.
    pub fn flip_bit(&mut self, bit_addr: W) -> Result<(), EngineError> {
        let word_addr = bit_addr.wrapping_shr(W::LOG_BITS);
        let bit_index = bit_addr.bitand(W::from_u64(W::BITS as u64 - 1)).to_u64() as u32;
        let mask = W::ONE.wrapping_shl(bit_index);
        let current = self.read_word(word_addr)?;
        self.words.insert(word_addr, current.bitxor(mask));
        Ok(())
    }
}
