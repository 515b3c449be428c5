use std::io::{self, Read, Write};

use crate::error::EngineError;
use crate::memory::Memory;
use crate::stats::RunStatistics;
use crate::word::Word;

/// Bit-serial adapter between byte streams and the four reserved low
/// memory words that carry machine-visible I/O bits.
pub struct IoBridge<In, Out> {
    input: In,
    output: Out,
    in_byte: u8,
    in_bits_remaining: u8,
    out_byte: u8,
    out_bits_accumulated: u8,
}

impl<In: Read, Out: Write> IoBridge<In, Out> {
    pub fn new(input: In, output: Out) -> Self {
        Self {
            input,
            output,
            in_byte: 0,
            in_bits_remaining: 0,
            out_byte: 0,
            out_bits_accumulated: 0,
        }
    }

    /// Services a word-read at `addr_bit` that may straddle `IO_IN`, then
    /// delegates to `memory.read_word`. Intervention happens at most once
    /// per read and always precedes the read it was triggered by.
    pub fn observe_then_read<W: Word>(
        &mut self,
        addr_bit: W,
        memory: &mut Memory<W>,
        stats: &mut RunStatistics,
    ) -> Result<W, EngineError> {
        let addr = addr_bit.to_u64();
        let w = W::BITS as u64;
        let io_in_bit = 3 * w + W::IO_IN_BIT as u64;
        if addr <= io_in_bit && io_in_bit < addr + w {
            self.service_input_bit::<W>(memory, stats)?;
        }
        memory.read_word(addr_bit.wrapping_shr(W::LOG_BITS))
    }

    fn service_input_bit<W: Word>(
        &mut self,
        memory: &mut Memory<W>,
        stats: &mut RunStatistics,
    ) -> Result<(), EngineError> {
        if self.in_bits_remaining == 0 {
            self.in_byte = stats.time_io(|| read_byte_or_zero(&mut self.input));
            self.in_bits_remaining = 8;
        }

        let next_bit = self.in_byte & 1;
        let mask = W::ONE.wrapping_shl(W::IO_IN_BIT);
        let word3 = memory.read_word(W::from_u64(3))?;
        let current_bit = if word3.bitand(mask).to_u64() != 0 { 1 } else { 0 };

        if next_bit != current_bit {
            let io_in_addr = W::from_u64(3 * W::BITS as u64 + W::IO_IN_BIT as u64);
            memory.flip_bit(io_in_addr)?;
        }

        self.in_byte >>= 1;
        self.in_bits_remaining -= 1;
        Ok(())
    }

    /// Handles a flip targeting `OUT0`/`OUT1`: packs the bit LSB-first into
    /// the output accumulator, flushing a full byte to the output sink.
    pub fn emit_bit<W: Word>(&mut self, addr: W, stats: &mut RunStatistics) -> io::Result<()> {
        let is_one = addr.to_u64() == 2 * W::BITS as u64 + 1;
        if is_one {
            self.out_byte |= 1 << self.out_bits_accumulated;
        }
        self.out_bits_accumulated += 1;
        if self.out_bits_accumulated == 8 {
            stats.time_io(|| -> io::Result<()> {
                self.output.write_all(&[self.out_byte])?;
                self.output.flush()
            })?;
            self.out_byte = 0;
            self.out_bits_accumulated = 0;
        }
        Ok(())
    }
}

/// Whether flipping bit-address `addr` means emitting an output bit rather
/// than mutating ordinary memory (bit-address `2w` or `2w+1`).
pub fn targets_output<W: Word>(addr: W) -> bool {
    let a = addr.to_u64();
    let w = W::BITS as u64;
    a == 2 * w || a == 2 * w + 1
}

/// Reads one byte, treating EOF as an infinite stream of zero bits rather
/// than blocking forever or panicking. This is a deliberate, documented
/// policy choice, not an oversight.
fn read_byte_or_zero<R: Read>(input: &mut R) -> u8 {
    let mut buf = [0u8; 1];
    match input.read_exact(&mut buf) {
        Ok(()) => buf[0],
        Err(_) => 0,
    }
}
