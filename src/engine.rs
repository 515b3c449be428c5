use std::io::{Read, Write};

use log::{log_enabled, trace};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::io_bridge::{targets_output, IoBridge};
use crate::memory::Memory;
use crate::stats::RunStatistics;
use crate::word::Word;

/// The fetch-flip-jump loop: reads word `F` at `ip`, reads word `J` at
/// `ip+w`, flips the bit at bit-address `F`, sets `ip := J`, and halts on
/// a direct self-jump whose flip target lies outside the instruction.
pub struct Engine<W: Word, In, Out> {
    ip: W,
    memory: Memory<W>,
    io: IoBridge<In, Out>,
    config: EngineConfig,
    stats: RunStatistics,
}

impl<W: Word, In: Read, Out: Write> Engine<W, In, Out> {
    pub fn new(memory: Memory<W>, io: IoBridge<In, Out>, config: EngineConfig) -> Self {
        Self {
            ip: W::ZERO,
            memory,
            io,
            config,
            stats: RunStatistics::new(),
        }
    }

    pub fn ip(&self) -> u64 {
        self.ip.to_u64()
    }

    pub fn stats(&self) -> &RunStatistics {
        &self.stats
    }

    pub fn memory(&self) -> &Memory<W> {
        &self.memory
    }

    /// Runs cycles until the machine halts or hits a fatal error.
    pub fn run(&mut self) -> Result<(), EngineError> {
        while self.step()? {}
        self.stats.stop_timer();
        Ok(())
    }

    /// Executes a single fetch-flip-jump cycle.
    ///
    /// Returns `Ok(false)` when the halt condition fires.
    pub fn step(&mut self) -> Result<bool, EngineError> {
        let ip = self.ip;

        let alignment_bits = self.config.alignment.word_multiplier() as u64 * W::BITS as u64;
        if ip.to_u64() % alignment_bits != 0 {
            return Err(EngineError::Unaligned { ip: ip.to_u64() });
        }

        let f = self.memory.read_word(ip.wrapping_shr(W::LOG_BITS))?;
        let flip_in_instruction = self.flip_targets_current_instruction(ip, f);

        if log_enabled!(log::Level::Trace) {
            trace!("ip={:#x} F={:#x} self_flip={flip_in_instruction}", ip.to_u64(), f.to_u64());
        }

        if !self.config.allow_self_modify && flip_in_instruction {
            return Err(EngineError::SelfFlip {
                ip: ip.to_u64(),
                flip: f.to_u64(),
            });
        }

        let j = if self.config.jump_before_flip {
            self.apply_flip(f)?;
            self.fetch_jump_target(ip)?
        } else {
            let j = self.fetch_jump_target(ip)?;
            self.apply_flip(f)?;
            j
        };

        // Halt test runs after the flip has committed, regardless of
        // jump_before_flip order.
        if j == ip && !flip_in_instruction {
            trace!("halted at ip={:#x}", ip.to_u64());
            return Ok(false);
        }

        if self.config.no_null_jump && j.to_u64() < 2 * W::BITS as u64 {
            return Err(EngineError::NullJump { target: j.to_u64() });
        }

        self.ip = j;
        if self.config.count_stats {
            self.stats.count();
        }
        Ok(true)
    }

    fn flip_targets_current_instruction(&self, ip: W, f: W) -> bool {
        let ip64 = ip.to_u64();
        let f64_ = f.to_u64();
        ip64 <= f64_ && f64_ < ip64 + 2 * W::BITS as u64
    }

    fn apply_flip(&mut self, f: W) -> Result<(), EngineError> {
        if targets_output(f) {
            self.io.emit_bit(f, &mut self.stats)?;
        } else {
            self.memory.flip_bit(f)?;
        }
        Ok(())
    }

    fn fetch_jump_target(&mut self, ip: W) -> Result<W, EngineError> {
        let addr_bit = ip.wrapping_add(W::from_u64(W::BITS as u64));
        self.io
            .observe_then_read(addr_bit, &mut self.memory, &mut self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn engine_with(
        memory: Memory<u64>,
    ) -> Engine<u64, Cursor<Vec<u8>>, Vec<u8>> {
        let io = IoBridge::new(Cursor::new(Vec::new()), Vec::new());
        Engine::new(memory, io, EngineConfig::default())
    }

    #[test]
    fn immediate_halt_counts_zero_cycles() {
        // code[0] = 0x200 (outside [0, 128)), code[1] = 0 -> halts on cycle 1.
        let mut memory = Memory::<u64>::new(true);
        memory.write_word(0, 0x200);
        memory.write_word(1, 0);
        let mut engine = engine_with(memory);

        let kept_running = engine.step().unwrap();
        assert!(!kept_running);
        assert_eq!(engine.stats().op_count(), 0);
        assert_eq!(engine.ip(), 0);
    }

    #[test]
    fn unaligned_ip_is_fatal() {
        let memory = Memory::<u64>::new(true);
        let mut engine = engine_with(memory);
        engine.ip = 5;
        assert!(matches!(
            engine.step(),
            Err(EngineError::Unaligned { ip: 5 })
        ));
    }

    #[test]
    fn self_flip_rejected_when_disallowed() {
        let mut memory = Memory::<u64>::new(true);
        memory.write_word(0, 3); // F = ip+3, within [0, 128)
        memory.write_word(1, 0);
        let io = IoBridge::new(Cursor::new(Vec::<u8>::new()), Vec::new());
        let config = EngineConfig {
            allow_self_modify: false,
            ..EngineConfig::default()
        };
        let mut engine = Engine::new(memory, io, config);

        assert!(matches!(
            engine.step(),
            Err(EngineError::SelfFlip { ip: 0, flip: 3 })
        ));
    }

    #[test]
    fn null_jump_is_rejected() {
        let mut memory = Memory::<u64>::new(true);
        memory.write_word(0, 0x1000); // harmless flip target, outside instruction
        memory.write_word(1, 1); // jump target 1 < 2w(=128)
        let mut engine = engine_with(memory);

        assert!(matches!(
            engine.step(),
            Err(EngineError::NullJump { target: 1 })
        ));
    }

    #[test]
    fn non_halting_cycle_advances_ip_and_counts() {
        let mut memory = Memory::<u64>::new(true);
        memory.write_word(0, 0x1000); // harmless flip, outside instruction and reserved range
        memory.write_word(1, 256); // jump to word-aligned address 256 (>= 2w)
        let mut engine = engine_with(memory);

        let kept_running = engine.step().unwrap();
        assert!(kept_running);
        assert_eq!(engine.ip(), 256);
        assert_eq!(engine.stats().op_count(), 1);
    }
}
