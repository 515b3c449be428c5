use bitflags::bitflags;

/// Instruction alignment `A`, either `w` or `2w`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Word,
    DoubleWord,
}

impl Alignment {
    /// How many words of width `w` make up `A`.
    pub fn word_multiplier(self) -> u32 {
        match self {
            Alignment::Word => 1,
            Alignment::DoubleWord => 2,
        }
    }
}

impl Default for Alignment {
    fn default() -> Self {
        Alignment::DoubleWord
    }
}

/// The seven knobs the original interpreter fixes at compile time via
/// template parameters. `alignment` and `zero_init` come from the image's
/// `file_flags`; the rest are fixed
/// defaults matching the reference dispatch (`NoNullJump = AllowSelfModify
/// = JumpBeforeFlip = CountStats = true`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub alignment: Alignment,
    pub zero_init: bool,
    pub no_null_jump: bool,
    pub allow_self_modify: bool,
    pub jump_before_flip: bool,
    pub count_stats: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            alignment: Alignment::DoubleWord,
            zero_init: false,
            no_null_jump: true,
            allow_self_modify: true,
            jump_before_flip: true,
            count_stats: true,
        }
    }
}

/// Decodes the image header's `file_flags` word: bit 0 is `zero_init`,
/// bits 1-2 are the alignment code, the rest reserved.
#[bitfield_struct::bitfield(u64)]
pub struct FileFlags {
    pub zero_init: bool,
    #[bits(2)]
    pub alignment_code: u8,
    #[bits(61)]
    __reserved: u64,
}

impl FileFlags {
    /// Resolves the alignment code to an [`Alignment`], defaulting reserved
    /// codes (2, 3) to `2w` rather than rejecting the image outright.
    pub fn alignment(&self) -> Alignment {
        match self.alignment_code() {
            0 => Alignment::Word,
            1 => Alignment::DoubleWord,
            code => {
                log::warn!("reserved alignment code {code} in file_flags; defaulting to 2w");
                Alignment::DoubleWord
            }
        }
    }
}

bitflags! {
    /// Runtime flag word accepted via the CLI's `-f`/`--flags` option.
    ///
    /// No bits are currently assigned; unknown bits are accepted and
    /// ignored rather than rejected.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RuntimeFlags: u64 {
        const _ = !0;
    }
}
