use thiserror::Error;

/// Failures raised while parsing a binary image.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("bad magic code (found {found:#06x}, expected {expected:#06x})")]
    BadMagic { found: u16, expected: u16 },

    #[error("bad word-width ({0} not in {{8, 16, 32, 64}})")]
    BadWidth(u16),

    #[error("image header ended unexpectedly")]
    TruncatedHeader,

    #[error("segment {index}: data-length {data_len} exceeds segment-length {segment_len}")]
    BadSegment {
        index: usize,
        data_len: u64,
        segment_len: u64,
    },

    #[error(
        "segment {index}: data range [{data_start}, {data_start}+{data_len}) exceeds \
         the {blob_len}-word data blob"
    )]
    DataOutOfBounds {
        index: usize,
        data_start: u64,
        data_len: u64,
        blob_len: u64,
    },

    #[error("image data blob is not a whole number of words")]
    TruncatedTail,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Fatal errors raised by the execution engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("read from an unaligned address (ip={ip:#x})")]
    Unaligned { ip: u64 },

    #[error("instruction at ip={ip:#x} tried to flip itself (flip={flip:#x})")]
    SelfFlip { ip: u64, flip: u64 },

    #[error("jump to reserved address {target:#x} forbidden while no_null_jump is set")]
    NullJump { target: u64 },

    #[error("read from an uninitialized address {addr:#x}")]
    UninitializedRead { addr: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
