use std::fmt;
use std::hash::Hash;

/// The machine's word type, fixed per image to `u8`, `u16`, `u32`, or `u64`.
///
/// Addresses and values are both instances of `Self`: a flip-jump machine's
/// address space is exactly as wide as its words, so `ip`, flip targets, and
/// jump targets all share this one type.
pub trait Word:
    Copy + Clone + Eq + Ord + Hash + Default + fmt::Debug + Send + Sync + 'static
{
    /// Word width in bits (8, 16, 32, or 64).
    const BITS: u32;
    /// `log2(BITS)`, used to split a bit-address into word-address and bit-index.
    const LOG_BITS: u32;
    /// Bit index `k` of the machine-visible `IO_IN` bit within word 3.
    const IO_IN_BIT: u32;
    /// Word width in bytes.
    const BYTES: usize;

    const ZERO: Self;
    const ONE: Self;

    fn to_u64(self) -> u64;
    fn from_u64(v: u64) -> Self;
    fn from_le_bytes(bytes: &[u8]) -> Self;

    fn wrapping_add(self, rhs: Self) -> Self;
    fn wrapping_shl(self, rhs: u32) -> Self;
    fn wrapping_shr(self, rhs: u32) -> Self;
    fn bitand(self, rhs: Self) -> Self;
    fn bitxor(self, rhs: Self) -> Self;
}

macro_rules! impl_word {
    ($t:ty, $bits:expr, $log_bits:expr, $io_in_bit:expr) => {
        impl Word for $t {
            const BITS: u32 = $bits;
            const LOG_BITS: u32 = $log_bits;
            const IO_IN_BIT: u32 = $io_in_bit;
            const BYTES: usize = ($bits / 8) as usize;
            const ZERO: Self = 0;
            const ONE: Self = 1;

            #[inline]
            fn to_u64(self) -> u64 {
                self as u64
            }

            #[inline]
            fn from_u64(v: u64) -> Self {
                v as $t
            }

            #[inline]
            fn from_le_bytes(bytes: &[u8]) -> Self {
                let mut buf = [0u8; ($bits / 8) as usize];
                buf.copy_from_slice(&bytes[..($bits / 8) as usize]);
                <$t>::from_le_bytes(buf)
            }

            #[inline]
            fn wrapping_add(self, rhs: Self) -> Self {
                <$t>::wrapping_add(self, rhs)
            }

            #[inline]
            fn wrapping_shl(self, rhs: u32) -> Self {
                <$t>::wrapping_shl(self, rhs)
            }

            #[inline]
            fn wrapping_shr(self, rhs: u32) -> Self {
                <$t>::wrapping_shr(self, rhs)
            }

            #[inline]
            fn bitand(self, rhs: Self) -> Self {
                self & rhs
            }

            #[inline]
            fn bitxor(self, rhs: Self) -> Self {
                self ^ rhs
            }
        }
    };
}

// `IO_IN_BIT` (the reserved IO_IN bit index k) is 4, 5, 6, 7 for w = 8, 16, 32, 64.
impl_word!(u8, 8, 3, 4);
impl_word!(u16, 16, 4, 5);
impl_word!(u32, 32, 5, 6);
impl_word!(u64, 64, 6, 7);
