use std::io::Read;

use crate::config::{EngineConfig, FileFlags};
use crate::error::LoaderError;
use crate::memory::Memory;
use crate::word::Word;

/// Magic bytes identifying a flip-jump image.
pub const MAGIC: u16 = 0x4A46;

/// Residual segment tails at or below this many words are eagerly
/// zero-filled; longer tails become a deferred zero-segment.
pub const FILL_THRESHOLD: u64 = 1024;

/// One entry of the image's segment table.
#[derive(Debug, Clone, Copy)]
pub struct SegmentRecord {
    pub segment_start: u64,
    pub segment_len: u64,
    pub data_start: u64,
    pub data_len: u64,
}

/// A populated memory plus the engine configuration derived from the image
/// header, for one specific word width.
pub struct LoadedImage<W: Word> {
    pub memory: Memory<W>,
    pub config: EngineConfig,
}

/// A loaded image, tagged with its word width. The width is only known at
/// runtime (it's read from the header), so the loader returns one of these
/// four monomorphized variants instead of a single generic type.
pub enum AnyImage {
    W8(LoadedImage<u8>),
    W16(LoadedImage<u16>),
    W32(LoadedImage<u32>),
    W64(LoadedImage<u64>),
}

/// Parses a binary image and returns a populated memory plus
/// engine configuration for whichever word width the header specifies.
pub fn load_any<R: Read>(mut reader: R) -> Result<AnyImage, LoaderError> {
    let magic = read_u16(&mut reader)?;
    if magic != MAGIC {
        return Err(LoaderError::BadMagic {
            found: magic,
            expected: MAGIC,
        });
    }

    let w = read_u16(&mut reader)?;
    let file_flags = FileFlags(read_u64(&mut reader)?);

    let segment_count = read_u64(&mut reader)?;
    let mut segments = Vec::with_capacity(segment_count as usize);
    for _ in 0..segment_count {
        segments.push(SegmentRecord {
            segment_start: read_u64(&mut reader)?,
            segment_len: read_u64(&mut reader)?,
            data_start: read_u64(&mut reader)?,
            data_len: read_u64(&mut reader)?,
        });
    }

    let mut blob = Vec::new();
    reader.read_to_end(&mut blob)?;

    match w {
        8 => Ok(AnyImage::W8(build::<u8>(file_flags, &segments, &blob)?)),
        16 => Ok(AnyImage::W16(build::<u16>(file_flags, &segments, &blob)?)),
        32 => Ok(AnyImage::W32(build::<u32>(file_flags, &segments, &blob)?)),
        64 => Ok(AnyImage::W64(build::<u64>(file_flags, &segments, &blob)?)),
        other => Err(LoaderError::BadWidth(other)),
    }
}

fn build<W: Word>(
    file_flags: FileFlags,
    segments: &[SegmentRecord],
    blob: &[u8],
) -> Result<LoadedImage<W>, LoaderError> {
    let word_bytes = W::BYTES;
    if blob.len() % word_bytes != 0 {
        return Err(LoaderError::TruncatedTail);
    }
    let blob_word_count = (blob.len() / word_bytes) as u64;

    let zero_init = file_flags.zero_init();
    let mut memory = Memory::<W>::new(zero_init);

    for (index, seg) in segments.iter().enumerate() {
        if seg.data_len > seg.segment_len {
            return Err(LoaderError::BadSegment {
                index,
                data_len: seg.data_len,
                segment_len: seg.segment_len,
            });
        }

        let data_end = seg.data_start.saturating_add(seg.data_len);
        if data_end > blob_word_count {
            return Err(LoaderError::DataOutOfBounds {
                index,
                data_start: seg.data_start,
                data_len: seg.data_len,
                blob_len: blob_word_count,
            });
        }

        for i in 0..seg.data_len {
            let byte_off = ((seg.data_start + i) as usize) * word_bytes;
            let word = W::from_le_bytes(&blob[byte_off..byte_off + word_bytes]);
            memory.write_word(W::from_u64(seg.segment_start + i), word);
        }

        let residual = seg.segment_len - seg.data_len;
        if residual > 0 {
            let start = seg.segment_start + seg.data_len;
            let end = seg.segment_start + seg.segment_len;
            if residual <= FILL_THRESHOLD {
                for wa in start..end {
                    memory.write_word(W::from_u64(wa), W::ZERO);
                }
            } else {
                memory.add_zero_segment(W::from_u64(start), W::from_u64(end));
            }
        }
    }

    let config = EngineConfig {
        alignment: file_flags.alignment(),
        zero_init,
        ..EngineConfig::default()
    };

    Ok(LoadedImage { memory, config })
}

fn read_u16<R: Read>(reader: &mut R) -> Result<u16, LoaderError> {
    let mut buf = [0u8; 2];
    read_header_bytes(reader, &mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_u64<R: Read>(reader: &mut R) -> Result<u64, LoaderError> {
    let mut buf = [0u8; 8];
    read_header_bytes(reader, &mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_header_bytes<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), LoaderError> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(LoaderError::TruncatedHeader),
        Err(e) => Err(LoaderError::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_image(w: u16, file_flags: u64, segments: &[SegmentRecord], blob: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&MAGIC.to_le_bytes());
        bytes.extend_from_slice(&w.to_le_bytes());
        bytes.extend_from_slice(&file_flags.to_le_bytes());
        bytes.extend_from_slice(&(segments.len() as u64).to_le_bytes());
        for seg in segments {
            bytes.extend_from_slice(&seg.segment_start.to_le_bytes());
            bytes.extend_from_slice(&seg.segment_len.to_le_bytes());
            bytes.extend_from_slice(&seg.data_start.to_le_bytes());
            bytes.extend_from_slice(&seg.data_len.to_le_bytes());
        }
        bytes.extend_from_slice(blob);
        bytes
    }

    #[test]
    fn rejects_bad_magic() {
        let bytes = vec![0xAD, 0xDE, 64, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let err = load_any(&bytes[..]).unwrap_err();
        assert!(matches!(err, LoaderError::BadMagic { .. }));
    }

    #[test]
    fn rejects_bad_width() {
        let bytes = encode_image(17, 0, &[], &[]);
        let err = load_any(&bytes[..]).unwrap_err();
        assert!(matches!(err, LoaderError::BadWidth(17)));
    }

    #[test]
    fn rejects_data_len_exceeding_segment_len() {
        let seg = SegmentRecord {
            segment_start: 0,
            segment_len: 1,
            data_start: 0,
            data_len: 2,
        };
        let blob: Vec<u8> = vec![0; 16]; // two u64 words
        let bytes = encode_image(64, 0, &[seg], &blob);
        let err = load_any(&bytes[..]).unwrap_err();
        assert!(matches!(err, LoaderError::BadSegment { .. }));
    }

    #[test]
    fn rejects_truncated_word_tail() {
        let bytes = encode_image(32, 0, &[], &[1, 2, 3]); // 3 bytes, not a multiple of 4
        let err = load_any(&bytes[..]).unwrap_err();
        assert!(matches!(err, LoaderError::TruncatedTail));
    }

    #[test]
    fn loads_segment_data_and_fills_small_residual() {
        let seg = SegmentRecord {
            segment_start: 0,
            segment_len: 3,
            data_start: 0,
            data_len: 1,
        };
        let blob = 0x1122334455667788u64.to_le_bytes().to_vec();
        let bytes = encode_image(64, 0, &[seg], &blob);

        let image = load_any(&bytes[..]).unwrap();
        match image {
            AnyImage::W64(mut img) => {
                assert_eq!(img.memory.read_word(0).unwrap(), 0x1122334455667788);
                assert_eq!(img.memory.read_word(1).unwrap(), 0);
                assert_eq!(img.memory.read_word(2).unwrap(), 0);
            }
            _ => panic!("expected W64 image"),
        }
    }

    #[test]
    fn large_residual_becomes_deferred_zero_segment() {
        let seg = SegmentRecord {
            segment_start: 0,
            segment_len: 1_000_000,
            data_start: 0,
            data_len: 0,
        };
        let bytes = encode_image(64, 0, &[seg], &[]);

        let image = load_any(&bytes[..]).unwrap();
        match image {
            AnyImage::W64(mut img) => {
                assert_eq!(img.memory.read_word(500_000).unwrap(), 0);
                assert!(img.memory.contains_word(500_000));
                assert_eq!(img.memory.zero_segment_count(), 1);
            }
            _ => panic!("expected W64 image"),
        }
    }

    #[test]
    fn loading_same_bytes_twice_agrees_on_every_materialized_key() {
        let seg = SegmentRecord {
            segment_start: 10,
            segment_len: 2,
            data_start: 0,
            data_len: 2,
        };
        let mut blob = Vec::new();
        blob.extend_from_slice(&1u32.to_le_bytes());
        blob.extend_from_slice(&2u32.to_le_bytes());
        let bytes = encode_image(32, 0, &[seg], &blob);

        for _ in 0..2 {
            let image = load_any(&bytes[..]).unwrap();
            match image {
                AnyImage::W32(mut img) => {
                    assert_eq!(img.memory.read_word(10).unwrap(), 1);
                    assert_eq!(img.memory.read_word(11).unwrap(), 2);
                }
                _ => panic!("expected W32 image"),
            }
        }
    }
}
