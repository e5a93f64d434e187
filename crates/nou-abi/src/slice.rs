//! Packed slice codec and bounds-checked guest-memory access.
//!
//! `encode`/`decode` are pure bit arithmetic and never look at memory. The
//! accessors take the guest's memory as a byte slice and check
//! `pointer + length` against its current size before touching it.

use std::borrow::Cow;
use std::fmt;
use std::ops::Range;

use crate::error::{SliceError, SliceResult};

const LOW_32: u64 = 0xFFFF_FFFF;

/// A `(length, pointer)` descriptor of a byte range in guest memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Slice {
    pub length: u32,
    pub pointer: u32,
}

impl Slice {
    /// Create a new slice descriptor.
    pub fn new(length: u32, pointer: u32) -> Self {
        Self { length, pointer }
    }

    /// Pack into the 64-bit wire form.
    pub fn encode(self) -> u64 {
        encode(self.length, self.pointer)
    }

    /// Pack into the signed form a wasm `i64` parameter carries.
    pub fn to_wasm(self) -> i64 {
        self.encode() as i64
    }

    /// Unpack a raw wasm `i64` argument.
    pub fn from_wasm(raw: i64) -> Self {
        decode(raw as u64)
    }

    /// Byte range of this slice, if it fits in a memory of `memory_size` bytes.
    pub fn range(self, memory_size: usize) -> SliceResult<Range<usize>> {
        let start = self.pointer as usize;
        let end = start.checked_add(self.length as usize);
        match end {
            Some(end) if end <= memory_size => Ok(start..end),
            _ => Err(SliceError::OutOfBounds {
                pointer: self.pointer,
                length: self.length,
                memory_size,
            }),
        }
    }
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[..{}]", self.pointer, self.length)
    }
}

/// Pack `(length, pointer)` as `(length << 32) | pointer`.
pub fn encode(length: u32, pointer: u32) -> u64 {
    ((length as u64 & LOW_32) << 32) | (pointer as u64 & LOW_32)
}

/// Inverse of [`encode`].
pub fn decode(packed: u64) -> Slice {
    Slice {
        length: (packed >> 32) as u32,
        pointer: (packed & LOW_32) as u32,
    }
}

/// View `slice.length` bytes of `memory` starting at `slice.pointer`.
pub fn read_bytes(memory: &[u8], slice: Slice) -> SliceResult<&[u8]> {
    let range = slice.range(memory.len())?;
    Ok(&memory[range])
}

/// Decode the bytes of `slice` as UTF-8, replacing malformed sequences.
pub fn read_utf8(memory: &[u8], slice: Slice) -> SliceResult<Cow<'_, str>> {
    read_bytes(memory, slice).map(String::from_utf8_lossy)
}

/// Copy `bytes` into `memory` at `pointer`, returning the written slice.
pub fn write_bytes(memory: &mut [u8], pointer: u32, bytes: &[u8]) -> SliceResult<Slice> {
    let length = u32::try_from(bytes.len()).map_err(|_| SliceError::OutOfBounds {
        pointer,
        length: u32::MAX,
        memory_size: memory.len(),
    })?;
    let slice = Slice::new(length, pointer);
    let range = slice.range(memory.len())?;
    memory[range].copy_from_slice(bytes);
    Ok(slice)
}

/// Longest prefix of `text` that fits in `max` bytes without splitting a char.
pub fn truncate_utf8(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        assert_eq!(encode(0, 0), 0);
        assert_eq!(encode(1, 0), 1 << 32);
        assert_eq!(encode(0, 1), 1);
        assert_eq!(encode(5, 1024), (5u64 << 32) | 1024);
        assert_eq!(encode(u32::MAX, u32::MAX), u64::MAX);
    }

    #[test]
    fn test_decode_layout() {
        let s = decode(0x0000_000C_0000_0100);
        assert_eq!(s.length, 12);
        assert_eq!(s.pointer, 256);

        let s = decode(u64::MAX);
        assert_eq!(s, Slice::new(u32::MAX, u32::MAX));
    }

    #[test]
    fn test_round_trip_for_strings() {
        for text in ["", "a", "hello, world", "żółw", "🦀🦀"] {
            for pointer in [0u32, 1, 4096, 65_535, u32::MAX] {
                let len = text.len() as u32;
                assert_eq!(decode(encode(len, pointer)), Slice::new(len, pointer));
            }
        }
    }

    #[test]
    fn test_wasm_i64_sign_is_preserved() {
        let s = Slice::new(0x8000_0000, 7);
        let raw = s.to_wasm();
        assert!(raw < 0);
        assert_eq!(Slice::from_wasm(raw), s);
    }

    #[test]
    fn test_read_bytes_in_bounds() {
        let memory: Vec<u8> = (0..64).collect();
        let bytes = read_bytes(&memory, Slice::new(4, 10)).unwrap();
        assert_eq!(bytes, &[10, 11, 12, 13]);

        // Touching the last byte is fine.
        let bytes = read_bytes(&memory, Slice::new(1, 63)).unwrap();
        assert_eq!(bytes, &[63]);

        // Zero-length at the very end is fine.
        assert!(read_bytes(&memory, Slice::new(0, 64)).unwrap().is_empty());
    }

    #[test]
    fn test_read_bytes_exact_length_for_all_fitting_pairs() {
        let memory = vec![0xAB; 16];
        for pointer in 0..=16u32 {
            for length in 0..=(16 - pointer) {
                let bytes = read_bytes(&memory, Slice::new(length, pointer)).unwrap();
                assert_eq!(bytes.len(), length as usize);
            }
        }
    }

    #[test]
    fn test_read_bytes_out_of_bounds() {
        let memory = vec![0u8; 16];
        let err = read_bytes(&memory, Slice::new(8, 9)).unwrap_err();
        assert_eq!(
            err,
            SliceError::OutOfBounds {
                pointer: 9,
                length: 8,
                memory_size: 16
            }
        );
        assert!(read_bytes(&memory, Slice::new(0, 17)).is_err());
        assert!(read_bytes(&memory, Slice::new(u32::MAX, u32::MAX)).is_err());
    }

    #[test]
    fn test_read_utf8_valid() {
        let mut memory = vec![0u8; 32];
        memory[3..8].copy_from_slice(b"hello");
        assert_eq!(read_utf8(&memory, Slice::new(5, 3)).unwrap(), "hello");
    }

    #[test]
    fn test_read_utf8_replaces_malformed() {
        let memory = [b'o', b'k', 0xFF, b'!'];
        let text = read_utf8(&memory, Slice::new(4, 0)).unwrap();
        assert_eq!(text, "ok\u{FFFD}!");
    }

    #[test]
    fn test_write_bytes() {
        let mut memory = vec![0u8; 8];
        let written = write_bytes(&mut memory, 2, b"abc").unwrap();
        assert_eq!(written, Slice::new(3, 2));
        assert_eq!(&memory, &[0, 0, b'a', b'b', b'c', 0, 0, 0]);
    }

    #[test]
    fn test_write_bytes_out_of_bounds_leaves_memory_untouched() {
        let mut memory = vec![0u8; 4];
        assert!(write_bytes(&mut memory, 2, b"abc").is_err());
        assert_eq!(memory, vec![0u8; 4]);
    }

    #[test]
    fn test_truncate_utf8() {
        assert_eq!(truncate_utf8("hello", 10), "hello");
        assert_eq!(truncate_utf8("hello", 3), "hel");
        assert_eq!(truncate_utf8("hello", 0), "");
        // Two-byte chars are never split.
        assert_eq!(truncate_utf8("żółw", 3), "ż");
        assert_eq!(truncate_utf8("żółw", 4), "żó");
    }

    #[test]
    fn test_slice_display() {
        assert_eq!(format!("{}", Slice::new(5, 128)), "128[..5]");
    }
}
