//! LEB128-style unsigned varint encoding used for block body lengths.
//!
//! Least-significant 7-bit group first; the high bit of every byte but the
//! last marks continuation.

use crate::errors::{FeedError, Result};

/// Maximum byte width of a varint we will ever decode (covers `u64`).
const MAX_VARINT_BYTES: usize = 10;

/// Number of bytes `encode` would write for `value`, without writing them.
pub fn size_of(value: u64) -> usize {
    let mut n = value;
    let mut len = 1;
    while n >= 0x80 {
        n >>= 7;
        len += 1;
    }
    len
}

/// Encodes `value` into `dst`, returning the number of bytes written.
///
/// `dst` must have room for at least `size_of(value)` bytes.
pub fn encode(value: u64, dst: &mut [u8]) -> usize {
    let mut n = value;
    let mut i = 0;
    while n >= 0x80 {
        dst[i] = ((n & 0x7f) as u8) | 0x80;
        n >>= 7;
        i += 1;
    }
    dst[i] = n as u8;
    i + 1
}

/// Decodes a varint from the start of `src`, returning `(value, bytes_read)`.
///
/// Fails with `DecodeGeneric` if `src` is exhausted before a terminating byte
/// is found, or if the accumulated value would overflow `u64`.
pub fn decode(src: &[u8]) -> Result<(u64, usize)> {
    let mut value: u64 = 0;
    let mut shift = 0u32;
    for (i, &b) in src.iter().enumerate() {
        if i >= MAX_VARINT_BYTES {
            return Err(FeedError::DecodeGeneric("varint overflow".into()));
        }
        value |= ((b & 0x7f) as u64) << shift;
        if b & 0x80 == 0 {
            return Ok((value, i + 1));
        }
        shift += 7;
    }
    Err(FeedError::DecodeGeneric(
        "varint truncated: no terminating byte".into(),
    ))
}
