//! Block wire codec: self-describing header layout, canonical encode order,
//! order-tolerant decode, and signature binding.
//!
//! ```text
//! [ id: 64 bytes ]
//! [ zero-or-more headers, each 0x00 <type:u8> <fixed payload> ]
//! [ body length: varint ]
//! [ body: N bytes ]
//! ```

use crate::crypto::CryptoCapability;
use crate::errors::{FeedError, Result};
use crate::time;
use crate::types::{Key, Keypair, Signature};
use crate::varint;

/// Header type byte values, per the fixed wire table. Unlisted values in
/// 0..=127 are structurally skippable (their payload width is inferable from
/// the high nibble) but are rejected by [`decode`] as [`FeedError::UnknownHeader`].
mod tag {
    pub const POP_VERSION: u8 = 0x00;
    pub const COMPRESSION: u8 = 0x05;
    pub const SEQUENCE: u8 = 0x10;
    pub const MIME: u8 = 0x11;
    pub const APPLICATION: u8 = 0x20;
    pub const DATE: u8 = 0x40;
    pub const GEOCODE0: u8 = 0x41;
    pub const GEOCODE1: u8 = 0x42;
    pub const AUTHOR: u8 = 0x60;
    pub const PARENT: u8 = 0x70;
}

const HEADER_PREFIX: u8 = 0x00;
const ZERO_SIG: Signature = [0u8; 64];
const ZERO_KEY: Key = [0u8; 32];

/// Payload width implied by a header tag's high nibble, independent of
/// whether the tag is one this codec recognizes. Used by [`next_block_offset`]
/// for O(headers) skipping that doesn't need to know the full header table.
fn payload_width(tag: u8) -> Option<usize> {
    match tag {
        0..=15 => Some(1),
        16..=31 => Some(2),
        32..=63 => Some(4),
        64..=95 => Some(8),
        96..=111 => Some(32),
        112..=127 => Some(64),
        _ => None,
    }
}

/// Logical, unsigned block fields supplied to [`encode`]. `id` is computed by
/// the encoder, not supplied.
#[derive(Debug, Clone)]
pub struct BlockFields<'a> {
    /// Predecessor's `id`. All-zero for a genesis block.
    pub psig: Signature,
    /// Public key that will later verify `id`. All-zero omits the header
    /// (decoders will then fail to verify this block).
    pub author: Key,
    pub seq: u16,
    pub compression: u8,
    /// 40-bit truncated timestamp, already masked (see [`crate::time`]).
    pub date: u64,
    pub geo0: u64,
    pub geo1: u64,
    pub body: &'a [u8],
}

impl<'a> BlockFields<'a> {
    /// A genesis block for `body`, authored by `author`, timestamped `date`.
    pub fn genesis(author: Key, date: u64, body: &'a [u8]) -> Self {
        Self {
            psig: ZERO_SIG,
            author,
            seq: 0,
            compression: 0,
            date,
            geo0: 0,
            geo1: 0,
            body,
        }
    }
}

/// A decoded block, borrowing its body from the buffer it was decoded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockView<'a> {
    pub id: Signature,
    pub psig: Signature,
    pub author: Key,
    pub seq: u16,
    pub date: u64,
    pub compression: u8,
    pub geo0: u64,
    pub geo1: u64,
    pub body: &'a [u8],
}

impl<'a> BlockView<'a> {
    pub fn is_genesis(&self) -> bool {
        self.psig == ZERO_SIG
    }
}

/// Number of bytes [`encode`] would write for `fields`, without writing them.
///
/// Fails with [`FeedError::EmptyBody`] when `fields.body` is empty - the wire
/// format requires a non-empty body.
pub fn size_of_encoded(fields: &BlockFields) -> Result<usize> {
    if fields.body.is_empty() {
        return Err(FeedError::EmptyBody);
    }
    let mut size = 64usize;
    if fields.psig != ZERO_SIG {
        size += 2 + 64;
    }
    if fields.author != ZERO_KEY {
        size += 2 + 32;
    }
    if fields.seq != 0 {
        size += 2 + 2;
    }
    if fields.compression != 0 {
        size += 2 + 1;
    }
    if fields.date != 0 {
        size += 2 + 8;
    }
    if fields.geo0 != 0 {
        size += 2 + 8;
    }
    if fields.geo1 != 0 {
        size += 2 + 8;
    }
    size += varint::size_of(fields.body.len() as u64);
    size += fields.body.len();
    Ok(size)
}

/// Encodes `fields` into `dst` at offset 0, signing bytes `[64, total)` with
/// `pair` via `crypto`. Returns the number of bytes written.
///
/// Header emission order is canonical and fixed: parent, author, sequence,
/// compression, date, geocode0, geocode1, body-length, body. Fields that are
/// semantically empty (all-zero parent, zero sequence, etc.) are omitted;
/// `author` is emitted whenever non-zero.
pub fn encode(dst: &mut [u8], fields: &BlockFields, pair: &Keypair, crypto: &dyn CryptoCapability) -> Result<usize> {
    let total = size_of_encoded(fields)?;
    if dst.len() < total {
        return Err(FeedError::DecodeGeneric(format!(
            "destination buffer too small: need {total}, have {}",
            dst.len()
        )));
    }

    // Body is staged in an owned buffer first so this function is correct
    // even when the caller's `fields.body` slice happens to overlap `dst`
    // (the safe-Rust equivalent of the C ancestor's memmove-before-encode).
    let staged_body = fields.body.to_vec();

    let mut offset = 64usize;
    if fields.psig != ZERO_SIG {
        dst[offset] = HEADER_PREFIX;
        dst[offset + 1] = tag::PARENT;
        dst[offset + 2..offset + 66].copy_from_slice(&fields.psig);
        offset += 66;
    }
    if fields.author != ZERO_KEY {
        dst[offset] = HEADER_PREFIX;
        dst[offset + 1] = tag::AUTHOR;
        dst[offset + 2..offset + 34].copy_from_slice(&fields.author);
        offset += 34;
    }
    if fields.seq != 0 {
        dst[offset] = HEADER_PREFIX;
        dst[offset + 1] = tag::SEQUENCE;
        dst[offset + 2..offset + 4].copy_from_slice(&fields.seq.to_le_bytes());
        offset += 4;
    }
    if fields.compression != 0 {
        dst[offset] = HEADER_PREFIX;
        dst[offset + 1] = tag::COMPRESSION;
        dst[offset + 2] = fields.compression;
        offset += 3;
    }
    if fields.date != 0 {
        dst[offset] = HEADER_PREFIX;
        dst[offset + 1] = tag::DATE;
        dst[offset + 2..offset + 10].copy_from_slice(&time::to_wire(fields.date));
        offset += 10;
    }
    if fields.geo0 != 0 {
        dst[offset] = HEADER_PREFIX;
        dst[offset + 1] = tag::GEOCODE0;
        dst[offset + 2..offset + 10].copy_from_slice(&fields.geo0.to_le_bytes());
        offset += 10;
    }
    if fields.geo1 != 0 {
        dst[offset] = HEADER_PREFIX;
        dst[offset + 1] = tag::GEOCODE1;
        dst[offset + 2..offset + 10].copy_from_slice(&fields.geo1.to_le_bytes());
        offset += 10;
    }

    let len_width = varint::encode(staged_body.len() as u64, &mut dst[offset..]);
    offset += len_width;
    dst[offset..offset + staged_body.len()].copy_from_slice(&staged_body);
    offset += staged_body.len();

    debug_assert_eq!(offset, total);

    let signature = crypto.sign(&dst[64..total], pair);
    dst[0..64].copy_from_slice(&signature);

    Ok(total)
}

fn read_exact<'a>(src: &'a [u8], offset: usize, len: usize) -> Result<&'a [u8]> {
    src.get(offset..offset + len)
        .ok_or_else(|| FeedError::DecodeGeneric(format!("buffer truncated at offset {offset}, need {len} bytes")))
}

/// Decodes the block starting at offset 0 of `src`. When `verify` is true,
/// requires an author header and checks the Ed25519 signature over
/// `src[64..total]`; on success or when `verify` is false, returns the
/// decoded view and the total bytes consumed.
pub fn decode<'a>(src: &'a [u8], verify: bool, crypto: &dyn CryptoCapability) -> Result<(BlockView<'a>, usize)> {
    if src.len() < 64 {
        return Err(FeedError::DecodeGeneric("buffer too short for id".into()));
    }
    let id: Signature = src[0..64].try_into().unwrap();

    let mut offset = 64usize;
    let mut seen = [false; 256];
    let mut psig = ZERO_SIG;
    let mut author = ZERO_KEY;
    let mut seq = 0u16;
    let mut compression = 0u8;
    let mut date = 0u64;
    let mut geo0 = 0u64;
    let mut geo1 = 0u64;
    let mut author_seen = false;

    loop {
        match src.get(offset) {
            Some(&b) if b == HEADER_PREFIX => offset += 1,
            _ => break,
        }
        let type_offset = offset;
        let t = *src
            .get(offset)
            .ok_or_else(|| FeedError::DecodeGeneric("buffer truncated reading header type".into()))?;
        offset += 1;

        if t == tag::POP_VERSION {
            return Err(FeedError::DecodeGeneric("POP version header is reserved".into()));
        }
        if seen[t as usize] {
            return Err(FeedError::DuplicateHeader { tag: t, offset: type_offset });
        }
        seen[t as usize] = true;

        match t {
            tag::COMPRESSION => {
                compression = read_exact(src, offset, 1)?[0];
                offset += 1;
            }
            tag::SEQUENCE => {
                let payload = read_exact(src, offset, 2)?;
                seq = u16::from_le_bytes(payload.try_into().unwrap());
                offset += 2;
            }
            tag::MIME => {
                let _ = read_exact(src, offset, 2)?;
                offset += 2;
            }
            tag::APPLICATION => {
                let _ = read_exact(src, offset, 4)?;
                offset += 4;
            }
            tag::DATE => {
                let payload = read_exact(src, offset, 8)?;
                date = time::from_wire(payload.try_into().unwrap());
                offset += 8;
            }
            tag::GEOCODE0 => {
                let payload = read_exact(src, offset, 8)?;
                geo0 = u64::from_le_bytes(payload.try_into().unwrap());
                offset += 8;
            }
            tag::GEOCODE1 => {
                let payload = read_exact(src, offset, 8)?;
                geo1 = u64::from_le_bytes(payload.try_into().unwrap());
                offset += 8;
            }
            tag::AUTHOR => {
                let payload = read_exact(src, offset, 32)?;
                author.copy_from_slice(payload);
                author_seen = true;
                offset += 32;
            }
            tag::PARENT => {
                let payload = read_exact(src, offset, 64)?;
                psig.copy_from_slice(payload);
                offset += 64;
            }
            unknown => return Err(FeedError::UnknownHeader { tag: unknown, offset: type_offset }),
        }
    }

    let (body_len, varint_width) = varint::decode(&src[offset..])?;
    offset += varint_width;
    let body_len = body_len as usize;
    let body = read_exact(src, offset, body_len)?;
    let total = offset + body_len;

    if verify {
        if !author_seen {
            return Err(FeedError::VerifyFailed);
        }
        if !crypto.verify(&id, &src[64..total], &author) {
            return Err(FeedError::VerifyFailed);
        }
    }

    Ok((
        BlockView {
            id,
            psig,
            author,
            seq,
            date,
            compression,
            geo0,
            geo1,
            body,
        },
        total,
    ))
}

/// Skips past the block at the start of `src` without decoding the body or
/// verifying the signature. Used for indexing (`len`, `get`, `truncate`)
/// where O(headers) cost independent of body size matters.
pub fn next_block_offset(src: &[u8]) -> Result<usize> {
    if src.len() < 64 {
        return Err(FeedError::DecodeGeneric("buffer too short for id".into()));
    }
    let mut offset = 64usize;
    loop {
        match src.get(offset) {
            Some(&b) if b == HEADER_PREFIX => offset += 1,
            _ => break,
        }
        let t = *src
            .get(offset)
            .ok_or_else(|| FeedError::DecodeGeneric("buffer truncated reading header type".into()))?;
        offset += 1;
        let width = payload_width(t)
            .ok_or_else(|| FeedError::DecodeGeneric(format!("header tag 0x{t:02x} has no known width class")))?;
        let _ = read_exact(src, offset, width)?;
        offset += width;
    }
    let (body_len, varint_width) = varint::decode(&src[offset..])?;
    offset += varint_width;
    let body_len = body_len as usize;
    if offset + body_len > src.len() {
        return Err(FeedError::DecodeGeneric("body runs past end of buffer".into()));
    }
    Ok(offset + body_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{CryptoCapability, Ed25519Capability};

    fn encode_to_vec(fields: &BlockFields, pair: &Keypair, crypto: &dyn CryptoCapability) -> Vec<u8> {
        let size = size_of_encoded(fields).unwrap();
        let mut buf = vec![0u8; size];
        let written = encode(&mut buf, fields, pair, crypto).unwrap();
        assert_eq!(written, size);
        buf
    }

    #[test]
    fn genesis_round_trip() {
        let crypto = Ed25519Capability;
        let pair = crypto.keypair();
        let body = b"hello";
        let fields = BlockFields::genesis(pair.public, 12345, body);

        let encoded = encode_to_vec(&fields, &pair, &crypto);
        let (view, consumed) = decode(&encoded, true, &crypto).unwrap();

        assert_eq!(consumed, encoded.len());
        assert_eq!(view.body, body);
        assert_eq!(view.author, pair.public);
        assert_eq!(view.seq, 0);
        assert_eq!(view.date, 12345);
        assert!(view.is_genesis());
    }

    #[test]
    fn size_of_matches_encoded_length() {
        let crypto = Ed25519Capability;
        let pair = crypto.keypair();
        let fields = BlockFields {
            psig: [7u8; 64],
            author: pair.public,
            seq: 42,
            compression: 1,
            date: 99,
            geo0: 111,
            geo1: 222,
            body: b"a longer bit of payload data",
        };
        let size = size_of_encoded(&fields).unwrap();
        let mut buf = vec![0u8; size];
        let written = encode(&mut buf, &fields, &pair, &crypto).unwrap();
        assert_eq!(written, size);
    }

    #[test]
    fn empty_body_is_rejected() {
        let fields = BlockFields::genesis([1u8; 32], 0, b"");
        assert_eq!(size_of_encoded(&fields), Err(FeedError::EmptyBody));
    }

    #[test]
    fn flipping_a_signed_byte_fails_verification() {
        let crypto = Ed25519Capability;
        let pair = crypto.keypair();
        let fields = BlockFields::genesis(pair.public, 1, b"payload");
        let mut encoded = encode_to_vec(&fields, &pair, &crypto);

        // Flip a bit well within the signed range [64, total).
        let flip_at = encoded.len() - 1;
        encoded[flip_at] ^= 1;

        let result = decode(&encoded, true, &crypto);
        assert_eq!(result.unwrap_err(), FeedError::VerifyFailed);
    }

    #[test]
    fn missing_author_header_fails_verification() {
        let crypto = Ed25519Capability;
        let pair = crypto.keypair();
        let fields = BlockFields {
            psig: ZERO_SIG,
            author: ZERO_KEY, // omitted -> no author header emitted
            seq: 0,
            compression: 0,
            date: 0,
            geo0: 0,
            geo1: 0,
            body: b"no author here",
        };
        let encoded = encode_to_vec(&fields, &pair, &crypto);
        let result = decode(&encoded, true, &crypto);
        assert_eq!(result.unwrap_err(), FeedError::VerifyFailed);
    }

    #[test]
    fn decode_without_verify_skips_signature_check() {
        let crypto = Ed25519Capability;
        let pair = crypto.keypair();
        let fields = BlockFields::genesis(pair.public, 1, b"payload");
        let mut encoded = encode_to_vec(&fields, &pair, &crypto);
        let flip_at = encoded.len() - 1;
        encoded[flip_at] ^= 1;

        let (view, consumed) = decode(&encoded, false, &crypto).unwrap();
        assert_eq!(consumed, encoded.len());
        assert_ne!(view.body, b"payload"); // the tampered byte was in the body
    }

    #[test]
    fn duplicate_header_is_rejected() {
        let crypto = Ed25519Capability;
        let pair = crypto.keypair();
        let fields = BlockFields::genesis(pair.public, 1, b"x");
        let mut encoded = encode_to_vec(&fields, &pair, &crypto);

        // Duplicate the author header by splicing in another copy right
        // after the first one (shifting seq/date/varint/body along).
        let author_hdr_start = 64; // author is first emitted header (no psig here)
        let author_hdr = encoded[author_hdr_start..author_hdr_start + 34].to_vec();
        encoded.splice(author_hdr_start + 34..author_hdr_start + 34, author_hdr);

        let result = decode(&encoded, false, &crypto);
        assert!(matches!(result, Err(FeedError::DuplicateHeader { tag: t, .. }) if t == tag::AUTHOR));
    }

    #[test]
    fn unknown_header_is_rejected() {
        let crypto = Ed25519Capability;
        let pair = crypto.keypair();
        let fields = BlockFields::genesis(pair.public, 1, b"x");
        let mut encoded = encode_to_vec(&fields, &pair, &crypto);

        // Splice in a bogus header with an unlisted type byte (0x06, 1-byte class).
        encoded.splice(64..64, [0x00u8, 0x06, 0xAA]);

        let result = decode(&encoded, false, &crypto);
        assert!(matches!(result, Err(FeedError::UnknownHeader { tag: 0x06, .. })));
    }

    #[test]
    fn next_block_offset_matches_decode_consumed_bytes() {
        let crypto = Ed25519Capability;
        let pair = crypto.keypair();
        let fields = BlockFields::genesis(pair.public, 1, b"match me");
        let encoded = encode_to_vec(&fields, &pair, &crypto);

        let (_, consumed) = decode(&encoded, true, &crypto).unwrap();
        let fast = next_block_offset(&encoded).unwrap();
        assert_eq!(fast, consumed);
    }

    #[test]
    fn fields_omit_zero_optional_headers() {
        let crypto = Ed25519Capability;
        let pair = crypto.keypair();
        let fields = BlockFields::genesis(pair.public, 0, b"no date, no geo");
        let size = size_of_encoded(&fields).unwrap();
        // id(64) + author header(2+32) + varint + body, no date/geo/parent/seq headers.
        let expected = 64 + 34 + varint::size_of(fields.body.len() as u64) + fields.body.len();
        assert_eq!(size, expected);
    }
}
