//! The feed buffer: a densely packed, contiguous byte buffer of blocks
//! produced by one author, supporting append, indexed access, truncation,
//! slicing, cloning, and a first-class verification cache.

use std::cell::Cell;
use std::fmt;

use crate::codec::{self, BlockFields, BlockView};
use crate::crypto::{CryptoCapability, Ed25519Capability};
use crate::errors::{FeedError, Result};
use crate::time::{self, Clock};
use crate::types::{Key, Keypair, Signature};

/// Buffer growth quantum. Capacity is always a multiple of this.
pub const MINIMUM_ALLOCATION_UNIT: usize = 1024;

/// Ceiling on how far [`Feed::grow`] will reallocate. The global allocator
/// itself aborts on true OOM; this ceiling is what actually makes
/// [`FeedError::AllocFailed`] reachable from safe code.
pub const GROWTH_CEILING_BYTES: usize = 64 * 1024 * 1024;

fn round_up(value: usize, unit: usize) -> usize {
    (value + unit - 1) / unit * unit
}

/// Stands in for a `CryptoCapability` in code paths that never verify a
/// signature (`get`, `len`, the unverified half of `truncate`/`slice`'s
/// internal walks). Its methods are unreachable by construction.
struct InertCrypto;

impl CryptoCapability for InertCrypto {
    fn random(&self, _buf: &mut [u8]) {
        unreachable!("InertCrypto never generates randomness")
    }
    fn keypair(&self) -> Keypair {
        unreachable!("InertCrypto never derives keys")
    }
    fn sign(&self, _msg: &[u8], _pair: &Keypair) -> Signature {
        unreachable!("InertCrypto never signs")
    }
    fn verify(&self, _sig: &Signature, _msg: &[u8], _pub_key: &Key) -> bool {
        unreachable!("InertCrypto is only passed to decode(verify = false)")
    }
}

const INERT: InertCrypto = InertCrypto;

/// An append-only, contiguous buffer of encoded blocks.
///
/// `verified_to` is a [`Cell`] rather than a plain field: iteration borrows
/// `&Feed`, not `&mut Feed` (so the borrow checker can reject `append`,
/// `truncate`, and slicing into an iterator's source feed while the iterator
/// is alive), but a verifying iteration still needs to advance the
/// high-water mark as it goes. Interior mutability is how a read-only
/// traversal updates a monotonic cache.
pub struct Feed {
    buffer: Vec<u8>,
    tail: usize,
    last_block_offset: usize,
    verified_to: Cell<u64>,
}

impl Feed {
    /// A new, empty feed with one allocation quantum of backing storage.
    pub fn new() -> Self {
        Self {
            buffer: vec![0u8; MINIMUM_ALLOCATION_UNIT],
            tail: 0,
            last_block_offset: 0,
            verified_to: Cell::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Bytes in use; the first `tail` bytes of the buffer decode exactly
    /// into the feed's blocks.
    pub fn tail(&self) -> usize {
        self.tail
    }

    pub fn is_empty(&self) -> bool {
        self.tail == 0
    }

    /// High-water mark of byte offsets whose blocks have been
    /// signature-verified since the last reset.
    pub fn verified_to(&self) -> u64 {
        self.verified_to.get()
    }

    /// The raw encoded bytes of the feed, `buffer[..tail]`.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[..self.tail]
    }

    fn grow(&mut self, min_cap: usize) -> Result<()> {
        if min_cap <= self.buffer.len() {
            return Ok(());
        }
        if min_cap > GROWTH_CEILING_BYTES {
            return Err(FeedError::AllocFailed {
                requested: min_cap,
                ceiling: GROWTH_CEILING_BYTES,
            });
        }
        let new_cap = round_up(min_cap, MINIMUM_ALLOCATION_UNIT);
        let mut new_buffer = vec![0u8; new_cap];
        new_buffer[..self.tail].copy_from_slice(&self.buffer[..self.tail]);
        self.buffer = new_buffer;
        Ok(())
    }

    fn last_block(&self) -> Result<Option<(Signature, u16)>> {
        if self.tail == 0 {
            return Ok(None);
        }
        let (view, _) = codec::decode(&self.buffer[self.last_block_offset..self.tail], false, &INERT)?;
        Ok(Some((view.id, view.seq)))
    }

    /// Appends `body` as a new block authored by `pair`, chained onto the
    /// current last block (or genesis, if the feed is empty). `crypto` signs
    /// the block; `clock` supplies its timestamp. Returns the new `tail`.
    pub fn append(
        &mut self,
        body: &[u8],
        pair: &Keypair,
        crypto: &dyn CryptoCapability,
        clock: &dyn Clock,
    ) -> Result<usize> {
        let (psig, seq) = match self.last_block()? {
            Some((id, seq)) => {
                if seq == u16::MAX {
                    return Err(FeedError::FeedFull);
                }
                (id, seq + 1)
            }
            None => ([0u8; 64], 0u16),
        };

        let fields = BlockFields {
            psig,
            author: pair.public,
            seq,
            compression: 0,
            date: time::now(clock),
            geo0: 0,
            geo1: 0,
            body,
        };
        let size = codec::size_of_encoded(&fields)?;
        self.grow(self.tail + size)?;

        let written = codec::encode(&mut self.buffer[self.tail..], &fields, pair, crypto)?;
        debug_assert_eq!(written, size);
        self.last_block_offset = self.tail;
        self.tail += written;
        Ok(self.tail)
    }

    /// Number of blocks in the feed, via the fast next-offset walk.
    pub fn len(&self) -> Result<usize> {
        let mut offset = 0usize;
        let mut count = 0usize;
        while offset < self.tail {
            offset += codec::next_block_offset(&self.buffer[offset..self.tail])?;
            count += 1;
        }
        Ok(count)
    }

    /// Decodes the block at logical index `idx`, without verifying its
    /// signature - the caller may not have authenticated the feed yet
    /// beyond what [`Feed::verified_to`] already covers.
    pub fn get(&self, idx: usize) -> Result<BlockView<'_>> {
        let mut offset = 0usize;
        for _ in 0..idx {
            if offset >= self.tail {
                return Err(FeedError::DecodeGeneric(format!("index {idx} out of bounds")));
            }
            offset += codec::next_block_offset(&self.buffer[offset..self.tail])?;
        }
        if offset >= self.tail {
            return Err(FeedError::DecodeGeneric(format!("index {idx} out of bounds")));
        }
        let (view, _) = codec::decode(&self.buffer[offset..self.tail], false, &INERT)?;
        Ok(view)
    }

    /// Iterates the feed's blocks in order, verifying each one not already
    /// covered by the verification cache and extending the cache as it goes.
    pub fn iter<'f>(&'f self, crypto: &'f dyn CryptoCapability) -> Iter<'f> {
        Iter { feed: self, crypto, offset: 0, idx: 0, done: false }
    }

    /// Drops every block from logical index `height` onward. `truncate(0)`
    /// empties the feed. Always clears the verification cache, even when
    /// `height` is within the previously-verified prefix - see `DESIGN.md`
    /// for why this spec picks the simpler of two sound strategies.
    pub fn truncate(&mut self, height: usize) -> Result<()> {
        if height == 0 {
            self.tail = 0;
            self.last_block_offset = 0;
            self.verified_to.set(0);
            return Ok(());
        }
        let mut offset = 0usize;
        let mut last_start = 0usize;
        for _ in 0..height {
            last_start = offset;
            offset += codec::next_block_offset(&self.buffer[offset..self.tail])?;
        }
        self.tail = offset;
        self.last_block_offset = last_start;
        self.verified_to.set(0);
        Ok(())
    }

    /// Copies blocks `[start, end)` of `src` (negative indices resolve
    /// relative to `src.len()`) into `dst`, which is truncated to empty
    /// first. Returns the number of blocks copied.
    pub fn slice(dst: &mut Feed, src: &Feed, start: i64, end: i64) -> Result<u32> {
        let total = src.len()? as i64;
        let resolve = |i: i64| if i < 0 { total + i } else { i };
        let start_idx = resolve(start);
        let end_idx = resolve(end);
        if start_idx < 0 || end_idx < start_idx || end_idx > total {
            return Err(FeedError::DecodeGeneric(format!(
                "slice range [{start}, {end}) out of bounds for feed of length {total}"
            )));
        }

        let mut offset = 0usize;
        let mut idx = 0i64;
        while idx < start_idx {
            offset += codec::next_block_offset(&src.buffer[offset..src.tail])?;
            idx += 1;
        }
        let start_offset = offset;
        while idx < end_idx {
            offset += codec::next_block_offset(&src.buffer[offset..src.tail])?;
            idx += 1;
        }
        let end_offset = offset;

        let region_len = end_offset - start_offset;
        dst.tail = 0;
        dst.last_block_offset = 0;
        dst.verified_to.set(0);
        dst.grow(region_len)?;
        dst.buffer[..region_len].copy_from_slice(&src.buffer[start_offset..end_offset]);
        dst.tail = region_len;

        if dst.tail > 0 {
            let mut o = 0usize;
            let mut last = 0usize;
            while o < dst.tail {
                last = o;
                o += codec::next_block_offset(&dst.buffer[o..dst.tail])?;
            }
            dst.last_block_offset = last;
        }

        Ok((end_idx - start_idx) as u32)
    }
}

impl Default for Feed {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Feed {
    fn clone(&self) -> Self {
        Self {
            buffer: self.buffer[..self.tail].to_vec(),
            tail: self.tail,
            last_block_offset: self.last_block_offset,
            verified_to: Cell::new(self.verified_to.get()),
        }
    }
}

impl PartialEq for Feed {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}
impl Eq for Feed {}

impl fmt::Debug for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Feed")
            .field("tail", &self.tail)
            .field("capacity", &self.buffer.len())
            .field("verified_to", &self.verified_to.get())
            .finish()
    }
}

/// Iterator over a feed's blocks, advancing the feed's verification cache as
/// it verifies each not-yet-covered block.
pub struct Iter<'f> {
    feed: &'f Feed,
    crypto: &'f dyn CryptoCapability,
    offset: usize,
    idx: usize,
    done: bool,
}

impl<'f> Iterator for Iter<'f> {
    type Item = Result<BlockView<'f>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.offset >= self.feed.tail {
            return None;
        }
        let skip_verify = (self.offset as u64) < self.feed.verified_to.get();
        match codec::decode(&self.feed.buffer[self.offset..self.feed.tail], !skip_verify, self.crypto) {
            Ok((view, size)) => {
                let new_offset = self.offset + size;
                if !skip_verify {
                    self.feed.verified_to.set(self.feed.verified_to.get().max(new_offset as u64));
                }
                self.offset = new_offset;
                self.idx += 1;
                Some(Ok(view))
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// Default-capability convenience constructor, matching the teacher crate's
/// habit of pairing a bare struct with a `*_with_defaults` helper for the
/// common case (Ed25519 signing, system clock).
pub fn default_crypto() -> Ed25519Capability {
    Ed25519Capability
}
