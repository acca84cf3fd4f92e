//! chainfeed - Append-Only, Ed25519-Signed Block Feeds
//!
//! This crate provides a deterministic, byte-exact implementation of a
//! peer-to-peer block feed: a contiguous, append-only sequence of
//! Ed25519-signed blocks, each chained to its predecessor by signature, with
//! indexed access, truncation, slicing, and three-way diffing against
//! another feed.
//!
//! # Architecture
//!
//! - **types**: Canonical key/signature/keypair types
//! - **crypto**: `CryptoCapability` - the Ed25519 boundary (random, keypair, sign, verify)
//! - **time**: `Clock` capability and the 40-bit truncated timestamp codec
//! - **varint**: Unsigned 7-bit-continuation integer encoding
//! - **codec**: The block wire format - encode, decode, size-of, fast skip
//! - **feed**: The append-only buffer - append, iterate, index, truncate, slice, clone
//! - **diff**: Three-way structural comparison between two feeds
//! - **errors**: Typed error handling (no panics in decode/verify/append)
//!
//! # Quality Gates
//!
//! - Determinism: identical input bytes always decode to identical fields
//! - Verifiability: every block's signature is checked against its exact byte range
//! - No silent corruption: unknown or duplicate headers are rejected, not ignored
//! - No panics: every decode/verify/append path reachable with attacker-controlled
//!   bytes returns a typed `FeedError` instead
//!
//! # Usage
//!
//! ```rust
//! use chainfeed::crypto::{CryptoCapability, Ed25519Capability};
//! use chainfeed::diff::diff;
//! use chainfeed::feed::Feed;
//! use chainfeed::time::SystemClock;
//!
//! let crypto = Ed25519Capability;
//! let clock = SystemClock;
//! let pair = crypto.keypair();
//!
//! let mut feed = Feed::new();
//! feed.append(b"hello, feed", &pair, &crypto, &clock)?;
//! feed.append(b"second block", &pair, &crypto, &clock)?;
//!
//! for block in feed.iter(&crypto) {
//!     let block = block?;
//!     println!("seq {} body {:?}", block.seq, block.body);
//! }
//!
//! let mut cloned = feed.clone();
//! assert_eq!(diff(&feed, &cloned)?, chainfeed::errors::DiffOutcome::Equal);
//!
//! cloned.truncate(1)?;
//! assert_eq!(diff(&feed, &cloned)?.delta(), Some(-1));
//! # Ok::<(), chainfeed::errors::FeedError>(())
//! ```

pub mod codec;
pub mod crypto;
pub mod diff;
pub mod errors;
pub mod feed;
pub mod time;
pub mod types;
pub mod varint;

pub use codec::{BlockFields, BlockView};
pub use diff::diff as diff_feeds;
pub use errors::{DiffOutcome, FeedError, Result};
pub use feed::Feed;
pub use types::{Key, Keypair, Signature, KEY_SIZE, SIGNATURE_SIZE};

/// Library version (matches Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{CryptoCapability, Ed25519Capability};
    use crate::time::SystemClock;

    #[test]
    fn version_matches_cargo_toml() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
        assert_eq!(NAME, "chainfeed");
    }

    #[test]
    fn public_api_builds_and_diffs_a_feed() {
        let crypto = Ed25519Capability;
        let clock = SystemClock;
        let pair = crypto.keypair();

        let mut feed = Feed::new();
        feed.append(b"one", &pair, &crypto, &clock).unwrap();
        feed.append(b"two", &pair, &crypto, &clock).unwrap();

        let cloned = feed.clone();
        assert_eq!(diff_feeds(&feed, &cloned).unwrap(), DiffOutcome::Equal);
    }
}
