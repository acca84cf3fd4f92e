//! Canonical data types: keys, signatures, and keypairs.
//!
//! Field order is explicit and frozen - the wire format in [`crate::codec`]
//! depends on these exact byte widths.

use std::fmt;

/// An Ed25519 public key.
pub const KEY_SIZE: usize = 32;
/// An Ed25519 signature.
pub const SIGNATURE_SIZE: usize = 64;

/// 32-byte Ed25519 public key.
pub type Key = [u8; KEY_SIZE];

/// 64-byte Ed25519 signature.
pub type Signature = [u8; SIGNATURE_SIZE];

/// An Ed25519 keypair: a 32-byte seed followed by the 32-byte public key,
/// kept together so the public key can be read without recomputation.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Keypair {
    pub seed: [u8; 32],
    pub public: Key,
}

impl Keypair {
    /// Builds a keypair from raw seed and public key bytes, without
    /// re-deriving the public key from the seed. Callers that need that
    /// guarantee should go through [`crate::crypto::CryptoCapability::keypair`].
    pub fn from_parts(seed: [u8; 32], public: Key) -> Self {
        Self { seed, public }
    }

    /// The 64-byte secret region: seed followed by public key, matching the
    /// wire layout the C ancestor kept as a single `secret[64]` union.
    pub fn secret_bytes(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&self.seed);
        out[32..].copy_from_slice(&self.public);
        out
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("seed", &"[redacted]")
            .field("public", &hex::encode(self.public))
            .finish()
    }
}
