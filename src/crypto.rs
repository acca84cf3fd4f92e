//! Ed25519 primitives consumed as a capability, not baked into the block
//! codec. The core never calls `ed25519_dalek` directly outside this module -
//! every signing/verification call goes through [`CryptoCapability`], so a
//! consumer can swap in a hardware-backed signer without touching the codec.

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::types::{Key, Keypair, Signature};

/// Random/keypair/sign/verify, abstracted over Ed25519-compatible 32-byte
/// keys and 64-byte signatures.
pub trait CryptoCapability {
    /// Fills `buf` with cryptographically-random bytes.
    fn random(&self, buf: &mut [u8]);

    /// Derives a fresh keypair from a random 32-byte seed.
    fn keypair(&self) -> Keypair;

    /// Signs `msg` with `pair`, returning the 64-byte signature.
    fn sign(&self, msg: &[u8], pair: &Keypair) -> Signature;

    /// Verifies `sig` over `msg` under `pub_key`. `true` on success.
    fn verify(&self, sig: &Signature, msg: &[u8], pub_key: &Key) -> bool;
}

/// Default `CryptoCapability` backed by `ed25519-dalek` and `rand`'s OS RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ed25519Capability;

impl CryptoCapability for Ed25519Capability {
    fn random(&self, buf: &mut [u8]) {
        OsRng.fill_bytes(buf);
    }

    fn keypair(&self) -> Keypair {
        let mut seed = [0u8; 32];
        self.random(&mut seed);
        let signing_key = SigningKey::from_bytes(&seed);
        let public = signing_key.verifying_key().to_bytes();
        Keypair::from_parts(seed, public)
    }

    fn sign(&self, msg: &[u8], pair: &Keypair) -> Signature {
        let signing_key = SigningKey::from_bytes(&pair.seed);
        signing_key.sign(msg).to_bytes()
    }

    fn verify(&self, sig: &Signature, msg: &[u8], pub_key: &Key) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(pub_key) else {
            return false;
        };
        let signature = ed25519_dalek::Signature::from_bytes(sig);
        verifying_key.verify(msg, &signature).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keypair_public_matches_derivation_from_seed() {
        let crypto = Ed25519Capability;
        let pair = crypto.keypair();
        let signing_key = SigningKey::from_bytes(&pair.seed);
        assert_eq!(signing_key.verifying_key().to_bytes(), pair.public);
    }

    #[test]
    fn sign_then_verify_succeeds() {
        let crypto = Ed25519Capability;
        let pair = crypto.keypair();
        let msg = b"the message body";
        let sig = crypto.sign(msg, &pair);
        assert!(crypto.verify(&sig, msg, &pair.public));
    }

    #[test]
    fn flipping_a_message_bit_breaks_verification() {
        let crypto = Ed25519Capability;
        let pair = crypto.keypair();
        let mut msg = b"the message body".to_vec();
        let sig = crypto.sign(&msg, &pair);
        msg[0] ^= 1;
        assert!(!crypto.verify(&sig, &msg, &pair.public));
    }

    #[test]
    fn verify_rejects_wrong_public_key() {
        let crypto = Ed25519Capability;
        let pair_a = crypto.keypair();
        let pair_b = crypto.keypair();
        let msg = b"message";
        let sig = crypto.sign(msg, &pair_a);
        assert!(!crypto.verify(&sig, msg, &pair_b.public));
    }

    #[test]
    fn random_fills_the_whole_buffer_with_nonzero_bytes_eventually() {
        let crypto = Ed25519Capability;
        let mut buf = [0u8; 32];
        crypto.random(&mut buf);
        assert!(buf.iter().any(|&b| b != 0));
    }
}
