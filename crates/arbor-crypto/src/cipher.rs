//! Symmetric sealing for per-path encryption.
//!
//! A [`SymmetricKey`] seals one node payload at a time with
//! ChaCha20-Poly1305. The nonce is not random: it is derived from the
//! structural IV of the node being sealed (a caller-chosen common IV extended
//! by the node's path), so sealing the same tree twice yields the same
//! ciphertext and therefore the same digests.

use std::fmt;

use arbor_types::Digest;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Size of a ChaCha20-Poly1305 key in bytes (256 bits).
pub const KEY_SIZE: usize = 32;
/// Size of a ChaCha20-Poly1305 nonce in bytes.
pub const NONCE_SIZE: usize = 12;

const NONCE_CONTEXT: &str = "arbor path nonce v1";
const FINGERPRINT_CONTEXT: &str = "arbor key fingerprint v1";

/// Errors from sealing and opening payloads.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("encryption failed")]
    Seal,

    #[error("decryption failed: wrong key, wrong path, or tampered ciphertext")]
    Open,

    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },
}

/// Derive the nonce for a structural IV.
pub fn derive_nonce(iv: &[u8]) -> [u8; NONCE_SIZE] {
    let derived = blake3::derive_key(NONCE_CONTEXT, iv);
    let mut nonce = [0u8; NONCE_SIZE];
    nonce.copy_from_slice(&derived[..NONCE_SIZE]);
    nonce
}

/// A 256-bit symmetric key assigned to a subtree.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymmetricKey([u8; KEY_SIZE]);

impl SymmetricKey {
    /// Generate a fresh random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub const fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, CipherError> {
        let arr: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| CipherError::InvalidKeyLength {
            expected: KEY_SIZE,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Public identifier of this key, safe to log or publish.
    pub fn fingerprint(&self) -> Digest {
        Digest::from_hash(blake3::derive_key(FINGERPRINT_CONTEXT, &self.0))
    }

    /// Seal `plaintext` under this key with the nonce derived from `iv`.
    ///
    /// Output is `ciphertext || tag (16 bytes)`.
    pub fn seal(&self, iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        let nonce = derive_nonce(iv);
        self.cipher()
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| CipherError::Seal)
    }

    /// Open a payload produced by [`seal`](Self::seal) with the same `iv`.
    pub fn open(&self, iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
        let nonce = derive_nonce(iv);
        self.cipher()
            .decrypt(Nonce::from_slice(&nonce), ciphertext)
            .map_err(|_| CipherError::Open)
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(&self.0))
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymmetricKey({})", self.fingerprint().short_hex())
    }
}
