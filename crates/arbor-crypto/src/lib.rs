//! Cryptographic primitives for Arbor.
//!
//! Provides domain-separated BLAKE3 hashing of canonical node encodings and
//! ChaCha20-Poly1305 sealing with nonces derived from structural paths.
//!
//! All crypto operations wrap established libraries — no custom cryptography.
//! The rest of the workspace only decides *what* gets hashed or sealed.

pub mod cipher;
pub mod hasher;

pub use cipher::{derive_nonce, CipherError, SymmetricKey, KEY_SIZE, NONCE_SIZE};
pub use hasher::ContentHasher;
