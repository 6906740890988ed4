//! Merkle radix trie for Arbor.
//!
//! A prefix-compressed key/value trie whose nodes are content-addressed
//! [`Stem`]s, so any subset of a trie can be fetched, verified, disclosed,
//! or encrypted with the machinery in `arbor-node`.
//!
//! # Key Types
//!
//! - [`RadixNode`] / [`Stem`]: one trie node and its content reference
//! - [`Trie`]: get / set / delete / transition proofs over a `Stem`
//! - [`Transition`]: creation, mutation, or deletion proofs
//! - [`MerkleArray`] / [`MerkleDictionary`]: index- and key-addressed adapters

pub mod array;
pub mod dictionary;
pub mod encoding;
pub mod error;
pub mod proof;
pub mod radix;

pub use array::MerkleArray;
pub use dictionary::MerkleDictionary;
pub use encoding::KeyEncoding;
pub use error::{TrieError, TrieResult};
pub use proof::Transition;
pub use radix::{RadixNode, RadixValue, Stem, Trie, VALUE_SEGMENT};
