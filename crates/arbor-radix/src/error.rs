//! Error types for trie operations.

use arbor_node::NodeError;
use arbor_types::Digest;

/// Errors from trie reads, updates, and proofs.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TrieError {
    /// Delete, mutation proof, or deletion proof of a key the trie lacks.
    #[error("key not found: {0:?}")]
    KeyNotFound(String),

    /// Creation proof of a key the trie already holds.
    #[error("key already present: {0:?}")]
    KeyExists(String),

    /// The walk reached a node that is only digest-referenced.
    #[error("trie node {0:?} is not materialized")]
    MissingData(Digest),

    /// An edge label that does not decode under the trie's key encoding.
    #[error("invalid encoded key {0:?}")]
    InvalidKey(String),

    #[error(transparent)]
    Node(#[from] NodeError),
}

/// Convenience alias for trie results.
pub type TrieResult<T> = Result<T, TrieError>;
