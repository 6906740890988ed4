//! Error types for node operations.
//!
//! Every variant means "the operation did not apply": node operations never
//! mutate the value they were called on, so the caller's previous snapshot
//! stays valid whatever is returned here.

use arbor_crypto::CipherError;
use arbor_types::{display_path, Digest, Path};

/// Errors from capture, disclosure, encryption, and merge operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NodeError {
    /// Bytes hash to something other than the digest they were offered for,
    /// or the asserted digest differs from the node's own.
    #[error("digest mismatch: expected {expected:?}, got {actual:?}")]
    DigestMismatch { expected: Digest, actual: Digest },

    /// Bytes do not decode canonically into the expected artifact shape.
    #[error("malformed artifact for {digest:?}: {reason}")]
    MalformedArtifact { digest: Digest, reason: String },

    /// A path names a child that does not exist in the current tree.
    #[error("path not found: {}", display_path(.0))]
    PathNotFound(Path),

    /// Insertion of a body at a node that already holds one.
    #[error("node {0:?} is already materialized")]
    AlreadyMaterialized(Digest),

    /// Insertion at a node that carries no outstanding obligation.
    #[error("node {0:?} is already complete")]
    AlreadyComplete(Digest),

    /// The inserted content would list its own digest as missing.
    #[error("self-referential insertion of {0:?}")]
    SelfReferentialInsertion(Digest),

    /// The operation needs an artifact that is only digest-referenced.
    #[error("node {0:?} is not materialized")]
    NotMaterialized(Digest),

    /// Encryption reached a node with no explicit key and no cover key.
    #[error("no key or cover key for {}", display_path(.0))]
    MissingKey(Path),

    #[error("cipher error at {}: {source}", display_path(.path))]
    Cipher {
        path: Path,
        #[source]
        source: CipherError,
    },

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result alias for node operations.
pub type NodeResult<T> = Result<T, NodeError>;
