use arbor_types::Digest;

use crate::error::StoreResult;

/// Content-addressed piece store.
///
/// Pieces are the canonical encodings of tree nodes, keyed by the node
/// digest of their bytes. Implementations must satisfy:
/// - Pieces are immutable once written; writing the same bytes twice is a
///   no-op.
/// - The store never interprets piece contents. Readers verify what they
///   read by capturing it into a tree, not by trusting the store.
/// - All I/O errors are propagated, never silently ignored.
pub trait PieceStore: Send + Sync {
    /// Read a piece by digest. `Ok(None)` if it is absent.
    fn read(&self, digest: &Digest) -> StoreResult<Option<Vec<u8>>>;

    /// Write a piece and return its digest.
    fn write(&self, piece: &[u8]) -> StoreResult<Digest>;

    fn exists(&self, digest: &Digest) -> StoreResult<bool>;

    /// Delete a piece. Returns `true` if it existed.
    fn delete(&self, digest: &Digest) -> StoreResult<bool>;

    /// Read several pieces. Backends may override to save round-trips.
    fn read_batch(&self, digests: &[Digest]) -> StoreResult<Vec<Option<Vec<u8>>>> {
        digests.iter().map(|digest| self.read(digest)).collect()
    }

    fn write_batch(&self, pieces: &[Vec<u8>]) -> StoreResult<Vec<Digest>> {
        pieces.iter().map(|piece| self.write(piece)).collect()
    }
}
