use std::collections::HashMap;
use std::sync::RwLock;

use arbor_crypto::ContentHasher;
use arbor_types::Digest;

use crate::error::StoreResult;
use crate::traits::PieceStore;

/// In-memory, HashMap-based piece store for tests and embedding.
pub struct InMemoryPieceStore {
    pieces: RwLock<HashMap<Digest, Vec<u8>>>,
}

impl InMemoryPieceStore {
    pub fn new() -> Self {
        Self {
            pieces: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.pieces.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes across all stored pieces.
    pub fn total_bytes(&self) -> u64 {
        self.pieces
            .read()
            .expect("lock poisoned")
            .values()
            .map(|piece| piece.len() as u64)
            .sum()
    }

    pub fn clear(&self) {
        self.pieces.write().expect("lock poisoned").clear();
    }

    /// Sorted digests of every stored piece.
    pub fn all_digests(&self) -> Vec<Digest> {
        let map = self.pieces.read().expect("lock poisoned");
        let mut digests: Vec<Digest> = map.keys().copied().collect();
        digests.sort();
        digests
    }
}

impl Default for InMemoryPieceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PieceStore for InMemoryPieceStore {
    fn read(&self, digest: &Digest) -> StoreResult<Option<Vec<u8>>> {
        let map = self.pieces.read().expect("lock poisoned");
        Ok(map.get(digest).cloned())
    }

    fn write(&self, piece: &[u8]) -> StoreResult<Digest> {
        let digest = ContentHasher::NODE.hash(piece);
        let mut map = self.pieces.write().expect("lock poisoned");
        map.entry(digest).or_insert_with(|| piece.to_vec());
        Ok(digest)
    }

    fn exists(&self, digest: &Digest) -> StoreResult<bool> {
        let map = self.pieces.read().expect("lock poisoned");
        Ok(map.contains_key(digest))
    }

    fn delete(&self, digest: &Digest) -> StoreResult<bool> {
        let mut map = self.pieces.write().expect("lock poisoned");
        Ok(map.remove(digest).is_some())
    }
}

impl std::fmt::Debug for InMemoryPieceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryPieceStore")
            .field("piece_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_and_read() {
        let store = InMemoryPieceStore::new();
        let digest = store.write(b"piece").unwrap();
        assert_eq!(digest, ContentHasher::NODE.hash(b"piece"));
        assert_eq!(store.read(&digest).unwrap(), Some(b"piece".to_vec()));
        assert!(store.exists(&digest).unwrap());
    }

    #[test]
    fn write_is_idempotent() {
        let store = InMemoryPieceStore::new();
        let first = store.write(b"same").unwrap();
        let second = store.write(b"same").unwrap();
        assert_eq!(first, second);
        assert_eq!(store.len(), 1);
        assert_eq!(store.total_bytes(), 4);
    }

    #[test]
    fn read_missing_is_none() {
        let store = InMemoryPieceStore::new();
        assert_eq!(store.read(&ContentHasher::NODE.hash(b"nope")).unwrap(), None);
    }

    #[test]
    fn delete_removes_piece() {
        let store = InMemoryPieceStore::new();
        let digest = store.write(b"gone").unwrap();
        assert!(store.delete(&digest).unwrap());
        assert!(!store.delete(&digest).unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn batch_operations() {
        let store = InMemoryPieceStore::new();
        let digests = store.write_batch(&[b"a".to_vec(), b"b".to_vec()]).unwrap();
        let absent = ContentHasher::NODE.hash(b"c");

        let mut query = digests.clone();
        query.push(absent);
        let read = store.read_batch(&query).unwrap();
        assert_eq!(read, vec![Some(b"a".to_vec()), Some(b"b".to_vec()), None]);

        let mut sorted = digests;
        sorted.sort();
        assert_eq!(store.all_digests(), sorted);
        store.clear();
        assert!(store.is_empty());
    }
}
