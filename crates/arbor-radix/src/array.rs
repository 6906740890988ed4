//! Integer-indexed arrays over the radix trie.

use arbor_node::Selector;
use arbor_types::Path;

use crate::encoding::KeyEncoding;
use crate::error::{TrieError, TrieResult};
use crate::radix::{RadixValue, Stem, Trie};

/// A dense array whose indices are fixed-width encoded trie keys.
#[derive(Clone, Debug, PartialEq)]
pub struct MerkleArray<V> {
    root: Stem<V>,
    encoding: KeyEncoding,
}

impl<V: RadixValue> MerkleArray<V> {
    pub fn new(encoding: KeyEncoding) -> TrieResult<Self> {
        Ok(Self {
            root: Stem::empty()?,
            encoding,
        })
    }

    pub fn from_values<I>(values: I, encoding: KeyEncoding) -> TrieResult<Self>
    where
        I: IntoIterator<Item = V>,
    {
        let entries = values
            .into_iter()
            .enumerate()
            .map(|(index, value)| (encoding.encode(index as u64), value));
        Ok(Self {
            root: Stem::from_entries(entries)?,
            encoding,
        })
    }

    /// Wrap an existing (possibly partial) trie, e.g. a regenerated root.
    pub fn from_root(root: Stem<V>, encoding: KeyEncoding) -> Self {
        Self { root, encoding }
    }

    pub fn root(&self) -> &Stem<V> {
        &self.root
    }

    pub fn into_root(self) -> Stem<V> {
        self.root
    }

    pub fn encoding(&self) -> KeyEncoding {
        self.encoding
    }

    pub fn get(&self, index: u64) -> TrieResult<Option<&V>> {
        self.root.get(&self.encoding.encode(index))
    }

    /// Replace the element at an existing index.
    pub fn set(&self, index: u64, value: V) -> TrieResult<Self> {
        let key = self.encoding.encode(index);
        if self.root.get(&key)?.is_none() {
            return Err(TrieError::KeyNotFound(key));
        }
        Ok(self.with_root(self.root.set(&key, value)?))
    }

    pub fn push(&self, value: V) -> TrieResult<Self> {
        let key = self.encoding.encode(self.len()?);
        Ok(self.with_root(self.root.set(&key, value)?))
    }

    /// Requires every trie node to be materialized.
    pub fn len(&self) -> TrieResult<u64> {
        Ok(self.root.len()? as u64)
    }

    pub fn is_empty(&self) -> TrieResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Materialized elements in index order.
    pub fn entries(&self) -> TrieResult<Vec<(u64, &V)>> {
        self.root
            .entries()
            .into_iter()
            .map(|(key, value)| Ok((self.encoding.decode(&key)?, value)))
            .collect()
    }

    /// A selector over index paths. Each level of a path is one array; a
    /// deeper index continues into the element, which must itself be an
    /// array using the same encoding.
    pub fn selector(&self, index_paths: &[&[u64]]) -> Selector {
        Selector::from_paths(index_paths.iter().map(|indices| self.key_path(indices)))
    }

    fn key_path(&self, indices: &[u64]) -> Path {
        indices.iter().map(|index| self.encoding.encode(*index)).collect()
    }

    fn with_root(&self, root: Stem<V>) -> Self {
        Self {
            root,
            encoding: self.encoding,
        }
    }
}
