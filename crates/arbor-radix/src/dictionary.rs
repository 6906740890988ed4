//! String-keyed dictionaries over the radix trie.

use arbor_node::Selector;

use crate::error::{TrieError, TrieResult};
use crate::radix::{RadixValue, Stem, Trie};

#[derive(Clone, Debug, PartialEq)]
pub struct MerkleDictionary<V> {
    root: Stem<V>,
}

impl<V: RadixValue> MerkleDictionary<V> {
    pub fn new() -> TrieResult<Self> {
        Ok(Self { root: Stem::empty()? })
    }

    pub fn from_entries<I, K>(entries: I) -> TrieResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
    {
        Ok(Self {
            root: Stem::from_entries(entries)?,
        })
    }

    pub fn from_root(root: Stem<V>) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Stem<V> {
        &self.root
    }

    pub fn into_root(self) -> Stem<V> {
        self.root
    }

    pub fn get(&self, key: &str) -> TrieResult<Option<&V>> {
        self.root.get(key)
    }

    pub fn contains_key(&self, key: &str) -> TrieResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    pub fn insert(&self, key: &str, value: V) -> TrieResult<Self> {
        Ok(Self {
            root: self.root.set(key, value)?,
        })
    }

    pub fn remove(&self, key: &str) -> TrieResult<Self> {
        Ok(Self {
            root: self.root.delete(key)?,
        })
    }

    /// Materialized keys in order.
    pub fn keys(&self) -> Vec<String> {
        self.root.keys()
    }

    pub fn len(&self) -> TrieResult<usize> {
        self.root.len()
    }

    pub fn is_empty(&self) -> TrieResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Targets for exact keys.
    pub fn key_selector<K: AsRef<str>>(keys: &[K]) -> Selector {
        Selector::from_paths(keys.iter().map(|key| vec![key.as_ref().to_string()]))
    }

    /// Masks for every key starting with one of `prefixes`.
    pub fn prefix_selector<K: AsRef<str>>(prefixes: &[K]) -> Selector {
        Self::key_selector(prefixes)
    }

    /// The value under `key`, failing when it is absent.
    pub fn require(&self, key: &str) -> TrieResult<&V> {
        self.get(key)?
            .ok_or_else(|| TrieError::KeyNotFound(key.to_string()))
    }
}
