//! Per-path key assignment.
//!
//! A [`KeyTrie`] assigns symmetric keys to structural paths. A path with no
//! explicit entry is sealed under the nearest keyed ancestor's key, or under
//! the trie's cover key when no ancestor is keyed. The traversal that seals
//! a tree lives on `Cid::encrypt`; this module only decides which key and
//! which IV apply where.

use std::collections::BTreeMap;

use arbor_crypto::SymmetricKey;
use arbor_types::{Path, Segment};

use crate::error::{NodeError, NodeResult};

#[derive(Clone, Debug, Default)]
pub struct KeyTrie {
    key: Option<SymmetricKey>,
    cover: Option<SymmetricKey>,
    children: BTreeMap<Segment, KeyTrie>,
}

impl KeyTrie {
    /// A trie with no cover key: every sealed node needs an explicit
    /// assignment on itself or an ancestor.
    pub fn new() -> Self {
        Self::default()
    }

    /// A trie whose default key covers every path without an assignment.
    pub fn with_cover(cover: SymmetricKey) -> Self {
        Self {
            cover: Some(cover),
            ..Self::default()
        }
    }

    /// Assign `key` to the subtree rooted at `path`.
    pub fn assign(&mut self, path: &[Segment], key: SymmetricKey) {
        match path.split_first() {
            None => self.key = Some(key),
            Some((head, rest)) => self.children.entry(head.clone()).or_default().assign(rest, key),
        }
    }

    /// The key explicitly assigned at this position.
    pub fn key(&self) -> Option<&SymmetricKey> {
        self.key.as_ref()
    }

    /// The key inherited from above.
    pub fn cover(&self) -> Option<&SymmetricKey> {
        self.cover.as_ref()
    }

    /// Whether this position has its own key.
    pub fn is_key_root(&self) -> bool {
        self.key.is_some()
    }

    /// Whether the child reached through `segment` has its own key.
    pub fn has_key_at(&self, segment: &str) -> bool {
        self.children.get(segment).is_some_and(KeyTrie::is_key_root)
    }

    /// The key in effect here: the explicit key, else the cover.
    pub fn effective_key(&self) -> Option<&SymmetricKey> {
        self.key.as_ref().or(self.cover.as_ref())
    }

    /// The key in effect at `path` below this position.
    pub fn key_for(&self, path: &[Segment]) -> Option<&SymmetricKey> {
        let mut current = self;
        let mut best = self.effective_key();
        for segment in path {
            match current.children.get(segment) {
                Some(child) => {
                    current = child;
                    if let Some(key) = child.key.as_ref() {
                        best = Some(key);
                    }
                }
                None => break,
            }
        }
        best
    }

    /// The trie for the child reached through `segment`, with this
    /// position's effective key kept available as the child's cover.
    pub fn subtree_with_cover(&self, segment: &str) -> KeyTrie {
        let mut sub = self.children.get(segment).cloned().unwrap_or_default();
        sub.cover = self.effective_key().cloned();
        sub
    }

    /// The key used for a node at this position.
    pub(crate) fn select(&self, is_key_root: bool, path: &[Segment]) -> NodeResult<&SymmetricKey> {
        let key = if is_key_root { self.key() } else { self.cover() };
        key.ok_or_else(|| NodeError::MissingKey(path.to_vec()))
    }
}

/// Extend a structural IV by one edge.
pub fn child_iv(iv: &[u8], segment: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(iv.len() + 1 + segment.len());
    out.extend_from_slice(iv);
    out.push(b'/');
    out.extend_from_slice(segment.as_bytes());
    out
}

/// Seals or opens one node's local payload with its key and IV.
pub struct Sealer<'a> {
    key: &'a SymmetricKey,
    iv: &'a [u8],
    path: &'a [Segment],
}

impl<'a> Sealer<'a> {
    pub fn new(key: &'a SymmetricKey, iv: &'a [u8], path: &'a [Segment]) -> Self {
        Self { key, iv, path }
    }

    pub fn seal(&self, plaintext: &[u8]) -> NodeResult<Vec<u8>> {
        self.key.seal(self.iv, plaintext).map_err(|source| self.error(source))
    }

    pub fn open(&self, ciphertext: &[u8]) -> NodeResult<Vec<u8>> {
        self.key.open(self.iv, ciphertext).map_err(|source| self.error(source))
    }

    /// Path of the node being sealed.
    pub fn path(&self) -> &[Segment] {
        self.path
    }

    fn error(&self, source: arbor_crypto::CipherError) -> NodeError {
        NodeError::Cipher {
            path: Path::from(self.path),
            source,
        }
    }
}
