//! The Merkle radix trie.
//!
//! A [`Stem`] is a content node whose artifact is a [`RadixNode`]: a
//! compressed edge label (`prefix`), an optional value terminating at the end
//! of that label, and children keyed by the first symbol of their own label.
//!
//! # Invariants
//!
//! - The root's prefix is empty. Every other node holds a value or at least
//!   two children, so the shape of a trie is a function of its key set.
//! - A child stored under symbol `c` has a prefix starting with `c`.
//! - Updates rebuild only the spine from the root to the touched node;
//!   every other subtree is shared with the previous version.
//!
//! Selectors routed through a radix node are in key space: a segment is a
//! key relative to the node's position, not a structural edge.

use std::collections::BTreeMap;

use arbor_node::{Artifact, Cid, ContentNode, NodeError, NodeResult, Sealer, Selector};
use arbor_types::{child_path, Path, Segment};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{TrieError, TrieResult};
use crate::proof::{self, Transition};

/// Structural segment under which a node-valued entry appears.
pub const VALUE_SEGMENT: &str = "#value";

/// A content node holding one radix trie node.
pub type Stem<V> = Cid<RadixNode<V>>;

/// A value storable in a radix trie.
///
/// Scalars live in their node's payload and are sealed with it. A value that
/// is itself a content node is exposed as the child [`VALUE_SEGMENT`] and
/// takes part in capture, disclosure, and encryption like any other child.
pub trait RadixValue: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    fn as_node(&self) -> Option<&dyn ContentNode> {
        None
    }

    fn as_node_mut(&mut self) -> Option<&mut dyn ContentNode> {
        None
    }

    fn seal(&mut self, sealer: &Sealer<'_>) -> NodeResult<()>;

    fn open(&mut self, sealer: &Sealer<'_>) -> NodeResult<()>;
}

impl RadixValue for Vec<u8> {
    fn seal(&mut self, sealer: &Sealer<'_>) -> NodeResult<()> {
        *self = sealer.seal(self)?;
        Ok(())
    }

    fn open(&mut self, sealer: &Sealer<'_>) -> NodeResult<()> {
        *self = sealer.open(self)?;
        Ok(())
    }
}

/// Sealed strings hold the hex of their ciphertext.
impl RadixValue for String {
    fn seal(&mut self, sealer: &Sealer<'_>) -> NodeResult<()> {
        *self = hex::encode(sealer.seal(self.as_bytes())?);
        Ok(())
    }

    fn open(&mut self, sealer: &Sealer<'_>) -> NodeResult<()> {
        let ciphertext = hex::decode(self.as_str())
            .map_err(|e| NodeError::Serialization(format!("sealed value is not hex: {e}")))?;
        let plaintext = sealer.open(&ciphertext)?;
        *self = String::from_utf8(plaintext)
            .map_err(|e| NodeError::Serialization(format!("sealed value is not utf-8: {e}")))?;
        Ok(())
    }
}

impl<A: Artifact> RadixValue for Cid<A> {
    fn as_node(&self) -> Option<&dyn ContentNode> {
        Some(self)
    }

    fn as_node_mut(&mut self) -> Option<&mut dyn ContentNode> {
        Some(self)
    }

    // Sealed through the child traversal.
    fn seal(&mut self, _sealer: &Sealer<'_>) -> NodeResult<()> {
        Ok(())
    }

    fn open(&mut self, _sealer: &Sealer<'_>) -> NodeResult<()> {
        Ok(())
    }
}

/// One node of a Merkle radix trie.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(serialize = "V: Serialize", deserialize = "V: DeserializeOwned"))]
pub struct RadixNode<V> {
    pub(crate) prefix: String,
    pub(crate) value: Option<V>,
    pub(crate) children: BTreeMap<char, Stem<V>>,
}

impl<V: RadixValue> RadixNode<V> {
    /// The root of an empty trie.
    pub fn empty() -> Self {
        Self {
            prefix: String::new(),
            value: None,
            children: BTreeMap::new(),
        }
    }

    fn leaf(prefix: &str, value: V) -> Self {
        Self {
            prefix: prefix.to_string(),
            value: Some(value),
            children: BTreeMap::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    pub fn branches(&self) -> &BTreeMap<char, Stem<V>> {
        &self.children
    }

    // Keys passed to the helpers below are relative to the start of this
    // node's prefix.

    fn lookup(&self, key: &str) -> TrieResult<Option<&V>> {
        let Some(rest) = key.strip_prefix(self.prefix.as_str()) else {
            return Ok(None);
        };
        match rest.chars().next() {
            None => Ok(self.value.as_ref()),
            Some(first) => match self.children.get(&first) {
                None => Ok(None),
                Some(stem) => materialized(stem)?.lookup(rest),
            },
        }
    }

    fn insert(&self, key: &str, value: V) -> TrieResult<Self> {
        if let Some(rest) = key.strip_prefix(self.prefix.as_str()) {
            let mut next = self.clone();
            match rest.chars().next() {
                None => next.value = Some(value),
                Some(first) => {
                    let child = match self.children.get(&first) {
                        Some(stem) => materialized(stem)?.insert(rest, value)?,
                        None => Self::leaf(rest, value),
                    };
                    next.children.insert(first, Cid::new(child)?);
                }
            }
            return Ok(next);
        }

        // The key ends or diverges inside this node's label: split it.
        let shared = common_prefix_len(&self.prefix, key);
        let mut tail = self.clone();
        tail.prefix = self.prefix[shared..].to_string();
        let mut parent = Self {
            prefix: key[..shared].to_string(),
            value: None,
            children: BTreeMap::new(),
        };
        if let Some(first) = tail.prefix.chars().next() {
            parent.children.insert(first, Cid::new(tail)?);
        }
        let remainder = &key[shared..];
        match remainder.chars().next() {
            None => parent.value = Some(value),
            Some(first) => {
                parent.children.insert(first, Cid::new(Self::leaf(remainder, value))?);
            }
        }
        Ok(parent)
    }

    /// `None` when the node disappears entirely.
    fn remove(&self, key: &str, is_root: bool) -> TrieResult<Option<Self>> {
        let absent = || TrieError::KeyNotFound(key.to_string());
        let rest = key.strip_prefix(self.prefix.as_str()).ok_or_else(absent)?;
        let mut next = self.clone();
        match rest.chars().next() {
            None => {
                if next.value.take().is_none() {
                    return Err(absent());
                }
            }
            Some(first) => {
                let stem = self.children.get(&first).ok_or_else(absent)?;
                match materialized(stem)?.remove(rest, false)? {
                    Some(child) => {
                        next.children.insert(first, Cid::new(child)?);
                    }
                    None => {
                        next.children.remove(&first);
                    }
                }
            }
        }
        next.compressed(is_root)
    }

    /// Restore path compression after a removal below this node.
    fn compressed(mut self, is_root: bool) -> TrieResult<Option<Self>> {
        if is_root || self.value.is_some() || self.children.len() >= 2 {
            return Ok(Some(self));
        }
        let Some((_, only)) = self.children.pop_first() else {
            return Ok(None);
        };
        let child = materialized(&only)?;
        let mut merged = child.clone();
        merged.prefix = format!("{}{}", self.prefix, child.prefix);
        Ok(Some(merged))
    }

    fn locate(&self, key: &str, path: &mut Path) -> TrieResult<bool> {
        let Some(rest) = key.strip_prefix(self.prefix.as_str()) else {
            return Ok(false);
        };
        match rest.chars().next() {
            None => Ok(self.value.is_some()),
            Some(first) => match self.children.get(&first) {
                None => Ok(false),
                Some(stem) => {
                    path.push(first.to_string());
                    materialized(stem)?.locate(rest, path)
                }
            },
        }
    }

    fn collect_entries<'a>(&'a self, base: &str, out: &mut Vec<(String, &'a V)>) {
        let key = format!("{base}{}", self.prefix);
        if let Some(value) = &self.value {
            out.push((key.clone(), value));
        }
        for stem in self.children.values() {
            if let Some(child) = stem.artifact() {
                child.collect_entries(&key, out);
            }
        }
    }

    fn count(&self) -> TrieResult<usize> {
        let mut total = usize::from(self.value.is_some());
        for stem in self.children.values() {
            total += materialized(stem)?.count()?;
        }
        Ok(total)
    }

    /// Split a key-space selector into the part addressed to this node's own
    /// value and the parts routed to each child, rebased to the child.
    fn route(&self, selector: &Selector) -> (Selector, BTreeMap<char, Selector>) {
        let mut here = Selector::new();
        let mut routed: BTreeMap<char, Selector> = BTreeMap::new();
        for (segment, sub) in selector.entries() {
            let Some(rest) = segment.strip_prefix(self.prefix.as_str()) else {
                continue;
            };
            match rest.chars().next() {
                None => here.union(sub),
                Some(first) => routed.entry(first).or_default().graft(rest, sub),
            }
        }
        (here, routed)
    }

    fn route_children<F>(
        &mut self,
        routed: BTreeMap<char, Selector>,
        prefix: &[Segment],
        mut f: F,
    ) -> NodeResult<()>
    where
        F: FnMut(&mut Stem<V>, &Selector, &[Segment]) -> NodeResult<()>,
    {
        for (first, selector) in routed {
            // Keys absent from the trie select nothing.
            if let Some(stem) = self.children.get_mut(&first) {
                f(stem, &selector, &child_path(prefix, &first.to_string()))?;
            }
        }
        Ok(())
    }
}

impl<V: RadixValue> Artifact for RadixNode<V> {
    fn children(&self) -> Vec<(Segment, &dyn ContentNode)> {
        let mut out: Vec<(Segment, &dyn ContentNode)> = Vec::with_capacity(self.children.len() + 1);
        if let Some(node) = self.value.as_ref().and_then(RadixValue::as_node) {
            out.push((VALUE_SEGMENT.to_string(), node));
        }
        for (first, stem) in &self.children {
            out.push((first.to_string(), stem as &dyn ContentNode));
        }
        out
    }

    fn children_mut(&mut self) -> Vec<(Segment, &mut dyn ContentNode)> {
        let mut out: Vec<(Segment, &mut dyn ContentNode)> =
            Vec::with_capacity(self.children.len() + 1);
        if let Some(node) = self.value.as_mut().and_then(RadixValue::as_node_mut) {
            out.push((VALUE_SEGMENT.to_string(), node));
        }
        for (first, stem) in self.children.iter_mut() {
            out.push((first.to_string(), stem as &mut dyn ContentNode));
        }
        out
    }

    fn is_well_formed(&self) -> bool {
        self.prefix.is_empty() || self.value.is_some() || self.children.len() >= 2
    }

    /// Targets name whole keys. A key's deeper segments continue into its
    /// value when that value is a node.
    fn target(&mut self, targets: &Selector, prefix: &[Segment]) -> NodeResult<()> {
        let (here, routed) = self.route(targets);
        if !here.is_empty() {
            if let Some(node) = self.value.as_mut().and_then(RadixValue::as_node_mut) {
                node.target_node(&here, &child_path(prefix, VALUE_SEGMENT))?;
            }
        }
        self.route_children(routed, prefix, |stem, selector, path| stem.target_node(selector, path))
    }

    /// A mask segment with nothing below it is a key prefix: every key that
    /// starts with it is wanted. A segment with deeper parts names a whole
    /// key and masks inside its value.
    fn mask(&mut self, masks: &Selector, prefix: &[Segment]) -> NodeResult<()> {
        let covered = masks
            .entries()
            .any(|(segment, sub)| sub.is_terminal() && self.prefix.starts_with(segment.as_str()));
        if covered {
            for (_, child) in self.children_mut() {
                child.mask_all_node();
            }
            return Ok(());
        }

        let (here, routed) = self.route(masks);
        if !here.is_empty() {
            if let Some(node) = self.value.as_mut().and_then(RadixValue::as_node_mut) {
                node.mask_node(&here, &child_path(prefix, VALUE_SEGMENT))?;
            }
        }
        self.route_children(routed, prefix, |stem, selector, path| stem.mask_node(selector, path))
    }

    fn seal_payload(&mut self, sealer: &Sealer<'_>) -> NodeResult<()> {
        match self.value.as_mut() {
            Some(value) => value.seal(sealer),
            None => Ok(()),
        }
    }

    fn open_payload(&mut self, sealer: &Sealer<'_>) -> NodeResult<()> {
        match self.value.as_mut() {
            Some(value) => value.open(sealer),
            None => Ok(()),
        }
    }
}

/// Point reads and persistent updates over a [`Stem`].
///
/// Every update returns a new root; the receiver is left untouched. Walks
/// that reach a stub fail with [`TrieError::MissingData`], so updates on a
/// partial trie succeed exactly when the trie holds the nodes they touch.
pub trait Trie<V: RadixValue>: Sized {
    fn empty() -> TrieResult<Self>;

    fn from_entries<I, K>(entries: I) -> TrieResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>;

    /// `Ok(None)` when the key is provably absent.
    fn get(&self, key: &str) -> TrieResult<Option<&V>>;

    fn set(&self, key: &str, value: V) -> TrieResult<Self>;

    fn delete(&self, key: &str) -> TrieResult<Self>;

    /// A pruned copy of this trie holding only what `kind` of change to
    /// `key` needs. Its digest equals this trie's digest.
    fn transition_proof(&self, kind: Transition, key: &str) -> TrieResult<Self>;

    /// Materialized entries in key order. Keys behind stubs are skipped.
    fn entries(&self) -> Vec<(String, &V)>;

    fn keys(&self) -> Vec<String>;

    /// Number of keys. Fails unless every trie node is materialized.
    fn len(&self) -> TrieResult<usize>;

    /// Structural path from the root to the node that holds `key`.
    fn node_path(&self, key: &str) -> TrieResult<Path>;
}

impl<V: RadixValue> Trie<V> for Stem<V> {
    fn empty() -> TrieResult<Self> {
        Ok(Cid::new(RadixNode::empty())?)
    }

    fn from_entries<I, K>(entries: I) -> TrieResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
    {
        let mut trie = Self::empty()?;
        for (key, value) in entries {
            trie = trie.set(key.as_ref(), value)?;
        }
        Ok(trie)
    }

    fn get(&self, key: &str) -> TrieResult<Option<&V>> {
        materialized(self)?.lookup(key)
    }

    fn set(&self, key: &str, value: V) -> TrieResult<Self> {
        let root = Cid::new(materialized(self)?.insert(key, value)?)?;
        debug!(key, root = %root.digest().short_hex(), "set trie key");
        Ok(root)
    }

    fn delete(&self, key: &str) -> TrieResult<Self> {
        if self.get(key)?.is_none() {
            return Err(TrieError::KeyNotFound(key.to_string()));
        }
        let node = materialized(self)?
            .remove(key, true)?
            .unwrap_or_else(RadixNode::empty);
        let root = Cid::new(node)?;
        debug!(key, root = %root.digest().short_hex(), "deleted trie key");
        Ok(root)
    }

    fn transition_proof(&self, kind: Transition, key: &str) -> TrieResult<Self> {
        proof::prove(self, kind, key)
    }

    fn entries(&self) -> Vec<(String, &V)> {
        let mut out = Vec::new();
        if let Some(node) = self.artifact() {
            node.collect_entries("", &mut out);
        }
        out
    }

    fn keys(&self) -> Vec<String> {
        self.entries().into_iter().map(|(key, _)| key).collect()
    }

    fn len(&self) -> TrieResult<usize> {
        materialized(self)?.count()
    }

    fn node_path(&self, key: &str) -> TrieResult<Path> {
        let mut path = Path::new();
        if materialized(self)?.locate(key, &mut path)? {
            Ok(path)
        } else {
            Err(TrieError::KeyNotFound(key.to_string()))
        }
    }
}

/// The node behind `stem`, or `MissingData`.
pub(crate) fn materialized<V: RadixValue>(stem: &Stem<V>) -> TrieResult<&RadixNode<V>> {
    stem.artifact().ok_or(TrieError::MissingData(stem.digest()))
}

/// Byte length of the longest common prefix, on char boundaries.
fn common_prefix_len(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .take_while(|((_, x), y)| x == y)
        .last()
        .map_or(0, |((at, c), _)| at + c.len_utf8())
}
