//! Transition proofs.
//!
//! A proof is the trie with everything off the path to one key cut back to
//! digests. It has the same root digest as the full trie, and applying the
//! proven change to it yields the same new root digest the full trie would.
//! Proofs of the same root merge into a proof of both changes.

use serde::{Deserialize, Serialize};
use tracing::debug;

use arbor_node::{Cid, ContentNode};

use crate::error::{TrieError, TrieResult};
use crate::radix::{materialized, RadixValue, Stem, Trie};

/// The kind of single-key change a proof supports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// The key is absent and will be set.
    Creation,
    /// The key is present and its value will change.
    Mutation,
    /// The key is present and will be removed.
    Deletion,
}

pub(crate) fn prove<V: RadixValue>(
    stem: &Stem<V>,
    kind: Transition,
    key: &str,
) -> TrieResult<Stem<V>> {
    let present = stem.get(key)?.is_some();
    match kind {
        Transition::Creation if present => return Err(TrieError::KeyExists(key.to_string())),
        Transition::Mutation | Transition::Deletion if !present => {
            return Err(TrieError::KeyNotFound(key.to_string()))
        }
        _ => {}
    }
    let proof = spine(stem, key, kind)?;
    debug!(?kind, key, root = %proof.digest().short_hex(), "built transition proof");
    Ok(proof)
}

/// `stem` with only the walk towards `key` kept materialized.
fn spine<V: RadixValue>(stem: &Stem<V>, key: &str, kind: Transition) -> TrieResult<Stem<V>> {
    let node = materialized(stem)?;
    let mut pruned = node.clone();
    for child in pruned.children.values_mut() {
        child.cut();
    }
    if let Some(value) = pruned.value.as_mut().and_then(RadixValue::as_node_mut) {
        value.cut();
    }

    if let Some(rest) = key.strip_prefix(node.prefix.as_str()) {
        match rest.chars().next() {
            None => {
                // Removing the value may fold this node into its only child.
                if kind == Transition::Deletion {
                    for (first, child) in &node.children {
                        pruned.children.insert(*first, child.prune());
                    }
                }
            }
            Some(first) => {
                if let Some(child) = node.children.get(&first) {
                    // The target may vanish and fold this node into a sibling.
                    if kind == Transition::Deletion && materialized(child)?.prefix == rest {
                        for (other, sibling) in &node.children {
                            if *other != first {
                                pruned.children.insert(*other, sibling.prune());
                            }
                        }
                    }
                    pruned.children.insert(first, spine(child, rest, kind)?);
                }
            }
        }
    }
    Ok(Cid::new(pruned)?)
}
