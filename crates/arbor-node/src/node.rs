//! The content-addressed node.
//!
//! A [`Cid`] is either a stub (digest only) or a digest plus its
//! materialized artifact. Completeness is computed bottom-up and cached:
//! a stub is complete iff nothing is wanted from it, a materialized node iff
//! all of its children are complete.
//!
//! # Invariants
//!
//! - A digest is only ever (re)computed from a present artifact.
//! - Every public operation returns a new value. Bodies are shared through
//!   `Arc` and only copied along the path that changes.
//! - `capture` applies completely or not at all.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use arbor_crypto::ContentHasher;
use arbor_types::{child_path, Digest, Segment};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::artifact::{Artifact, ContentNode};
use crate::encryption::{child_iv, KeyTrie, Sealer};
use crate::error::{NodeError, NodeResult};
use crate::ledger::Ledger;
use crate::scope::Scope;
use crate::selector::{should_mask, Selector};

/// Materialization state of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeState {
    /// Digest only.
    Stub,
    /// Body present, some obligation outstanding below.
    Partial,
    /// Body present, nothing outstanding below.
    Complete,
}

/// A digest-identified reference that may or may not hold its artifact.
pub struct Cid<A> {
    digest: Digest,
    artifact: Option<Arc<A>>,
    complete: bool,
    scope: Scope,
}

impl<A: Artifact> Cid<A> {
    /// Wrap a fully built artifact, hashing its canonical encoding.
    pub fn new(artifact: A) -> NodeResult<Self> {
        let bytes = artifact.encode()?;
        let mut node = Self {
            digest: ContentHasher::NODE.hash(&bytes),
            artifact: Some(Arc::new(artifact)),
            complete: false,
            scope: Scope::Full,
        };
        node.refresh();
        Ok(node)
    }

    /// A stub known only by digest. It wants its whole subtree.
    pub fn from_digest(digest: Digest) -> Self {
        Self {
            digest,
            artifact: None,
            complete: false,
            scope: Scope::Full,
        }
    }

    pub fn digest(&self) -> Digest {
        self.digest
    }

    pub fn artifact(&self) -> Option<&A> {
        self.artifact.as_deref()
    }

    /// The artifact, or `NotMaterialized`.
    pub fn require_artifact(&self) -> NodeResult<&A> {
        self.artifact().ok_or(NodeError::NotMaterialized(self.digest))
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn state(&self) -> NodeState {
        match (&self.artifact, self.complete) {
            (None, _) => NodeState::Stub,
            (Some(_), true) => NodeState::Complete,
            (Some(_), false) => NodeState::Partial,
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Outstanding digests below this node, keyed to their paths.
    pub fn missing(&self) -> Ledger {
        let mut ledger = Ledger::new();
        self.collect_missing(&[], &mut ledger);
        ledger
    }

    /// Canonical bytes of every materialized body at or below this node.
    pub fn contents(&self) -> NodeResult<BTreeMap<Digest, Vec<u8>>> {
        let mut out = BTreeMap::new();
        self.collect_contents(&mut out)?;
        Ok(out)
    }

    /// Verified insertion of `bytes`, asserted to be the body for
    /// `expected`, at the stub reached by `path`.
    pub fn capture(
        &self,
        expected: &Digest,
        bytes: &[u8],
        path: &[Segment],
    ) -> NodeResult<(Self, Ledger)> {
        let mut next = self.clone();
        let fresh = next.capture_node(expected, bytes, path, &[])?;
        Ok((next, fresh))
    }

    /// Discard the bodies of this node's direct children, keeping their
    /// digests. Completeness is unchanged.
    pub fn prune(&self) -> Self {
        let mut next = self.clone();
        if let Some(artifact) = next.artifact.as_mut() {
            for (_, child) in Arc::make_mut(artifact).children_mut() {
                child.cut();
            }
        }
        next
    }

    /// This node reduced to its digest, keeping its disclosure scope.
    pub fn stub(&self) -> Self {
        let scope = match &self.scope {
            Scope::Unwanted => Scope::Full,
            other => other.clone(),
        };
        Self {
            digest: self.digest,
            artifact: None,
            complete: false,
            scope,
        }
    }

    /// Recompute every materialized digest below and compare.
    pub fn computed_validity(&self) -> bool {
        self.verify_node()
    }

    /// Declare interest in exact paths. Returns the new tree and the
    /// obligations the declaration introduced.
    pub fn target(&self, targets: &Selector) -> NodeResult<(Self, Ledger)> {
        let before = self.missing();
        let mut next = self.clone();
        next.target_node(targets, &[])?;
        let fresh = next.missing().since(&before);
        Ok((next, fresh))
    }

    /// Declare interest in whole subtrees under path prefixes.
    pub fn mask(&self, masks: &Selector) -> NodeResult<(Self, Ledger)> {
        let before = self.missing();
        let mut next = self.clone();
        next.mask_node(masks, &[])?;
        let fresh = next.missing().since(&before);
        Ok((next, fresh))
    }

    /// Declare interest in everything from this node down.
    pub fn mask_all(&self) -> (Self, Ledger) {
        let before = self.missing();
        let mut next = self.clone();
        next.mask_all_node();
        let fresh = next.missing().since(&before);
        (next, fresh)
    }

    /// Seal every payload under the key its path resolves to in `keys`.
    pub fn encrypt(&self, keys: &KeyTrie, common_iv: &[u8], is_key_root: bool) -> NodeResult<Self> {
        let mut next = self.clone();
        next.seal_node(keys, common_iv, is_key_root, &[])?;
        Ok(next)
    }

    /// Inverse of [`encrypt`](Self::encrypt) with the same keys and IV.
    pub fn decrypt(&self, keys: &KeyTrie, common_iv: &[u8], is_key_root: bool) -> NodeResult<Self> {
        let mut next = self.clone();
        next.open_node(keys, common_iv, is_key_root, &[])?;
        Ok(next)
    }

    /// Combine two partial views of the same digest.
    ///
    /// Bodies are not re-verified here; `computed_validity` or a later
    /// capture does that.
    pub fn merge(&self, other: &Self) -> NodeResult<Self> {
        if self.digest != other.digest {
            return Err(NodeError::DigestMismatch {
                expected: self.digest,
                actual: other.digest,
            });
        }
        match (&self.artifact, &other.artifact) {
            (None, _) => Ok(other.clone()),
            (Some(_), None) => Ok(self.clone()),
            (Some(mine), Some(theirs)) => {
                let mut merged = Self {
                    digest: self.digest,
                    artifact: Some(Arc::new(mine.merge(theirs)?)),
                    complete: false,
                    scope: self.scope.clone(),
                };
                merged.refresh();
                Ok(merged)
            }
        }
    }

    fn refresh(&mut self) {
        self.complete = match &self.artifact {
            Some(artifact) => artifact.children().iter().all(|(_, child)| child.is_complete()),
            None => !self.scope.is_wanted(),
        };
    }

    fn missing_at(&self, prefix: &[Segment]) -> Ledger {
        let mut ledger = Ledger::new();
        self.collect_missing(prefix, &mut ledger);
        ledger
    }

    fn materialize(
        &self,
        expected: &Digest,
        bytes: &[u8],
        prefix: &[Segment],
    ) -> NodeResult<(Self, Ledger)> {
        if self.artifact.is_some() {
            return Err(NodeError::AlreadyMaterialized(self.digest));
        }
        if !self.scope.is_wanted() {
            return Err(NodeError::AlreadyComplete(self.digest));
        }
        if *expected != self.digest {
            return Err(NodeError::DigestMismatch {
                expected: self.digest,
                actual: *expected,
            });
        }
        let actual = ContentHasher::NODE.hash(bytes);
        if actual != self.digest {
            return Err(NodeError::DigestMismatch {
                expected: self.digest,
                actual,
            });
        }

        let mut artifact = A::decode(&self.digest, bytes)?;
        if let Scope::Selected { targets, masks } = &self.scope {
            for (_, child) in artifact.children_mut() {
                child.withdraw();
            }
            artifact.target(targets, prefix)?;
            artifact.mask(masks, prefix)?;
        }

        let mut node = Self {
            digest: self.digest,
            artifact: Some(Arc::new(artifact)),
            complete: false,
            scope: self.scope.clone(),
        };
        node.refresh();
        let fresh = node.missing_at(prefix);
        if fresh.contains(&self.digest) {
            return Err(NodeError::SelfReferentialInsertion(self.digest));
        }
        Ok((node, fresh))
    }

    fn transform_children<F>(&mut self, prefix: &[Segment], mut f: F) -> NodeResult<()>
    where
        F: FnMut(&mut dyn ContentNode, &str, &[Segment]) -> NodeResult<()>,
    {
        if let Some(artifact) = self.artifact.as_mut() {
            for (segment, child) in Arc::make_mut(artifact).children_mut() {
                f(child, &segment, &child_path(prefix, &segment))?;
            }
        }
        Ok(())
    }

    fn rehash(&mut self) -> NodeResult<()> {
        let artifact = self.require_artifact()?;
        self.digest = ContentHasher::NODE.hash(&artifact.encode()?);
        self.refresh();
        Ok(())
    }
}

impl<A: Artifact> ContentNode for Cid<A> {
    fn digest(&self) -> Digest {
        self.digest
    }

    fn is_complete(&self) -> bool {
        self.complete
    }

    fn is_materialized(&self) -> bool {
        self.artifact.is_some()
    }

    fn scope(&self) -> &Scope {
        &self.scope
    }

    fn collect_missing(&self, prefix: &[Segment], out: &mut Ledger) {
        match &self.artifact {
            None => {
                if self.scope.is_wanted() {
                    out.record(self.digest, prefix.to_vec());
                }
            }
            Some(artifact) => {
                if self.complete {
                    return;
                }
                for (segment, child) in artifact.children() {
                    child.collect_missing(&child_path(prefix, &segment), out);
                }
            }
        }
    }

    fn collect_contents(&self, out: &mut BTreeMap<Digest, Vec<u8>>) -> NodeResult<()> {
        let Some(artifact) = &self.artifact else {
            return Ok(());
        };
        out.insert(self.digest, artifact.encode()?);
        for (_, child) in artifact.children() {
            child.collect_contents(out)?;
        }
        Ok(())
    }

    fn capture_node(
        &mut self,
        digest: &Digest,
        bytes: &[u8],
        path: &[Segment],
        prefix: &[Segment],
    ) -> NodeResult<Ledger> {
        let Some((head, rest)) = path.split_first() else {
            let (node, fresh) = self.materialize(digest, bytes, prefix)?;
            debug!(digest = %self.digest.short_hex(), outstanding = fresh.len(), "captured node");
            *self = node;
            return Ok(fresh);
        };

        let here = self.digest;
        if self.complete {
            return Err(NodeError::AlreadyComplete(here));
        }
        let child_prefix = child_path(prefix, head);
        let artifact = self
            .artifact
            .as_mut()
            .ok_or_else(|| NodeError::PathNotFound(child_prefix.clone()))?;
        let child = Arc::make_mut(artifact)
            .child_mut(head)
            .ok_or_else(|| NodeError::PathNotFound(child_prefix.clone()))?;
        if child.is_complete() {
            return Err(NodeError::AlreadyComplete(child.digest()));
        }
        let fresh = child.capture_node(digest, bytes, rest, &child_prefix)?;
        self.refresh();
        Ok(fresh)
    }

    fn withdraw(&mut self) {
        if self.artifact.is_none() {
            self.scope = Scope::Unwanted;
            self.complete = true;
        }
    }

    fn cut(&mut self) {
        if self.artifact.take().is_none() {
            return;
        }
        if self.complete {
            self.scope = Scope::Unwanted;
        } else if !self.scope.is_wanted() {
            self.scope = Scope::Full;
        }
    }

    fn target_node(&mut self, targets: &Selector, prefix: &[Segment]) -> NodeResult<()> {
        if targets.is_empty() {
            return Ok(());
        }
        if let Some(artifact) = self.artifact.as_mut() {
            Arc::make_mut(artifact).target(targets, prefix)?;
        }
        self.scope = self.scope.with_targets(targets);
        self.refresh();
        Ok(())
    }

    fn mask_node(&mut self, masks: &Selector, prefix: &[Segment]) -> NodeResult<()> {
        if masks.is_empty() {
            return Ok(());
        }
        if should_mask(masks, &[]) {
            self.mask_all_node();
            return Ok(());
        }
        if let Some(artifact) = self.artifact.as_mut() {
            Arc::make_mut(artifact).mask(masks, prefix)?;
        }
        self.scope = self.scope.with_masks(masks);
        self.refresh();
        Ok(())
    }

    fn mask_all_node(&mut self) {
        self.scope = Scope::Full;
        if let Some(artifact) = self.artifact.as_mut() {
            for (_, child) in Arc::make_mut(artifact).children_mut() {
                child.mask_all_node();
            }
        }
        self.refresh();
    }

    fn verify_node(&self) -> bool {
        let Some(artifact) = &self.artifact else {
            return true;
        };
        let bound = match artifact.encode() {
            Ok(bytes) => ContentHasher::NODE.verify(&bytes, &self.digest),
            Err(_) => false,
        };
        bound
            && artifact.is_well_formed()
            && artifact.children().iter().all(|(_, child)| child.verify_node())
    }

    fn seal_node(
        &mut self,
        keys: &KeyTrie,
        iv: &[u8],
        is_key_root: bool,
        prefix: &[Segment],
    ) -> NodeResult<()> {
        if self.artifact.is_none() {
            return Err(NodeError::NotMaterialized(self.digest));
        }
        let key = keys.select(is_key_root, prefix)?;
        self.transform_children(prefix, |child, segment, path| {
            child.seal_node(
                &keys.subtree_with_cover(segment),
                &child_iv(iv, segment),
                keys.has_key_at(segment),
                path,
            )
        })?;
        if let Some(artifact) = self.artifact.as_mut() {
            Arc::make_mut(artifact).seal_payload(&Sealer::new(key, iv, prefix))?;
        }
        self.rehash()
    }

    fn open_node(
        &mut self,
        keys: &KeyTrie,
        iv: &[u8],
        is_key_root: bool,
        prefix: &[Segment],
    ) -> NodeResult<()> {
        if self.artifact.is_none() {
            return Err(NodeError::NotMaterialized(self.digest));
        }
        let key = keys.select(is_key_root, prefix)?;
        self.transform_children(prefix, |child, segment, path| {
            child.open_node(
                &keys.subtree_with_cover(segment),
                &child_iv(iv, segment),
                keys.has_key_at(segment),
                path,
            )
        })?;
        if let Some(artifact) = self.artifact.as_mut() {
            Arc::make_mut(artifact).open_payload(&Sealer::new(key, iv, prefix))?;
        }
        self.rehash()
    }

    fn merge_node(&mut self, other: &dyn ContentNode) -> NodeResult<()> {
        let other = other
            .as_any()
            .downcast_ref::<Cid<A>>()
            .ok_or_else(|| NodeError::MalformedArtifact {
                digest: other.digest(),
                reason: "cannot merge nodes of different artifact types".to_string(),
            })?;
        *self = self.merge(other)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<A> Clone for Cid<A> {
    fn clone(&self) -> Self {
        Self {
            digest: self.digest,
            artifact: self.artifact.clone(),
            complete: self.complete,
            scope: self.scope.clone(),
        }
    }
}

impl<A: PartialEq> PartialEq for Cid<A> {
    fn eq(&self, other: &Self) -> bool {
        self.digest == other.digest
            && self.complete == other.complete
            && self.scope == other.scope
            && self.artifact.as_deref() == other.artifact.as_deref()
    }
}

impl<A: Eq> Eq for Cid<A> {}

impl<A> fmt::Debug for Cid<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cid")
            .field("digest", &self.digest)
            .field("materialized", &self.artifact.is_some())
            .field("complete", &self.complete)
            .finish()
    }
}

impl<A> Serialize for Cid<A> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.digest.serialize(serializer)
    }
}

impl<'de, A> Deserialize<'de> for Cid<A> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let digest = Digest::deserialize(deserializer)?;
        Ok(Self {
            digest,
            artifact: None,
            complete: false,
            scope: Scope::Full,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{body, child, folder, leaf, path, sample, selector, Echo, Folder};
    use arbor_crypto::SymmetricKey;

    /// Capture `tree`'s root body into `stub`.
    fn captured_into(stub: &Cid<Folder>, tree: &Cid<Folder>) -> Cid<Folder> {
        let (root, _) = stub.capture(&tree.digest(), &body(tree), &[]).unwrap();
        root
    }

    fn root_captured(tree: &Cid<Folder>) -> Cid<Folder> {
        captured_into(&tree.stub(), tree)
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    #[test]
    fn new_node_is_complete() {
        let tree = sample();
        assert_eq!(tree.state(), NodeState::Complete);
        assert!(tree.missing().is_empty());
        assert!(tree.computed_validity());
    }

    #[test]
    fn validity_rejects_body_under_foreign_digest() {
        let mut forged = leaf("x");
        forged.digest = leaf("y").digest();
        assert!(forged.is_complete());
        assert!(!forged.computed_validity());
    }

    #[test]
    fn validity_checks_every_descendant() {
        let tree = sample();
        let mut forged = tree.clone();
        let root = Arc::make_mut(forged.artifact.as_mut().unwrap());
        let a = root.entries.get_mut("a").unwrap();
        let a_body = Arc::make_mut(a.artifact.as_mut().unwrap());
        a_body.entries.get_mut("x").unwrap().artifact = leaf("forged").artifact.clone();

        // Encodings only carry child digests, so the forgery is invisible above x.
        assert_eq!(forged.digest(), tree.digest());
        assert_eq!(body(&forged), body(&tree));
        assert!(child(&forged, "b").computed_validity());
        assert!(!child(&forged, "a").computed_validity());
        assert!(!forged.computed_validity());
        assert!(tree.computed_validity());
    }

    #[test]
    fn digest_binds_encoding() {
        let tree = sample();
        assert_eq!(tree.digest(), ContentHasher::NODE.hash(&body(&tree)));
        assert_ne!(tree.digest(), folder("root", vec![("b", leaf("b"))]).digest());
    }

    #[test]
    fn stub_wants_itself() {
        let tree = sample();
        let stub = tree.stub();
        assert_eq!(stub.state(), NodeState::Stub);
        assert!(!stub.is_complete());
        assert_eq!(stub.missing(), Ledger::single(tree.digest(), Vec::new()));
        assert!(matches!(stub.require_artifact(), Err(NodeError::NotMaterialized(_))));
    }

    #[test]
    fn serde_carries_digest_only() {
        let tree = sample();
        let json = serde_json::to_string(&tree).unwrap();
        let back: Cid<Folder> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tree.stub());
    }

    // ------------------------------------------------------------------
    // Capture
    // ------------------------------------------------------------------

    #[test]
    fn capture_root_exposes_children() {
        let tree = sample();
        let (root, fresh) = tree.stub().capture(&tree.digest(), &body(&tree), &[]).unwrap();

        assert_eq!(root.state(), NodeState::Partial);
        assert_eq!(fresh.len(), 2);
        assert_eq!(fresh.paths(&child(&tree, "a").digest()), &[path(&["a"])]);
        assert_eq!(fresh.paths(&child(&tree, "b").digest()), &[path(&["b"])]);
        assert_eq!(root.missing(), fresh);
    }

    #[test]
    fn capture_descends_to_nested_stub() {
        let tree = sample();
        let a = child(&tree, "a");
        let x = child(&a, "x");
        let root = root_captured(&tree);
        let (root, fresh) = root.capture(&a.digest(), &body(&a), &path(&["a"])).unwrap();
        assert_eq!(fresh.paths(&x.digest()), &[path(&["a", "x"])]);

        let (root, fresh) = root.capture(&x.digest(), &body(&x), &path(&["a", "x"])).unwrap();
        assert!(fresh.is_empty());
        assert!(!root.missing().contains(&x.digest()));
        assert!(root.missing().contains(&child(&a, "y").digest()));
    }

    #[test]
    fn capture_rejects_bytes_of_another_node() {
        let tree = sample();
        let err = tree
            .stub()
            .capture(&tree.digest(), &body(&child(&tree, "b")), &[])
            .unwrap_err();
        assert!(matches!(err, NodeError::DigestMismatch { .. }));
    }

    #[test]
    fn capture_rejects_wrong_asserted_digest() {
        let tree = sample();
        let b = child(&tree, "b");
        let err = tree.stub().capture(&b.digest(), &body(&b), &[]).unwrap_err();
        assert_eq!(
            err,
            NodeError::DigestMismatch {
                expected: tree.digest(),
                actual: b.digest(),
            }
        );
    }

    #[test]
    fn capture_rejects_undecodable_body() {
        let junk = b"definitely not a folder".to_vec();
        let digest = ContentHasher::NODE.hash(&junk);
        let err = Cid::<Folder>::from_digest(digest).capture(&digest, &junk, &[]).unwrap_err();
        assert!(matches!(err, NodeError::MalformedArtifact { .. }));
    }

    #[test]
    fn capture_rejects_non_canonical_body() {
        let mut padded = body(&leaf("x"));
        padded.push(0);
        let digest = ContentHasher::NODE.hash(&padded);
        let err = Cid::<Folder>::from_digest(digest).capture(&digest, &padded, &[]).unwrap_err();
        assert!(matches!(err, NodeError::MalformedArtifact { .. }));
    }

    #[test]
    fn capture_into_materialized_node_fails() {
        let tree = sample();
        let err = tree.capture(&tree.digest(), &body(&tree), &[]).unwrap_err();
        assert_eq!(err, NodeError::AlreadyMaterialized(tree.digest()));
    }

    #[test]
    fn capture_below_complete_node_fails() {
        let tree = sample();
        let b = child(&tree, "b");
        let err = tree.capture(&b.digest(), &body(&b), &path(&["b"])).unwrap_err();
        assert_eq!(err, NodeError::AlreadyComplete(tree.digest()));
    }

    #[test]
    fn capture_at_unknown_path_fails() {
        let tree = sample();
        let b = child(&tree, "b");
        let root = root_captured(&tree);
        let err = root.capture(&b.digest(), &body(&b), &path(&["nope"])).unwrap_err();
        assert_eq!(err, NodeError::PathNotFound(path(&["nope"])));
    }

    #[test]
    fn capture_rejects_self_reference() {
        let bytes = b"echo".to_vec();
        let digest = ContentHasher::NODE.hash(&bytes);
        let err = Cid::<Echo>::from_digest(digest).capture(&digest, &bytes, &[]).unwrap_err();
        assert_eq!(err, NodeError::SelfReferentialInsertion(digest));
    }

    #[test]
    fn failed_capture_leaves_caller_untouched() {
        let tree = sample();
        let root = root_captured(&tree);
        let before = root.clone();
        let _ = root.capture(&tree.digest(), b"garbage", &path(&["a"]));
        assert_eq!(root, before);
    }

    // ------------------------------------------------------------------
    // Prune and contents
    // ------------------------------------------------------------------

    #[test]
    fn prune_keeps_digest_and_completeness() {
        let tree = sample();
        let pruned = tree.prune();
        assert_eq!(pruned.digest(), tree.digest());
        assert!(pruned.is_complete());
        assert!(pruned.missing().is_empty());
        assert_eq!(child(&pruned, "a").state(), NodeState::Stub);
    }

    #[test]
    fn contents_lists_every_body() {
        let tree = sample();
        let contents = tree.contents().unwrap();
        assert_eq!(contents.len(), 5);
        assert_eq!(contents[&tree.digest()], body(&tree));
        assert_eq!(tree.prune().contents().unwrap().len(), 1);
    }

    // ------------------------------------------------------------------
    // Disclosure
    // ------------------------------------------------------------------

    #[test]
    fn target_reopens_pruned_child() {
        let tree = sample();
        let a = child(&tree, "a");
        let (targeted, fresh) = tree.prune().target(&selector(&[&["a"]])).unwrap();

        assert_eq!(fresh, Ledger::single(a.digest(), path(&["a"])));
        assert!(!targeted.is_complete());

        // The exact node is wanted, not what lies below it.
        let (done, fresh) = targeted.capture(&a.digest(), &body(&a), &path(&["a"])).unwrap();
        assert!(fresh.is_empty());
        assert!(done.is_complete());
        assert_eq!(child(&child(&done, "a"), "x").state(), NodeState::Stub);
    }

    #[test]
    fn mask_wants_whole_subtree() {
        let tree = sample();
        let a = child(&tree, "a");
        let (masked, _) = tree.stub().mask(&selector(&[&["a"]])).unwrap();
        let root = captured_into(&masked, &tree);
        assert_eq!(root.missing(), Ledger::single(a.digest(), path(&["a"])));

        let (root, fresh) = root.capture(&a.digest(), &body(&a), &path(&["a"])).unwrap();
        assert_eq!(fresh.len(), 2);
        assert_eq!(root.missing(), fresh);
    }

    #[test]
    fn mask_all_reopens_everything() {
        let tree = sample();
        let (reopened, fresh) = tree.prune().mask_all();
        assert_eq!(fresh.len(), 2);
        assert!(fresh.contains(&child(&tree, "a").digest()));
        assert!(fresh.contains(&child(&tree, "b").digest()));
        assert!(!reopened.is_complete());
    }

    #[test]
    fn target_unknown_child_fails() {
        let err = sample().target(&selector(&[&["zzz"]])).unwrap_err();
        assert_eq!(err, NodeError::PathNotFound(path(&["zzz"])));
    }

    #[test]
    fn cut_keeps_declared_scope() {
        let tree = sample();
        let (targeted, _) = tree.target(&selector(&[&["b"]])).unwrap();
        let stub = targeted.stub();
        assert!(matches!(stub.scope(), Scope::Selected { .. }));

        let root = captured_into(&stub, &tree);
        assert_eq!(
            root.missing(),
            Ledger::single(child(&tree, "b").digest(), path(&["b"]))
        );
    }

    // ------------------------------------------------------------------
    // Merge
    // ------------------------------------------------------------------

    #[test]
    fn merge_combines_partial_views() {
        let tree = sample();
        let a = child(&tree, "a");
        let b = child(&tree, "b");
        let root = root_captured(&tree);
        let (with_a, _) = root.capture(&a.digest(), &body(&a), &path(&["a"])).unwrap();
        let (with_b, _) = root.capture(&b.digest(), &body(&b), &path(&["b"])).unwrap();

        let merged = with_a.merge(&with_b).unwrap();
        assert_eq!(child(&merged, "a").state(), NodeState::Partial);
        assert_eq!(child(&merged, "b").state(), NodeState::Complete);
        assert_eq!(merged.missing().len(), 2);
        assert!(merged.computed_validity());
    }

    #[test]
    fn merge_with_stub_keeps_body() {
        let tree = sample();
        assert_eq!(tree.stub().merge(&tree).unwrap(), tree);
        assert_eq!(tree.merge(&tree.stub()).unwrap(), tree);
    }

    #[test]
    fn merge_rejects_different_digests() {
        let err = leaf("x").merge(&leaf("y")).unwrap_err();
        assert!(matches!(err, NodeError::DigestMismatch { .. }));
    }

    // ------------------------------------------------------------------
    // Encryption
    // ------------------------------------------------------------------

    #[test]
    fn encrypt_decrypt_restores_tree() {
        let tree = sample();
        let keys = KeyTrie::with_cover(SymmetricKey::generate());
        let sealed = tree.encrypt(&keys, b"iv", keys.is_key_root()).unwrap();
        assert_ne!(sealed.digest(), tree.digest());
        assert!(sealed.computed_validity());

        let opened = sealed.decrypt(&keys, b"iv", keys.is_key_root()).unwrap();
        assert_eq!(opened, tree);
    }

    #[test]
    fn explicit_key_covers_its_subtree() {
        let cover = SymmetricKey::generate();
        let inner = SymmetricKey::generate();
        let mut keys = KeyTrie::with_cover(cover.clone());
        keys.assign(&path(&["a"]), inner.clone());

        let sealed = sample().encrypt(&keys, b"iv", false).unwrap();
        let a = child(&sealed, "a");
        let x = child(&a, "x");
        let a_iv = child_iv(b"iv", "a");

        let note = |node: &Cid<Folder>| node.artifact().unwrap().note.clone();
        assert_eq!(cover.open(b"iv", &note(&sealed)).unwrap(), b"root");
        assert_eq!(inner.open(&a_iv, &note(&a)).unwrap(), b"a");
        assert_eq!(inner.open(&child_iv(&a_iv, "x"), &note(&x)).unwrap(), b"x");
        assert!(cover.open(&a_iv, &note(&a)).is_err());
    }

    #[test]
    fn encrypt_without_key_fails() {
        let err = sample().encrypt(&KeyTrie::new(), b"iv", false).unwrap_err();
        assert_eq!(err, NodeError::MissingKey(Vec::new()));
    }

    #[test]
    fn encrypt_requires_materialized_tree() {
        let tree = sample();
        let keys = KeyTrie::with_cover(SymmetricKey::generate());
        let err = tree.prune().encrypt(&keys, b"iv", false).unwrap_err();
        assert!(matches!(err, NodeError::NotMaterialized(_)));
    }

    #[test]
    fn decrypt_with_wrong_key_fails() {
        let tree = sample();
        let keys = KeyTrie::with_cover(SymmetricKey::generate());
        let other = KeyTrie::with_cover(SymmetricKey::generate());
        let sealed = tree.encrypt(&keys, b"iv", false).unwrap();
        let err = sealed.decrypt(&other, b"iv", false).unwrap_err();
        assert!(matches!(err, NodeError::Cipher { .. }));
    }
}
