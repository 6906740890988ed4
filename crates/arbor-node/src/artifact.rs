//! Capability traits for content-addressed trees.
//!
//! [`Artifact`] is implemented by every concrete node body (records, radix
//! nodes, leaves). It exposes the body's children as [`ContentNode`] trait
//! objects so the generic machinery in `Cid` can walk heterogeneous trees:
//! a record whose fields are tries of records, for instance.

use std::any::Any;
use std::collections::BTreeMap;

use arbor_types::{child_path, Digest, Segment};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::encryption::{KeyTrie, Sealer};
use crate::error::{NodeError, NodeResult};
use crate::ledger::Ledger;
use crate::scope::Scope;
use crate::selector::Selector;

/// The materialized payload of a content-addressed node.
///
/// The canonical encoding is bincode over the serde representation. Fields
/// of type `Cid<_>` serialize as their digest only, so an encoding commits to
/// its children without containing them.
pub trait Artifact: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Direct children, each named by the path segment that reaches it.
    fn children(&self) -> Vec<(Segment, &dyn ContentNode)>;

    /// Mutable access to the direct children.
    fn children_mut(&mut self) -> Vec<(Segment, &mut dyn ContentNode)>;

    fn child_mut(&mut self, segment: &str) -> Option<&mut dyn ContentNode> {
        self.children_mut()
            .into_iter()
            .find(|(name, _)| name == segment)
            .map(|(_, child)| child)
    }

    fn encode(&self) -> NodeResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| NodeError::Serialization(e.to_string()))
    }

    /// Decode untrusted bytes offered for `digest`.
    ///
    /// Rejects bytes that do not re-encode to themselves and bodies that
    /// fail [`is_well_formed`](Self::is_well_formed).
    fn decode(digest: &Digest, bytes: &[u8]) -> NodeResult<Self> {
        let malformed = |reason: String| NodeError::MalformedArtifact {
            digest: *digest,
            reason,
        };
        let artifact: Self = bincode::deserialize(bytes).map_err(|e| malformed(e.to_string()))?;
        if artifact.encode()? != bytes {
            return Err(malformed("non-canonical encoding".to_string()));
        }
        if !artifact.is_well_formed() {
            return Err(malformed("structural invariant violated".to_string()));
        }
        Ok(artifact)
    }

    /// Structural invariants of this body that hashing cannot express.
    fn is_well_formed(&self) -> bool {
        true
    }

    /// Route a target set to the children it names.
    fn target(&mut self, targets: &Selector, prefix: &[Segment]) -> NodeResult<()> {
        route_by_segment(self, targets, prefix, Route::Target)
    }

    /// Route a mask set to the children it names.
    fn mask(&mut self, masks: &Selector, prefix: &[Segment]) -> NodeResult<()> {
        route_by_segment(self, masks, prefix, Route::Mask)
    }

    /// Combine two partial views of the same body.
    fn merge(&self, other: &Self) -> NodeResult<Self> {
        let mut merged = self.clone();
        let theirs = other.children();
        for (segment, node) in merged.children_mut() {
            if let Some((_, their)) = theirs.iter().find(|(name, _)| *name == segment) {
                node.merge_node(*their)?;
            }
        }
        Ok(merged)
    }

    /// Seal this body's own scalar payload. Children are handled by the caller.
    fn seal_payload(&mut self, _sealer: &Sealer<'_>) -> NodeResult<()> {
        Ok(())
    }

    /// Inverse of [`seal_payload`](Self::seal_payload).
    fn open_payload(&mut self, _sealer: &Sealer<'_>) -> NodeResult<()> {
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Route {
    Target,
    Mask,
}

fn route_by_segment<A: Artifact>(
    artifact: &mut A,
    selector: &Selector,
    prefix: &[Segment],
    route: Route,
) -> NodeResult<()> {
    for (segment, sub) in selector.entries() {
        let path = child_path(prefix, segment);
        let child = artifact
            .child_mut(segment)
            .ok_or_else(|| NodeError::PathNotFound(path.clone()))?;
        match route {
            Route::Target => child.target_node(sub, &path)?,
            Route::Mask => child.mask_node(sub, &path)?,
        }
    }
    Ok(())
}

/// Object-safe view of a `Cid` of any artifact type.
///
/// Methods here mutate in place; the public `Cid` API clones first and so
/// never touches the caller's value.
pub trait ContentNode: Send + Sync {
    fn digest(&self) -> Digest;

    fn is_complete(&self) -> bool;

    fn is_materialized(&self) -> bool;

    fn scope(&self) -> &Scope;

    fn collect_missing(&self, prefix: &[Segment], out: &mut Ledger);

    fn collect_contents(&self, out: &mut BTreeMap<Digest, Vec<u8>>) -> NodeResult<()>;

    /// Verified insertion at `path` below this node. Returns the
    /// obligations the inserted body introduces.
    fn capture_node(
        &mut self,
        digest: &Digest,
        bytes: &[u8],
        path: &[Segment],
        prefix: &[Segment],
    ) -> NodeResult<Ledger>;

    /// Drop any interest held by a stub. Materialized nodes are unaffected.
    fn withdraw(&mut self);

    /// Discard the body, keeping the digest and the completeness flag.
    fn cut(&mut self);

    fn target_node(&mut self, targets: &Selector, prefix: &[Segment]) -> NodeResult<()>;

    fn mask_node(&mut self, masks: &Selector, prefix: &[Segment]) -> NodeResult<()>;

    fn mask_all_node(&mut self);

    /// Recompute digests of every materialized body below and compare.
    fn verify_node(&self) -> bool;

    fn seal_node(
        &mut self,
        keys: &KeyTrie,
        iv: &[u8],
        is_key_root: bool,
        prefix: &[Segment],
    ) -> NodeResult<()>;

    fn open_node(
        &mut self,
        keys: &KeyTrie,
        iv: &[u8],
        is_key_root: bool,
        prefix: &[Segment],
    ) -> NodeResult<()>;

    fn merge_node(&mut self, other: &dyn ContentNode) -> NodeResult<()>;

    fn as_any(&self) -> &dyn Any;
}
