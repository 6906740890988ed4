//! The regeneration engine.
//!
//! [`Regenerative`] pairs a root [`Cid`] with the ledger of digests it still
//! needs. Callers loop: read [`missing_digests`](Regenerative::missing_digests),
//! fetch bodies for some of them from wherever they live, hand the bytes to
//! [`capture`](Regenerative::capture), repeat.

use std::collections::{BTreeMap, BTreeSet};

use arbor_crypto::ContentHasher;
use arbor_types::Digest;
use tracing::{debug, warn};

use crate::artifact::{Artifact, ContentNode};
use crate::encryption::KeyTrie;
use crate::error::{NodeError, NodeResult};
use crate::ledger::Ledger;
use crate::node::Cid;
use crate::selector::Selector;

/// A root node plus its outstanding obligations.
///
/// The ledger is recomputed from the root whenever the root changes, so the
/// two can never drift apart.
#[derive(Clone, Debug, PartialEq)]
pub struct Regenerative<A> {
    root: Cid<A>,
    key_paths: Ledger,
}

impl<A: Artifact> Regenerative<A> {
    pub fn new(root: Cid<A>) -> Self {
        let key_paths = root.missing();
        Self { root, key_paths }
    }

    /// Start from nothing but a trusted root digest.
    pub fn from_digest(digest: Digest) -> Self {
        Self::new(Cid::from_digest(digest))
    }

    /// Rebuild from the wire form produced by [`pieces`](Self::pieces).
    pub fn from_pieces<B: AsRef<[u8]>>(pieces: &[B]) -> NodeResult<Self> {
        let (first, rest) = pieces
            .split_first()
            .ok_or_else(|| NodeError::Serialization("empty piece list".to_string()))?;
        let root = Digest::from_slice(first.as_ref())
            .map_err(|e| NodeError::Serialization(format!("root digest: {e}")))?;
        Self::from_digest(root).capture(rest)
    }

    pub fn root(&self) -> &Cid<A> {
        &self.root
    }

    pub fn key_paths(&self) -> &Ledger {
        &self.key_paths
    }

    pub fn missing_digests(&self) -> BTreeSet<Digest> {
        self.key_paths.digests().copied().collect()
    }

    pub fn is_complete(&self) -> bool {
        self.root.is_complete()
    }

    /// Insert every supplied piece that some outstanding digest asks for,
    /// repeating until a round makes no insertion.
    ///
    /// Pieces nobody asked for are ignored, and an insertion that fails
    /// validation is skipped. Only a self-referential insertion aborts the
    /// whole call.
    pub fn capture<B: AsRef<[u8]>>(&self, pieces: &[B]) -> NodeResult<Self> {
        let supplied: BTreeMap<Digest, &[u8]> = pieces
            .iter()
            .map(|piece| (ContentHasher::NODE.hash(piece.as_ref()), piece.as_ref()))
            .collect();

        let mut root = self.root.clone();
        let mut pending = self.key_paths.clone();
        let mut total = 0usize;
        let mut round = 0usize;

        loop {
            let mut discovered = Ledger::new();
            let mut inserted = 0usize;
            for (digest, paths) in pending.iter() {
                let Some(bytes) = supplied.get(digest) else {
                    continue;
                };
                for path in paths {
                    match root.capture_node(digest, bytes, path, &[]) {
                        Ok(fresh) => {
                            discovered.absorb(fresh);
                            inserted += 1;
                        }
                        Err(err @ NodeError::SelfReferentialInsertion(_)) => {
                            warn!(digest = %digest.short_hex(), "rejecting self-referential piece");
                            return Err(err);
                        }
                        Err(err) => {
                            debug!(
                                digest = %digest.short_hex(),
                                path = ?path,
                                %err,
                                "skipping insertion"
                            );
                        }
                    }
                }
            }
            round += 1;
            total += inserted;
            debug!(round, inserted, outstanding = discovered.len(), "capture round finished");
            if inserted == 0 {
                break;
            }
            pending = discovered;
        }

        if total == 0 {
            return Ok(self.clone());
        }
        Ok(Self::new(root))
    }

    /// The root digest followed by every materialized body, in digest order.
    pub fn pieces(&self) -> NodeResult<Vec<Vec<u8>>> {
        let mut out = vec![self.root.digest().as_bytes().to_vec()];
        out.extend(self.root.contents()?.into_values());
        Ok(out)
    }

    /// Every materialized body keyed by digest.
    pub fn contents(&self) -> NodeResult<BTreeMap<Digest, Vec<u8>>> {
        self.root.contents()
    }

    /// Replace the root with a stub of itself. Its disclosure scope survives,
    /// so a targeted tree regenerates only what it declared.
    pub fn cutting_all_nodes(&self) -> Self {
        Self::new(self.root.stub())
    }

    pub fn target(&self, targets: &Selector) -> NodeResult<Self> {
        let (root, _) = self.root.target(targets)?;
        Ok(Self::new(root))
    }

    pub fn mask(&self, masks: &Selector) -> NodeResult<Self> {
        let (root, _) = self.root.mask(masks)?;
        Ok(Self::new(root))
    }

    pub fn mask_all(&self) -> Self {
        let (root, _) = self.root.mask_all();
        Self::new(root)
    }

    pub fn encrypt(&self, keys: &KeyTrie, common_iv: &[u8]) -> NodeResult<Self> {
        Ok(Self::new(self.root.encrypt(keys, common_iv, keys.is_key_root())?))
    }

    pub fn decrypt(&self, keys: &KeyTrie, common_iv: &[u8]) -> NodeResult<Self> {
        Ok(Self::new(self.root.decrypt(keys, common_iv, keys.is_key_root())?))
    }

    pub fn computed_validity(&self) -> bool {
        self.root.computed_validity()
    }
}
