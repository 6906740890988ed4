//! The missing-path ledger.
//!
//! A [`Ledger`] maps every outstanding digest to the root-relative paths
//! that still reference it. It is always derived from a tree (see
//! `Cid::missing`), never maintained independently of one.

use std::collections::BTreeMap;

use arbor_types::{Digest, Path};

/// Outstanding obligations: digest → every path that still needs it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ledger {
    entries: BTreeMap<Digest, Vec<Path>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// A ledger with a single obligation.
    pub fn single(digest: Digest, path: Path) -> Self {
        let mut ledger = Self::new();
        ledger.record(digest, path);
        ledger
    }

    /// Record that `path` needs `digest`. Duplicate paths are ignored.
    pub fn record(&mut self, digest: Digest, path: Path) {
        let paths = self.entries.entry(digest).or_default();
        if !paths.contains(&path) {
            paths.push(path);
        }
    }

    /// Union another ledger into this one.
    pub fn absorb(&mut self, other: Ledger) {
        for (digest, paths) in other.entries {
            for path in paths {
                self.record(digest, path);
            }
        }
    }

    /// Entries of `self` that are not in `before`.
    pub fn since(&self, before: &Ledger) -> Ledger {
        let mut fresh = Ledger::new();
        for (digest, paths) in &self.entries {
            for path in paths {
                let known = before
                    .entries
                    .get(digest)
                    .is_some_and(|old| old.contains(path));
                if !known {
                    fresh.record(*digest, path.clone());
                }
            }
        }
        fresh
    }

    pub fn contains(&self, digest: &Digest) -> bool {
        self.entries.contains_key(digest)
    }

    pub fn paths(&self, digest: &Digest) -> &[Path] {
        self.entries.get(digest).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Outstanding digests in ascending order.
    pub fn digests(&self) -> impl Iterator<Item = &Digest> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Digest, &[Path])> {
        self.entries.iter().map(|(d, p)| (d, p.as_slice()))
    }

    /// Number of distinct outstanding digests.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
