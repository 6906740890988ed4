//! Disclosure selectors.
//!
//! A [`Selector`] is a prefix trie of path segments. As a target set, each
//! terminal marks an exact node of interest. As a mask set, each terminal
//! marks a prefix whose entire subtree is of interest. Parsing a textual
//! query into a selector is left to callers.

use std::collections::BTreeMap;

use arbor_types::{Path, Segment};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selector {
    terminal: bool,
    children: BTreeMap<Segment, Selector>,
}

impl Selector {
    /// The empty selector: selects nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// A selector whose only entry is the empty path (the node it is applied to).
    pub fn here() -> Self {
        Self {
            terminal: true,
            children: BTreeMap::new(),
        }
    }

    pub fn from_paths<I>(paths: I) -> Self
    where
        I: IntoIterator<Item = Path>,
    {
        let mut selector = Self::new();
        for path in paths {
            selector.insert(&path);
        }
        selector
    }

    pub fn insert(&mut self, path: &[Segment]) {
        match path.split_first() {
            None => self.terminal = true,
            Some((head, rest)) => self.children.entry(head.clone()).or_default().insert(rest),
        }
    }

    /// Graft `sub` under `segment`, merging with anything already there.
    pub fn graft(&mut self, segment: impl Into<Segment>, sub: &Selector) {
        self.children.entry(segment.into()).or_default().union(sub);
    }

    pub fn union(&mut self, other: &Selector) {
        self.terminal |= other.terminal;
        for (segment, sub) in &other.children {
            self.children.entry(segment.clone()).or_default().union(sub);
        }
    }

    /// Whether the empty path is selected.
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    pub fn is_empty(&self) -> bool {
        !self.terminal && self.children.is_empty()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn get(&self, segment: &str) -> Option<&Selector> {
        self.children.get(segment)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&Segment, &Selector)> {
        self.children.iter()
    }

    /// Exact membership.
    pub fn contains(&self, path: &[Segment]) -> bool {
        match path.split_first() {
            None => self.terminal,
            Some((head, rest)) => self.children.get(head).is_some_and(|s| s.contains(rest)),
        }
    }

    /// True if some selected path is a prefix of `path`.
    pub fn covers(&self, path: &[Segment]) -> bool {
        if self.terminal {
            return true;
        }
        match path.split_first() {
            None => false,
            Some((head, rest)) => self.children.get(head).is_some_and(|s| s.covers(rest)),
        }
    }

    /// Every selected path, in lexicographic segment order.
    pub fn paths(&self) -> Vec<Path> {
        let mut out = Vec::new();
        self.collect_paths(&mut Vec::new(), &mut out);
        out
    }

    fn collect_paths(&self, prefix: &mut Path, out: &mut Vec<Path>) {
        if self.terminal {
            out.push(prefix.clone());
        }
        for (segment, sub) in &self.children {
            prefix.push(segment.clone());
            sub.collect_paths(prefix, out);
            prefix.pop();
        }
    }
}

/// Whether `path` falls under any active mask prefix.
///
/// A node asks this with an empty path when a mask reaches it: if it is
/// covered, the whole subtree below it is wanted.
pub fn should_mask(masks: &Selector, path: &[Segment]) -> bool {
    masks.covers(path)
}
