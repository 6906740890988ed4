//! Artifacts used by the unit tests in this crate.

use std::collections::BTreeMap;

use arbor_types::{Digest, Path, Segment};
use serde::{Deserialize, Serialize};

use crate::artifact::{Artifact, ContentNode};
use crate::encryption::Sealer;
use crate::error::NodeResult;
use crate::node::Cid;
use crate::selector::Selector;

/// Routes `tracing` output through the test harness so skipped pieces show up
/// under `--nocapture`.
pub fn trace() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// A named directory: an opaque note plus named sub-folders.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub note: Vec<u8>,
    pub entries: BTreeMap<String, Cid<Folder>>,
}

impl Artifact for Folder {
    fn children(&self) -> Vec<(Segment, &dyn ContentNode)> {
        self.entries
            .iter()
            .map(|(name, child)| (name.clone(), child as &dyn ContentNode))
            .collect()
    }

    fn children_mut(&mut self) -> Vec<(Segment, &mut dyn ContentNode)> {
        self.entries
            .iter_mut()
            .map(|(name, child)| (name.clone(), child as &mut dyn ContentNode))
            .collect()
    }

    fn seal_payload(&mut self, sealer: &Sealer<'_>) -> NodeResult<()> {
        self.note = sealer.seal(&self.note)?;
        Ok(())
    }

    fn open_payload(&mut self, sealer: &Sealer<'_>) -> NodeResult<()> {
        self.note = sealer.open(&self.note)?;
        Ok(())
    }
}

/// A body that claims, once decoded, to contain itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Echo {
    pub inner: Cid<Echo>,
}

impl Artifact for Echo {
    fn children(&self) -> Vec<(Segment, &dyn ContentNode)> {
        vec![("inner".to_string(), &self.inner as &dyn ContentNode)]
    }

    fn children_mut(&mut self) -> Vec<(Segment, &mut dyn ContentNode)> {
        vec![("inner".to_string(), &mut self.inner as &mut dyn ContentNode)]
    }

    fn decode(digest: &Digest, _bytes: &[u8]) -> NodeResult<Self> {
        Ok(Echo {
            inner: Cid::from_digest(*digest),
        })
    }
}

pub fn leaf(note: &str) -> Cid<Folder> {
    folder(note, Vec::new())
}

pub fn folder(note: &str, entries: Vec<(&str, Cid<Folder>)>) -> Cid<Folder> {
    Cid::new(Folder {
        note: note.as_bytes().to_vec(),
        entries: entries
            .into_iter()
            .map(|(name, child)| (name.to_string(), child))
            .collect(),
    })
    .unwrap()
}

/// `root { a { x, y }, b }`
pub fn sample() -> Cid<Folder> {
    folder(
        "root",
        vec![
            ("a", folder("a", vec![("x", leaf("x")), ("y", leaf("y"))])),
            ("b", leaf("b")),
        ],
    )
}

pub fn child(node: &Cid<Folder>, name: &str) -> Cid<Folder> {
    node.artifact().unwrap().entries[name].clone()
}

pub fn body(node: &Cid<Folder>) -> Vec<u8> {
    node.require_artifact().unwrap().encode().unwrap()
}

pub fn path(segments: &[&str]) -> Path {
    segments.iter().map(|s| s.to_string()).collect()
}

pub fn selector(paths: &[&[&str]]) -> Selector {
    Selector::from_paths(paths.iter().map(|p| path(p)))
}
