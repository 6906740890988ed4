//! The caller-side regeneration loop.
//!
//! Asks a tree what it is missing, reads those pieces from a store, and
//! captures them, one tree level per round, until the tree is complete or
//! the store has nothing more to give.

use arbor_node::{Artifact, Regenerative};
use tracing::{debug, warn};

use crate::config::FetchConfig;
use crate::error::StoreResult;
use crate::traits::PieceStore;

/// Why a regeneration stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Nothing is missing.
    Complete,
    /// A round captured nothing new; the store lacks what is still missing.
    Stalled,
    /// `max_rounds` was reached first.
    RoundLimit,
}

/// Summary of one [`Fetcher::regenerate`] call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchReport {
    pub rounds: usize,
    /// Pieces read from the store.
    pub fetched: usize,
    /// Requests the store could not answer, counted per round.
    pub not_found: usize,
    pub outcome: FetchOutcome,
}

/// Moves pieces between trees and a [`PieceStore`].
pub struct Fetcher<'a, S: PieceStore + ?Sized> {
    store: &'a S,
    config: FetchConfig,
}

impl<'a, S: PieceStore + ?Sized> Fetcher<'a, S> {
    pub fn new(store: &'a S, config: FetchConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Write every materialized body of `tree`. Returns the number written.
    pub fn persist<A: Artifact>(&self, tree: &Regenerative<A>) -> StoreResult<usize> {
        let pieces: Vec<Vec<u8>> = tree.contents()?.into_values().collect();
        let written = self.store.write_batch(&pieces)?.len();
        debug!(root = %tree.root().digest().short_hex(), written, "persisted tree");
        Ok(written)
    }

    /// Fetch and capture until `tree` is complete, stalls, or runs out of
    /// rounds. Pieces are verified by capture, not by the store.
    pub fn regenerate<A: Artifact>(
        &self,
        tree: Regenerative<A>,
    ) -> StoreResult<(Regenerative<A>, FetchReport)> {
        let mut current = tree;
        let mut report = FetchReport {
            rounds: 0,
            fetched: 0,
            not_found: 0,
            outcome: FetchOutcome::Complete,
        };

        loop {
            if current.is_complete() {
                report.outcome = FetchOutcome::Complete;
                break;
            }
            if report.rounds >= self.config.max_rounds {
                warn!(rounds = report.rounds, "fetch round limit reached");
                report.outcome = FetchOutcome::RoundLimit;
                break;
            }

            let wanted: Vec<_> = current.missing_digests().into_iter().collect();
            let mut pieces = Vec::with_capacity(wanted.len());
            for batch in wanted.chunks(self.config.batch_size.max(1)) {
                for (digest, piece) in batch.iter().zip(self.store.read_batch(batch)?) {
                    match piece {
                        Some(bytes) => pieces.push(bytes),
                        None => {
                            debug!(digest = %digest.short_hex(), "piece not in store");
                            report.not_found += 1;
                        }
                    }
                }
            }
            report.rounds += 1;
            report.fetched += pieces.len();

            let next = current.capture(&pieces)?;
            let progressed = next.key_paths() != current.key_paths();
            current = next;
            debug!(
                round = report.rounds,
                fetched = pieces.len(),
                outstanding = current.key_paths().len(),
                "fetch round finished"
            );
            if !progressed {
                report.outcome = FetchOutcome::Stalled;
                break;
            }
        }
        Ok((current, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryPieceStore;
    use arbor_node::Selector;
    use arbor_radix::{MerkleDictionary, RadixNode, Trie};

    fn catalog() -> Regenerative<RadixNode<String>> {
        let dict = MerkleDictionary::from_entries([
            ("apple", "red".to_string()),
            ("apricot", "orange".to_string()),
            ("banana", "yellow".to_string()),
            ("blueberry", "blue".to_string()),
            ("cherry", "dark red".to_string()),
        ])
        .unwrap();
        Regenerative::new(dict.into_root())
    }

    fn stored(tree: &Regenerative<RadixNode<String>>) -> InMemoryPieceStore {
        let store = InMemoryPieceStore::new();
        Fetcher::new(&store, FetchConfig::default()).persist(tree).unwrap();
        store
    }

    #[test]
    fn persist_writes_every_body() {
        let tree = catalog();
        let store = stored(&tree);
        assert_eq!(store.len(), tree.contents().unwrap().len());
    }

    #[test]
    fn regenerate_from_root_digest() {
        let tree = catalog();
        let store = stored(&tree);
        let fetcher = Fetcher::new(&store, FetchConfig { batch_size: 2, ..FetchConfig::default() });

        let (out, report) = fetcher.regenerate(tree.cutting_all_nodes()).unwrap();
        assert_eq!(report.outcome, FetchOutcome::Complete);
        assert_eq!(report.fetched, store.len());
        assert_eq!(report.not_found, 0);
        assert_eq!(out, tree);
    }

    #[test]
    fn missing_piece_stalls() {
        let tree = catalog();
        let store = stored(&tree);
        let banana = tree.root().node_path("banana").unwrap();
        let mut walk = tree.root().clone();
        for segment in &banana {
            let first = segment.chars().next().unwrap();
            walk = walk.artifact().unwrap().branches()[&first].clone();
        }
        store.delete(&walk.digest()).unwrap();

        let fetcher = Fetcher::new(&store, FetchConfig::default());
        let (out, report) = fetcher.regenerate(tree.cutting_all_nodes()).unwrap();
        assert_eq!(report.outcome, FetchOutcome::Stalled);
        // Requested once alongside its siblings, then once more alone.
        assert_eq!(report.not_found, 2);
        assert_eq!(out.missing_digests().into_iter().collect::<Vec<_>>(), vec![walk.digest()]);
        assert!(out.root().get("banana").is_err());
        assert_eq!(out.root().get("apple").unwrap().map(String::as_str), Some("red"));
    }

    #[test]
    fn round_limit_stops_early() {
        let tree = catalog();
        let store = stored(&tree);
        let fetcher = Fetcher::new(&store, FetchConfig { max_rounds: 1, ..FetchConfig::default() });
        let (out, report) = fetcher.regenerate(tree.cutting_all_nodes()).unwrap();
        assert_eq!(report.outcome, FetchOutcome::RoundLimit);
        assert_eq!(report.rounds, 1);
        assert!(!out.is_complete());
    }

    #[test]
    fn masked_regeneration_reads_less() {
        let tree = catalog();
        let store = stored(&tree);
        let masked = tree
            .mask(&Selector::from_paths([vec!["b".to_string()]]))
            .unwrap()
            .cutting_all_nodes();

        let fetcher = Fetcher::new(&store, FetchConfig::default());
        let (out, report) = fetcher.regenerate(masked).unwrap();
        assert_eq!(report.outcome, FetchOutcome::Complete);
        assert!(report.fetched < store.len());
        assert_eq!(out.root().keys(), vec!["banana", "blueberry"]);
    }

    #[test]
    fn complete_tree_needs_no_rounds() {
        let tree = catalog();
        let store = InMemoryPieceStore::new();
        let (_, report) = Fetcher::new(&store, FetchConfig::default()).regenerate(tree).unwrap();
        assert_eq!(report.rounds, 0);
        assert_eq!(report.outcome, FetchOutcome::Complete);
    }
}
