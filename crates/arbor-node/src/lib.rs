//! Content-addressed, partially materializable trees for Arbor.
//!
//! A tree is a graph of [`Cid`] references. Each one is a digest that may or
//! may not carry its decoded [`Artifact`]. Missing bodies are tracked in a
//! [`Ledger`] and supplied later through verified capture, so a tree can be
//! cut down to its root digest and regenerated from untrusted storage.
//!
//! # Modules
//!
//! - [`node`]: the `Cid` reference and its capture/prune/merge operations
//! - [`regen`]: the [`Regenerative`] fixed-point engine
//! - [`selector`] / [`scope`]: selective disclosure
//! - [`encryption`]: per-path key assignment

pub mod artifact;
pub mod encryption;
pub mod error;
pub mod ledger;
pub mod node;
pub mod regen;
pub mod scope;
pub mod selector;

#[cfg(test)]
pub(crate) mod testing;

pub use artifact::{Artifact, ContentNode};
pub use encryption::{child_iv, KeyTrie, Sealer};
pub use error::{NodeError, NodeResult};
pub use ledger::Ledger;
pub use node::{Cid, NodeState};
pub use regen::Regenerative;
pub use scope::Scope;
pub use selector::{should_mask, Selector};
