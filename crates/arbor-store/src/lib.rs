//! Piece storage for Arbor trees.
//!
//! A tree's pieces are the canonical encodings of its nodes. This crate
//! stores them by digest and drives the loop that regenerates a tree from
//! its root digest: ask what is missing, fetch it, capture it, repeat.
//!
//! # Storage Backends
//!
//! All backends implement the [`PieceStore`] trait:
//!
//! - [`InMemoryPieceStore`]: `HashMap`-based store for tests and embedding
//!
//! The store is untrusted. Nothing read from it enters a tree without
//! passing digest verification in `capture`.

pub mod config;
pub mod error;
pub mod fetch;
pub mod memory;
pub mod traits;

pub use config::FetchConfig;
pub use error::{StoreError, StoreResult};
pub use fetch::{FetchOutcome, FetchReport, Fetcher};
pub use memory::InMemoryPieceStore;
pub use traits::PieceStore;
