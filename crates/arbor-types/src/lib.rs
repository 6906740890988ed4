//! Foundation types for Arbor.
//!
//! Every other Arbor crate depends on `arbor-types`.
//!
//! # Key Types
//!
//! - [`Digest`] — Content-addressed identifier of a canonical node encoding
//! - [`Segment`] / [`Path`] — Root-relative structural addresses inside a tree

pub mod digest;
pub mod error;
pub mod path;

pub use digest::Digest;
pub use error::TypeError;
pub use path::{child_path, display_path, Path, Segment};
