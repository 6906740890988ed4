//! Structural addressing inside a content-addressed tree.
//!
//! A [`Path`] is the sequence of edge names walked from the root to reach a
//! node. Each artifact type decides how its children are named: record
//! fields use their field name, radix children use their first symbol.

/// One edge name in a [`Path`].
pub type Segment = String;

/// A root-relative path: the edge names from the root down to a node.
pub type Path = Vec<Segment>;

/// Extend `prefix` by one segment, returning a new path.
pub fn child_path(prefix: &[Segment], segment: &str) -> Path {
    let mut path = Vec::with_capacity(prefix.len() + 1);
    path.extend_from_slice(prefix);
    path.push(segment.to_string());
    path
}

/// Render a path for logs and error messages (`/a/b/c`, `/` for the root).
pub fn display_path(path: &[Segment]) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    path.iter().fold(String::new(), |mut out, segment| {
        out.push('/');
        out.push_str(segment);
        out
    })
}
