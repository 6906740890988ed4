use arbor_node::NodeError;

/// Errors from piece storage and fetching.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Configuration text could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A tree operation failed while persisting or regenerating.
    #[error("tree error: {0}")]
    Node(#[from] NodeError),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
