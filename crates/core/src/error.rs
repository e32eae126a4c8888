//! Error types for fallible Opsflow operations.
//!
//! Graph mutations never fail; only catalog parsing, persistence and
//! workflow imports surface errors.

/// Result type for Opsflow operations.
pub type Result<T> = std::result::Result<T, OpsflowError>;

/// Error types that can occur in the Opsflow core.
#[derive(Debug, thiserror::Error)]
pub enum OpsflowError {
    /// Serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem failure while preparing storage.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Persistence backend failure.
    #[error("Storage error: {0}")]
    Storage(#[from] redb::Error),

    /// The node-type catalog is malformed.
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// A workflow references a node type the catalog does not know.
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    /// A workflow document is inconsistent.
    #[error("Invalid workflow: {0}")]
    InvalidWorkflow(String),
}
