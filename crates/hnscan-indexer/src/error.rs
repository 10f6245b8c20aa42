//! Error types for the index.

use hnscan_primitives::{ChainError, Height, Network, OutPoint};

/// Errors that can occur while maintaining or querying the index.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// RocksDB error.
    #[error("RocksDB error: {0}")]
    Rocksdb(#[from] rocksdb::Error),

    /// The store was created for another network.
    #[error("Network mismatch: index is configured for {expected}, store holds magic {found:#010x}")]
    NetworkMismatch { expected: Network, found: u32 },

    /// The store was written with an incompatible layout.
    #[error("Unsupported index version {found}, expected {expected}")]
    VersionMismatch { expected: u32, found: u32 },

    /// A stored record is malformed.
    #[error("Failed to decode {what}: {reason}")]
    Decode { what: &'static str, reason: String },

    /// A record the operation depends on does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A previous output of a connected block is missing from the supplied view.
    #[error("Previous output {0} is missing from the coin view")]
    InconsistentView(OutPoint),

    /// Chain state arithmetic left its domain.
    #[error("Chain state accounting error: {0}")]
    Accounting(String),

    /// A block event does not extend or rewind the indexed tip.
    #[error("Block #{height} does not fit the indexed tip {tip:?}")]
    NonContiguous { height: Height, tip: Option<Height> },

    /// The ledger node failed to serve a request.
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type for index operations.
pub type Result<T> = std::result::Result<T, Error>;
