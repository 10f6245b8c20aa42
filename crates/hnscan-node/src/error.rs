/// Errors surfaced by the command line tool.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Index(#[from] hnscan_indexer::Error),

    #[error("Invalid date {0:?}, expected YYYY-MM-DD or a unix timestamp")]
    InvalidDate(String),

    #[error("Invalid time range: {start} is after {end}")]
    InvalidRange { start: u64, end: u64 },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
