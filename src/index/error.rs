use thiserror::Error;

use crate::record::{RecordError, RecordId};

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;

/// Errors that can occur during index operations
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Record error: {0}")]
    RecordError(#[from] RecordError),

    #[error("Index {index}: column {column} not found")]
    ColumnNotFound { index: String, column: String },

    #[error("Index {index}: no entry for record {rid}")]
    EntryNotFound { index: String, rid: RecordId },

    #[error("Index {0} has no key columns")]
    EmptyKey(String),
}
