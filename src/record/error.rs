use crate::file::{FileError, PageId};
use thiserror::Error;

use super::record::{RecordId, SlotId};

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("File error: {0}")]
    File(#[from] FileError),

    #[error("Table not open: {0}")]
    TableNotOpen(String),

    #[error("Invalid slot: page_id={0}, slot_id={1}")]
    InvalidSlot(PageId, SlotId),

    #[error("Record not found: {0}")]
    RecordNotFound(RecordId),

    #[error("Record of {0} bytes does not fit in a page")]
    RecordTooLarge(usize),

    #[error("Corrupted page {page_id}: {reason}")]
    CorruptedPage { page_id: PageId, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: String,
        actual: String,
    },
}

pub type RecordResult<T> = Result<T, RecordError>;
