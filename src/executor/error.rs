use thiserror::Error;

use crate::index::IndexError;
use crate::record::{RecordError, RecordId};

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("{executor}: Next() called before Init()")]
    NotInitialized { executor: &'static str },

    #[error("{executor}: Init() is not supported")]
    InitUnsupported { executor: &'static str },

    #[error("{executor}: child produced a record without a record id")]
    MissingRecordId { executor: &'static str },

    /// The table row is gone but an index still references it
    #[error("index {index} is inconsistent after deleting {rid}: {source}")]
    IndexInconsistency {
        index: String,
        rid: RecordId,
        #[source]
        source: IndexError,
    },
}

impl ExecutorError {
    /// Fatal errors are broken invariants; the query cannot be continued
    /// or retried.
    pub fn is_fatal(&self) -> bool {
        match self {
            ExecutorError::NotInitialized { .. }
            | ExecutorError::InitUnsupported { .. }
            | ExecutorError::MissingRecordId { .. }
            | ExecutorError::IndexInconsistency { .. } => true,
            ExecutorError::Record(RecordError::File(e)) => e.is_fatal(),
            ExecutorError::Record(_) | ExecutorError::Index(_) => false,
        }
    }
}

pub type ExecutorResult<T> = Result<T, ExecutorError>;
