use super::error::{ExecutorError, ExecutorResult};
use super::Executor;
use crate::index::IndexRef;
use crate::record::{Field, FieldType, Record, RecordSchema, TableRef, Value, lock};

/// Name of the single output field
pub const DELETED_FIELD: &str = "deleted";

enum DeleteState {
    Pending,
    Produced(Record),
    Done,
}

/// Removes every record its child produces from the table and from all
/// of the table's indexes, then reports how many rows went away.
pub struct DeleteExecutor {
    child: Box<Executor>,
    table: TableRef,
    indexes: Vec<IndexRef>,
    out_schema: RecordSchema,
    state: DeleteState,
}

impl DeleteExecutor {
    pub fn new(child: impl Into<Executor>, table: TableRef, indexes: Vec<IndexRef>) -> Self {
        Self {
            child: Box::new(child.into()),
            table,
            indexes,
            out_schema: RecordSchema::new(vec![Field::new(DELETED_FIELD, FieldType::Int)]),
            state: DeleteState::Pending,
        }
    }

    /// A delete cannot be re-run from scratch
    pub fn init(&mut self) -> ExecutorResult<()> {
        Err(ExecutorError::InitUnsupported {
            executor: "DeleteExecutor",
        })
    }

    /// The first call performs every deletion and exposes the count record;
    /// the second ends the stream.
    pub fn next(&mut self) -> ExecutorResult<()> {
        self.state = match std::mem::replace(&mut self.state, DeleteState::Done) {
            DeleteState::Pending => {
                let deleted = self.delete_all()?;
                let count = i32::try_from(deleted).unwrap_or(i32::MAX);
                DeleteState::Produced(Record::new(vec![Value::Int(count)]))
            }
            DeleteState::Produced(_) | DeleteState::Done => DeleteState::Done,
        };
        Ok(())
    }

    pub fn is_end(&self) -> bool {
        matches!(self.state, DeleteState::Done)
    }

    pub fn record(&self) -> Option<&Record> {
        match &self.state {
            DeleteState::Produced(record) => Some(record),
            _ => None,
        }
    }

    pub fn out_schema(&self) -> &RecordSchema {
        &self.out_schema
    }

    fn delete_all(&mut self) -> ExecutorResult<usize> {
        let mut deleted = 0;

        self.child.init()?;
        while !self.child.is_end() {
            if let Some(record) = self.child.record() {
                self.delete_one(record)?;
                deleted += 1;
            }
            self.child.next()?;
        }

        log::debug!("deleted {} records from {}", deleted, lock(&self.table).name());
        Ok(deleted)
    }

    fn delete_one(&self, record: &Record) -> ExecutorResult<()> {
        let rid = record.rid().ok_or(ExecutorError::MissingRecordId {
            executor: "DeleteExecutor",
        })?;

        lock(&self.table).delete_record(rid)?;

        for index in &self.indexes {
            let mut index = lock(index);
            let key = index.key_of(record);
            index
                .delete_entry(&key, rid)
                .map_err(|source| ExecutorError::IndexInconsistency {
                    index: index.name().to_string(),
                    rid,
                    source,
                })?;
        }

        Ok(())
    }
}
