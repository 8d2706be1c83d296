use super::error::{ExecutorError, ExecutorResult};
use crate::record::{Record, RecordSchema, TableRef, lock};

/// Leaf operator yielding every stored record of a table in storage order
pub struct SeqScanExecutor {
    table: TableRef,
    schema: RecordSchema,
    current: Option<Record>,
    initialized: bool,
}

impl SeqScanExecutor {
    pub fn new(table: TableRef) -> Self {
        let schema = lock(&table).schema().clone();
        Self {
            table,
            schema,
            current: None,
            initialized: false,
        }
    }

    /// Position on the first record; may be called again to restart
    pub fn init(&mut self) -> ExecutorResult<()> {
        self.current = lock(&self.table).first_record()?;
        self.initialized = true;
        if self.current.is_none() {
            log::trace!("seq scan over empty table");
        }
        Ok(())
    }

    pub fn next(&mut self) -> ExecutorResult<()> {
        if !self.initialized {
            return Err(ExecutorError::NotInitialized {
                executor: "SeqScanExecutor",
            });
        }

        let Some(rid) = self.current.as_ref().and_then(Record::rid) else {
            self.current = None;
            return Ok(());
        };
        self.current = lock(&self.table).next_record(rid)?;
        Ok(())
    }

    pub fn is_end(&self) -> bool {
        self.current.is_none()
    }

    pub fn record(&self) -> Option<&Record> {
        self.current.as_ref()
    }

    /// Same as the table's schema
    pub fn out_schema(&self) -> &RecordSchema {
        &self.schema
    }
}
