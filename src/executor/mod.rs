//! Pull-based (Volcano) query operators.
//!
//! Every operator follows the same protocol: `init()` once, then read
//! `record()` and call `next()` until `is_end()` is true. Composite
//! operators exclusively own their child and pull from it on demand.
//! Mutating operators (`ExecutorType::Dml`) are not initialized by the
//! driver; their first `next()` performs the whole effect.

mod delete;
mod error;
mod filter;
mod seq_scan;
#[cfg(test)]
mod tests;

pub use delete::DeleteExecutor;
pub use error::{ExecutorError, ExecutorResult};
pub use filter::FilterExecutor;
pub use seq_scan::SeqScanExecutor;

use crate::record::{Record, RecordSchema};

/// Structural role of an operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorType {
    /// Produces records (leaf or pass-through)
    Basic,
    /// Mutates storage and reports an effect count
    Dml,
}

/// A node of an operator tree
pub enum Executor {
    SeqScan(SeqScanExecutor),
    Filter(FilterExecutor),
    Delete(DeleteExecutor),
}

impl Executor {
    pub fn executor_type(&self) -> ExecutorType {
        match self {
            Executor::SeqScan(_) | Executor::Filter(_) => ExecutorType::Basic,
            Executor::Delete(_) => ExecutorType::Dml,
        }
    }

    pub fn init(&mut self) -> ExecutorResult<()> {
        match self {
            Executor::SeqScan(e) => e.init(),
            Executor::Filter(e) => e.init(),
            Executor::Delete(e) => e.init(),
        }
    }

    pub fn next(&mut self) -> ExecutorResult<()> {
        match self {
            Executor::SeqScan(e) => e.next(),
            Executor::Filter(e) => e.next(),
            Executor::Delete(e) => e.next(),
        }
    }

    /// True when `record()` has nothing more to offer; free of side effects
    pub fn is_end(&self) -> bool {
        match self {
            Executor::SeqScan(e) => e.is_end(),
            Executor::Filter(e) => e.is_end(),
            Executor::Delete(e) => e.is_end(),
        }
    }

    /// Record the operator is currently positioned on
    pub fn record(&self) -> Option<&Record> {
        match self {
            Executor::SeqScan(e) => e.record(),
            Executor::Filter(e) => e.record(),
            Executor::Delete(e) => e.record(),
        }
    }

    pub fn out_schema(&self) -> &RecordSchema {
        match self {
            Executor::SeqScan(e) => e.out_schema(),
            Executor::Filter(e) => e.out_schema(),
            Executor::Delete(e) => e.out_schema(),
        }
    }
}

impl From<SeqScanExecutor> for Executor {
    fn from(e: SeqScanExecutor) -> Self {
        Executor::SeqScan(e)
    }
}

impl From<FilterExecutor> for Executor {
    fn from(e: FilterExecutor) -> Self {
        Executor::Filter(e)
    }
}

impl From<DeleteExecutor> for Executor {
    fn from(e: DeleteExecutor) -> Self {
        Executor::Delete(e)
    }
}

/// Drive an operator tree to exhaustion and collect what it produces
pub fn execute(executor: &mut Executor) -> ExecutorResult<Vec<Record>> {
    let mut results = Vec::new();

    match executor.executor_type() {
        ExecutorType::Basic => {
            executor.init()?;
            while !executor.is_end() {
                if let Some(record) = executor.record() {
                    results.push(record.clone());
                }
                executor.next()?;
            }
        }
        ExecutorType::Dml => loop {
            executor.next()?;
            if executor.is_end() {
                break;
            }
            if let Some(record) = executor.record() {
                results.push(record.clone());
            }
        },
    }

    Ok(results)
}
