use super::error::{ExecutorError, ExecutorResult};
use super::Executor;
use crate::record::{Record, RecordSchema};

pub type Predicate = Box<dyn Fn(&Record) -> bool>;

/// Passes through the child's records that satisfy a predicate
pub struct FilterExecutor {
    child: Box<Executor>,
    predicate: Predicate,
    current: Option<Record>,
    initialized: bool,
}

impl FilterExecutor {
    pub fn new(child: impl Into<Executor>, predicate: impl Fn(&Record) -> bool + 'static) -> Self {
        Self {
            child: Box::new(child.into()),
            predicate: Box::new(predicate),
            current: None,
            initialized: false,
        }
    }

    pub fn init(&mut self) -> ExecutorResult<()> {
        self.child.init()?;
        self.initialized = true;
        self.advance()
    }

    pub fn next(&mut self) -> ExecutorResult<()> {
        if !self.initialized {
            return Err(ExecutorError::NotInitialized {
                executor: "FilterExecutor",
            });
        }
        if self.current.is_none() {
            return Ok(());
        }
        self.child.next()?;
        self.advance()
    }

    pub fn is_end(&self) -> bool {
        self.current.is_none()
    }

    pub fn record(&self) -> Option<&Record> {
        self.current.as_ref()
    }

    pub fn out_schema(&self) -> &RecordSchema {
        self.child.out_schema()
    }

    /// Pull from the child until a record matches or the child runs dry
    fn advance(&mut self) -> ExecutorResult<()> {
        while !self.child.is_end() {
            if let Some(record) = self.child.record()
                && (self.predicate)(record)
            {
                self.current = Some(record.clone());
                return Ok(());
            }
            self.child.next()?;
        }
        self.current = None;
        Ok(())
    }
}
