pub mod config;
pub mod executor;
pub mod file;
pub mod index;
pub mod record;

pub use config::{ConfigError, ConfigResult, EngineConfig};
pub use executor::{
    DeleteExecutor, Executor, ExecutorError, ExecutorResult, ExecutorType, FilterExecutor,
    SeqScanExecutor, execute,
};
pub use file::{
    BUFFER_POOL_SIZE, BufferManager, DiskManager, ErrorKind, FileError, FileId, FileResult,
    MAX_OPEN_FILES, PAGE_SIZE, PageId, Whence,
};
pub use index::{IndexError, IndexHandle, IndexRef, IndexResult};
pub use record::{
    Field, FieldType, Record, RecordError, RecordId, RecordResult, RecordSchema, SlottedPage,
    TableHandle, TableRef, Value,
};
