mod buffer_manager;
mod disk_manager;
mod error;

pub use buffer_manager::BufferManager;
pub use disk_manager::{DiskManager, FileId, SEEK_CUR, SEEK_END, SEEK_SET, Whence};
pub use error::{ErrorKind, FileError, FileResult};

/// Page size in bytes (8KB)
pub const PAGE_SIZE: usize = 8192;

/// Default number of pages in the buffer pool
pub const BUFFER_POOL_SIZE: usize = 1024;

/// Default limit on simultaneously open files
pub const MAX_OPEN_FILES: usize = 128;

/// Page ID type
pub type PageId = usize;
