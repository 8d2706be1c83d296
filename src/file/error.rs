use std::io;
use std::path::PathBuf;
use thiserror::Error;

use super::{FileId, PageId};

/// Coarse classification of a [`FileError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    AlreadyOpen,
    NotOpen,
    IoFailure,
    InvalidArgument,
    ResourceExhausted,
    /// No recovery is defined; the current operation chain must stop.
    Fatal,
}

#[derive(Debug, Error)]
pub enum FileError {
    #[error("{op}: file does not exist: {}", path.display())]
    FileNotExists { op: &'static str, path: PathBuf },

    #[error("{op}: file already exists: {}", path.display())]
    FileAlreadyExists { op: &'static str, path: PathBuf },

    #[error("{op}: file is already open: {}", path.display())]
    FileReopen { op: &'static str, path: PathBuf },

    #[error("{op}: file not open: {target}")]
    FileNotOpen { op: &'static str, target: String },

    #[error("ReadPage: fid: {fid}, page_id: {page_id}: {source}")]
    PageReadError {
        fid: FileId,
        page_id: PageId,
        #[source]
        source: io::Error,
    },

    #[error("WritePage: fid: {fid}, page_id: {page_id}: {source}")]
    PageWriteError {
        fid: FileId,
        page_id: PageId,
        #[source]
        source: io::Error,
    },

    #[error("DestroyFile: cannot delete {}: {source}", path.display())]
    FileDeleteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CreateFile: cannot create {}: {source}", path.display())]
    FileCreateError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{op}: fid: {fid}: {source}")]
    FileIoError {
        op: &'static str,
        fid: FileId,
        #[source]
        source: io::Error,
    },

    #[error("{op}: invalid seek origin: {whence}")]
    InvalidWhence { op: &'static str, whence: i32 },

    #[error("{op}: negative offset {offset} from start of file")]
    InvalidSeekOffset { op: &'static str, offset: i64 },

    #[error("{op}: fid: {fid}, page_id: {page_id} is out of addressable range")]
    PageOutOfRange {
        op: &'static str,
        fid: FileId,
        page_id: PageId,
    },

    #[error("{op}: fid: {fid}, page_id: {page_id}: buffer is {actual} bytes, expected {expected}")]
    InvalidPageSize {
        op: &'static str,
        fid: FileId,
        page_id: PageId,
        expected: usize,
        actual: usize,
    },

    #[error("OpenFile: open file limit {0} reached")]
    TooManyOpenFiles(usize),
}

impl FileError {
    pub(crate) fn not_open(op: &'static str, fid: FileId) -> Self {
        FileError::FileNotOpen {
            op,
            target: format!("fid: {}", fid),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FileError::FileNotExists { .. } => ErrorKind::NotFound,
            FileError::FileAlreadyExists { .. } => ErrorKind::AlreadyExists,
            FileError::FileReopen { .. } => ErrorKind::AlreadyOpen,
            FileError::FileNotOpen { .. } => ErrorKind::NotOpen,
            FileError::PageReadError { .. }
            | FileError::PageWriteError { .. }
            | FileError::FileDeleteError { .. }
            | FileError::FileIoError { .. } => ErrorKind::IoFailure,
            FileError::InvalidWhence { .. }
            | FileError::InvalidSeekOffset { .. }
            | FileError::PageOutOfRange { .. }
            | FileError::InvalidPageSize { .. } => ErrorKind::InvalidArgument,
            FileError::TooManyOpenFiles(_) => ErrorKind::ResourceExhausted,
            FileError::FileCreateError { .. } => ErrorKind::Fatal,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Fatal
    }
}

pub type FileResult<T> = Result<T, FileError>;
