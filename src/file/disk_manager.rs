use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use ahash::AHashMap;

use super::error::{FileError, FileResult};
use super::{MAX_OPEN_FILES, PAGE_SIZE, PageId};

/// Raw seek origin: absolute start of file
pub const SEEK_SET: i32 = 0;
/// Raw seek origin: current file position
pub const SEEK_CUR: i32 = 1;
/// Raw seek origin: end of file
pub const SEEK_END: i32 = 2;

/// Process-local identifier of an open file.
///
/// Ids are never reused within one `DiskManager`, so an id that has been
/// closed stays invalid even if the same file is opened again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(u32);

impl FileId {
    /// Sentinel returned by lookups that find no open file
    pub const INVALID: FileId = FileId(u32::MAX);

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "<invalid>")
        }
    }
}

/// Origin for byte-range I/O
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Start,
    Current,
    End,
}

impl TryFrom<i32> for Whence {
    type Error = FileError;

    fn try_from(raw: i32) -> FileResult<Self> {
        Self::from_raw("Whence", raw)
    }
}

impl Whence {
    /// Decode a raw seek origin, naming `op` in the error
    pub fn from_raw(op: &'static str, raw: i32) -> FileResult<Self> {
        match raw {
            SEEK_SET => Ok(Whence::Start),
            SEEK_CUR => Ok(Whence::Current),
            SEEK_END => Ok(Whence::End),
            whence => Err(FileError::InvalidWhence { op, whence }),
        }
    }

    fn seek_from(self, op: &'static str, offset: i64) -> FileResult<SeekFrom> {
        match self {
            Whence::Start => u64::try_from(offset)
                .map(SeekFrom::Start)
                .map_err(|_| FileError::InvalidSeekOffset { op, offset }),
            Whence::Current => Ok(SeekFrom::Current(offset)),
            Whence::End => Ok(SeekFrom::End(offset)),
        }
    }
}

struct FileEntry {
    file: File,
    path: PathBuf,
}

/// Sole mediator between the engine and the file system.
///
/// Open files live in a table keyed by a generated [`FileId`]; a second map
/// from path to id answers "is this name open". Both maps are updated
/// together on open and close, and are the only record of which files are
/// open. Paths are used exactly as the caller spelled them.
pub struct DiskManager {
    open_files: AHashMap<FileId, FileEntry>,
    path_to_fid: AHashMap<PathBuf, FileId>,
    next_fid: u32,
    max_open_files: usize,
}

impl DiskManager {
    pub fn new() -> Self {
        Self::with_max_files(MAX_OPEN_FILES)
    }

    pub fn with_max_files(max_open_files: usize) -> Self {
        Self {
            open_files: AHashMap::new(),
            path_to_fid: AHashMap::new(),
            next_fid: 0,
            max_open_files,
        }
    }

    /// Create an empty file. Parent directories are created as needed.
    ///
    /// Any failure other than the file already existing is reported as
    /// [`FileError::FileCreateError`], which is fatal.
    pub fn create_file<P: AsRef<Path>>(&mut self, path: P) -> FileResult<()> {
        let path = path.as_ref();

        if Self::file_exists(path) {
            return Err(FileError::FileAlreadyExists {
                op: "CreateFile",
                path: path.to_path_buf(),
            });
        }

        let create_failed = |source: io::Error| FileError::FileCreateError {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(create_failed)?;
        }

        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(FileError::FileAlreadyExists {
                    op: "CreateFile",
                    path: path.to_path_buf(),
                });
            }
            Err(e) => return Err(create_failed(e)),
        }

        log::debug!("created file {}", path.display());
        Ok(())
    }

    /// Remove a file from the file system.
    ///
    /// The open-file table is not consulted: an id still open on `path`
    /// keeps referring to the unlinked file until it is closed.
    pub fn destroy_file<P: AsRef<Path>>(&mut self, path: P) -> FileResult<()> {
        let path = path.as_ref();

        if !Self::file_exists(path) {
            return Err(FileError::FileNotExists {
                op: "DestroyFile",
                path: path.to_path_buf(),
            });
        }

        fs::remove_file(path).map_err(|source| FileError::FileDeleteError {
            path: path.to_path_buf(),
            source,
        })?;

        log::debug!("destroyed file {}", path.display());
        Ok(())
    }

    /// Open an existing file for reading and writing
    pub fn open_file<P: AsRef<Path>>(&mut self, path: P) -> FileResult<FileId> {
        let path = path.as_ref();

        if !Self::file_exists(path) {
            return Err(FileError::FileNotExists {
                op: "OpenFile",
                path: path.to_path_buf(),
            });
        }

        if self.path_to_fid.contains_key(path) {
            return Err(FileError::FileReopen {
                op: "OpenFile",
                path: path.to_path_buf(),
            });
        }

        if self.open_files.len() >= self.max_open_files {
            return Err(FileError::TooManyOpenFiles(self.max_open_files));
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| FileError::FileNotOpen {
                op: "OpenFile",
                target: format!("{}: {}", path.display(), e),
            })?;

        let fid = FileId(self.next_fid);
        self.next_fid += 1;

        self.open_files.insert(
            fid,
            FileEntry {
                file,
                path: path.to_path_buf(),
            },
        );
        self.path_to_fid.insert(path.to_path_buf(), fid);

        log::debug!("opened {} as fid {}", path.display(), fid);
        Ok(fid)
    }

    /// Close a file; the id is invalid afterwards
    pub fn close_file(&mut self, fid: FileId) -> FileResult<()> {
        let entry = self
            .open_files
            .remove(&fid)
            .ok_or_else(|| FileError::not_open("CloseFile", fid))?;

        self.path_to_fid.remove(&entry.path);
        log::debug!("closed fid {} ({})", fid, entry.path.display());
        // `entry.file` is dropped here, releasing the descriptor
        Ok(())
    }

    /// Read exactly one page. A page that extends past the end of the file
    /// is a [`FileError::PageReadError`]; nothing is zero-filled.
    pub fn read_page(&mut self, fid: FileId, page_id: PageId, buffer: &mut [u8]) -> FileResult<()> {
        Self::check_page_buffer("ReadPage", fid, page_id, buffer.len())?;
        let offset = Self::page_offset("ReadPage", fid, page_id)?;
        let entry = self.entry_mut("ReadPage", fid)?;

        entry
            .file
            .seek(SeekFrom::Start(offset))
            .and_then(|_| entry.file.read_exact(buffer))
            .map_err(|source| FileError::PageReadError {
                fid,
                page_id,
                source,
            })
    }

    /// Write exactly one page, extending the file if needed
    pub fn write_page(&mut self, fid: FileId, page_id: PageId, buffer: &[u8]) -> FileResult<()> {
        Self::check_page_buffer("WritePage", fid, page_id, buffer.len())?;
        let offset = Self::page_offset("WritePage", fid, page_id)?;
        let entry = self.entry_mut("WritePage", fid)?;

        entry
            .file
            .seek(SeekFrom::Start(offset))
            .and_then(|_| entry.file.write_all(buffer))
            .map_err(|source| FileError::PageWriteError {
                fid,
                page_id,
                source,
            })
    }

    /// Read up to `buffer.len()` bytes starting `offset` bytes from `whence`.
    /// Returns the number of bytes read, which is short only at end of file.
    pub fn read_file(
        &mut self,
        fid: FileId,
        buffer: &mut [u8],
        offset: i64,
        whence: Whence,
    ) -> FileResult<usize> {
        let seek = whence.seek_from("ReadFile", offset)?;
        let entry = self.entry_mut("ReadFile", fid)?;
        let io_failed = |source: io::Error| FileError::FileIoError {
            op: "ReadFile",
            fid,
            source,
        };

        entry.file.seek(seek).map_err(io_failed)?;

        let mut filled = 0;
        while filled < buffer.len() {
            match entry.file.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(io_failed(e)),
            }
        }

        Ok(filled)
    }

    /// Write all of `data` at the position named by `whence`
    pub fn write_file(&mut self, fid: FileId, data: &[u8], whence: Whence) -> FileResult<()> {
        let seek = whence.seek_from("WriteFile", 0)?;
        let entry = self.entry_mut("WriteFile", fid)?;

        entry
            .file
            .seek(seek)
            .and_then(|_| entry.file.write_all(data))
            .map_err(|source| FileError::FileIoError {
                op: "WriteFile",
                fid,
                source,
            })
    }

    /// Log persistence belongs to the recovery layer; this is a no-op.
    pub fn write_log<P: AsRef<Path>>(&mut self, log_file: P, log_string: &str) -> FileResult<()> {
        log::trace!(
            "WriteLog({}, {} bytes) ignored",
            log_file.as_ref().display(),
            log_string.len()
        );
        Ok(())
    }

    /// Log persistence belongs to the recovery layer; `log_string` is left untouched.
    pub fn read_log<P: AsRef<Path>>(&mut self, log_file: P, _log_string: &mut String) -> FileResult<()> {
        log::trace!("ReadLog({}) ignored", log_file.as_ref().display());
        Ok(())
    }

    /// Id of the open file named `path`, or [`FileId::INVALID`]
    pub fn get_file_id<P: AsRef<Path>>(&self, path: P) -> FileId {
        self.path_to_fid
            .get(path.as_ref())
            .copied()
            .unwrap_or(FileId::INVALID)
    }

    pub fn get_file_name(&self, fid: FileId) -> FileResult<&Path> {
        self.open_files
            .get(&fid)
            .map(|entry| entry.path.as_path())
            .ok_or_else(|| FileError::not_open("GetFileName", fid))
    }

    /// Probe the file system directly, regardless of the open-file table
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists()
    }

    /// Get the number of pages in a file (a trailing partial page counts)
    pub fn get_page_count(&mut self, fid: FileId) -> FileResult<usize> {
        let entry = self.entry_mut("GetPageCount", fid)?;
        let file_size = entry
            .file
            .metadata()
            .map_err(|source| FileError::FileIoError {
                op: "GetPageCount",
                fid,
                source,
            })?
            .len();
        Ok(file_size.div_ceil(PAGE_SIZE as u64) as usize)
    }

    /// Flush OS buffers of one file to disk
    pub fn sync_file(&mut self, fid: FileId) -> FileResult<()> {
        let entry = self.entry_mut("SyncFile", fid)?;
        entry
            .file
            .sync_data()
            .map_err(|source| FileError::FileIoError {
                op: "SyncFile",
                fid,
                source,
            })
    }

    pub fn sync_all(&mut self) -> FileResult<()> {
        for (&fid, entry) in self.open_files.iter_mut() {
            entry
                .file
                .sync_data()
                .map_err(|source| FileError::FileIoError {
                    op: "SyncAll",
                    fid,
                    source,
                })?;
        }
        Ok(())
    }

    pub fn is_file_open(&self, fid: FileId) -> bool {
        self.open_files.contains_key(&fid)
    }

    pub fn open_file_count(&self) -> usize {
        self.open_files.len()
    }

    fn entry_mut(&mut self, op: &'static str, fid: FileId) -> FileResult<&mut FileEntry> {
        self.open_files
            .get_mut(&fid)
            .ok_or_else(|| FileError::not_open(op, fid))
    }

    fn check_page_buffer(
        op: &'static str,
        fid: FileId,
        page_id: PageId,
        len: usize,
    ) -> FileResult<()> {
        if len != PAGE_SIZE {
            return Err(FileError::InvalidPageSize {
                op,
                fid,
                page_id,
                expected: PAGE_SIZE,
                actual: len,
            });
        }
        Ok(())
    }

    fn page_offset(op: &'static str, fid: FileId, page_id: PageId) -> FileResult<u64> {
        u64::try_from(page_id)
            .ok()
            .and_then(|p| p.checked_mul(PAGE_SIZE as u64))
            .filter(|&offset| offset <= i64::MAX as u64 - PAGE_SIZE as u64)
            .ok_or(FileError::PageOutOfRange { op, fid, page_id })
    }
}

impl Default for DiskManager {
    fn default() -> Self {
        Self::new()
    }
}
