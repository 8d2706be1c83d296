use lru::LruCache;
use std::num::NonZeroUsize;

use super::disk_manager::{DiskManager, FileId};
use super::error::FileResult;
use super::{BUFFER_POOL_SIZE, PAGE_SIZE, PageId};

/// A key identifying a page in the buffer pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct BufferKey {
    fid: FileId,
    page_id: PageId,
}

struct BufferEntry {
    data: Vec<u8>,
    dirty: bool,
}

/// Page-acquisition service over a [`DiskManager`].
///
/// Pages are cached in an LRU pool; dirty pages are written back when they
/// are evicted, flushed, or when the manager is dropped.
pub struct BufferManager {
    disk_manager: DiskManager,
    buffer_pool: LruCache<BufferKey, BufferEntry>,
    /// Buffer recycled from the last eviction
    spare: Vec<u8>,
}

impl BufferManager {
    pub fn new(disk_manager: DiskManager) -> Self {
        Self::with_capacity(disk_manager, BUFFER_POOL_SIZE)
    }

    /// A zero `capacity` is treated as one page
    pub fn with_capacity(disk_manager: DiskManager, capacity: usize) -> Self {
        Self {
            disk_manager,
            buffer_pool: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
            spare: Vec::new(),
        }
    }

    pub fn disk_manager(&self) -> &DiskManager {
        &self.disk_manager
    }

    pub fn disk_manager_mut(&mut self) -> &mut DiskManager {
        &mut self.disk_manager
    }

    /// Get a page, loading it from disk if necessary
    pub fn get_page(&mut self, fid: FileId, page_id: PageId) -> FileResult<&[u8]> {
        let entry = self.fetch(fid, page_id)?;
        Ok(&entry.data)
    }

    /// Get a page for modification; the page is marked dirty
    pub fn get_page_mut(&mut self, fid: FileId, page_id: PageId) -> FileResult<&mut [u8]> {
        let entry = self.fetch(fid, page_id)?;
        entry.dirty = true;
        Ok(&mut entry.data)
    }

    /// Materialize a zero-filled page that does not exist on disk yet.
    /// It reaches the file the first time it is written back.
    pub fn new_page(&mut self, fid: FileId, page_id: PageId) -> FileResult<&mut [u8]> {
        let key = BufferKey { fid, page_id };

        if !self.buffer_pool.contains(&key) {
            self.make_room()?;
            let mut data = std::mem::take(&mut self.spare);
            data.clear();
            data.resize(PAGE_SIZE, 0);
            self.buffer_pool.put(key, BufferEntry { data, dirty: true });
        }

        let entry = self.cached(key)?;
        entry.data.fill(0);
        entry.dirty = true;
        Ok(&mut entry.data)
    }

    /// Flush a specific page to disk if it's dirty
    pub fn flush_page(&mut self, fid: FileId, page_id: PageId) -> FileResult<()> {
        let key = BufferKey { fid, page_id };

        if let Some(entry) = self.buffer_pool.peek_mut(&key)
            && entry.dirty
        {
            self.disk_manager.write_page(fid, page_id, &entry.data)?;
            entry.dirty = false;
        }

        Ok(())
    }

    /// Flush every dirty page of one file, then sync it
    pub fn flush_file(&mut self, fid: FileId) -> FileResult<()> {
        self.flush_matching(|key| key.fid == fid)?;
        self.disk_manager.sync_file(fid)
    }

    /// Flush all dirty pages to disk. Every page is attempted even if an
    /// earlier one fails; the first error is returned.
    pub fn flush_all(&mut self) -> FileResult<()> {
        let flushed = self.flush_matching(|_| true);
        let synced = self.disk_manager.sync_all();
        flushed.and(synced)
    }

    /// Flush and drop every cached page of one file. Must run before the
    /// file is closed, since a closed id can no longer be written.
    pub fn evict_file(&mut self, fid: FileId) -> FileResult<()> {
        self.flush_matching(|key| key.fid == fid)?;

        let keys: Vec<BufferKey> = self
            .buffer_pool
            .iter()
            .map(|(key, _)| *key)
            .filter(|key| key.fid == fid)
            .collect();
        for key in keys {
            self.buffer_pool.pop(&key);
        }

        Ok(())
    }

    /// Write back and drop the file's pages, then close it
    pub fn close_file(&mut self, fid: FileId) -> FileResult<()> {
        self.evict_file(fid)?;
        self.disk_manager.close_file(fid)
    }

    pub fn buffer_pool_size(&self) -> usize {
        self.buffer_pool.len()
    }

    pub fn is_page_cached(&self, fid: FileId, page_id: PageId) -> bool {
        self.buffer_pool.contains(&BufferKey { fid, page_id })
    }

    pub fn dirty_page_count(&self) -> usize {
        self.buffer_pool.iter().filter(|(_, e)| e.dirty).count()
    }

    fn fetch(&mut self, fid: FileId, page_id: PageId) -> FileResult<&mut BufferEntry> {
        let key = BufferKey { fid, page_id };

        if !self.buffer_pool.contains(&key) {
            self.load_page(key)?;
        }

        self.cached(key)
    }

    fn cached(&mut self, key: BufferKey) -> FileResult<&mut BufferEntry> {
        // `get_mut` also promotes the page to most recently used
        self.buffer_pool
            .get_mut(&key)
            .ok_or_else(|| super::FileError::not_open("BufferManager", key.fid))
    }

    fn load_page(&mut self, key: BufferKey) -> FileResult<()> {
        self.make_room()?;

        let mut data = std::mem::take(&mut self.spare);
        data.resize(PAGE_SIZE, 0);

        if let Err(e) = self.disk_manager.read_page(key.fid, key.page_id, &mut data) {
            self.spare = data;
            return Err(e);
        }

        self.buffer_pool.put(key, BufferEntry { data, dirty: false });
        Ok(())
    }

    /// Evict least recently used pages until one more fits
    fn make_room(&mut self) -> FileResult<()> {
        while self.buffer_pool.len() >= self.buffer_pool.cap().get() {
            let Some((key, entry)) = self.buffer_pool.pop_lru() else {
                break;
            };
            if entry.dirty {
                log::trace!("evicting dirty page {}:{}", key.fid, key.page_id);
                if let Err(e) = self.disk_manager.write_page(key.fid, key.page_id, &entry.data) {
                    // keep the page so its contents are not lost
                    self.buffer_pool.push(key, entry);
                    return Err(e);
                }
            }
            self.spare = entry.data;
        }
        Ok(())
    }

    fn flush_matching(&mut self, mut pred: impl FnMut(&BufferKey) -> bool) -> FileResult<()> {
        let dirty_pages: Vec<BufferKey> = self
            .buffer_pool
            .iter()
            .filter(|(key, entry)| entry.dirty && pred(key))
            .map(|(key, _)| *key)
            .collect();

        let mut first_error = None;
        for key in dirty_pages {
            if let Err(e) = self.flush_page(key.fid, key.page_id) {
                log::warn!("cannot flush page {}:{}: {}", key.fid, key.page_id, e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for BufferManager {
    fn drop(&mut self) {
        if let Err(e) = self.flush_all() {
            log::warn!("failed to flush buffer pool on drop: {}", e);
        }
    }
}
