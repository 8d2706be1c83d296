use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::error::{RecordError, RecordResult};
use super::page::SlottedPage;
use super::record::{Record, RecordId, SlotId};
use super::schema::RecordSchema;
use crate::file::{BufferManager, FileId, PageId};

/// Table handle shared between the operators of one query
pub type TableRef = Arc<Mutex<TableHandle>>;

/// Heap file of fixed-length records spread over slotted pages.
///
/// Storage order is page ascending, then slot ascending.
pub struct TableHandle {
    name: String,
    path: PathBuf,
    fid: FileId,
    schema: RecordSchema,
    page_count: usize,
    /// Page that received the last insert; searching starts here
    last_insert_page_id: PageId,
    buffer_manager: Arc<Mutex<BufferManager>>,
}

impl TableHandle {
    /// Create a new table file at `path` with one empty page
    pub fn create<P: AsRef<Path>>(
        buffer_manager: Arc<Mutex<BufferManager>>,
        path: P,
        name: &str,
        schema: RecordSchema,
    ) -> RecordResult<Self> {
        let path = path.as_ref();
        let fid = {
            let mut bm = lock(&buffer_manager);
            bm.disk_manager_mut().create_file(path)?;
            let fid = match bm.disk_manager_mut().open_file(path) {
                Ok(fid) => fid,
                Err(e) => {
                    Self::discard_created(&mut bm, None, path);
                    return Err(e.into());
                }
            };

            let formatted = bm
                .new_page(fid, 0)
                .map_err(RecordError::from)
                .and_then(|page| SlottedPage::init(page, schema.record_size()).map(|_| ()));
            if let Err(e) = formatted {
                Self::discard_created(&mut bm, Some(fid), path);
                return Err(e);
            }
            fid
        };

        log::debug!("created table {} at {}", name, path.display());
        Ok(Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            fid,
            schema,
            page_count: 1,
            last_insert_page_id: 0,
            buffer_manager,
        })
    }

    /// Open an existing table file. The stored record width must match
    /// `schema`.
    pub fn open<P: AsRef<Path>>(
        buffer_manager: Arc<Mutex<BufferManager>>,
        path: P,
        name: &str,
        schema: RecordSchema,
    ) -> RecordResult<Self> {
        let path = path.as_ref();
        let (fid, page_count) = {
            let mut bm = lock(&buffer_manager);
            let fid = bm.disk_manager_mut().open_file(path)?;
            let page_count = bm.disk_manager_mut().get_page_count(fid)?;

            let checked = if page_count == 0 {
                let page = bm.new_page(fid, 0)?;
                SlottedPage::init(page, schema.record_size()).map(|_| ())
            } else {
                Self::check_record_size(&mut bm, fid, &schema)
            };
            if let Err(e) = checked {
                bm.close_file(fid)?;
                return Err(e);
            }
            (fid, page_count.max(1))
        };

        log::debug!(
            "opened table {} ({} pages) at {}",
            name,
            page_count,
            path.display()
        );
        Ok(Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            fid,
            schema,
            page_count,
            last_insert_page_id: page_count - 1,
            buffer_manager,
        })
    }

    /// Write back cached pages and release the file
    pub fn close(self) -> RecordResult<()> {
        let mut bm = lock(&self.buffer_manager);
        bm.close_file(self.fid)?;
        log::debug!("closed table {}", self.name);
        Ok(())
    }

    /// Wrap the handle for sharing between executors
    pub fn into_shared(self) -> TableRef {
        Arc::new(Mutex::new(self))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_id(&self) -> FileId {
        self.fid
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn insert_record(&mut self, record: &Record) -> RecordResult<RecordId> {
        let bytes = record.serialize(&self.schema)?;
        let mut bm = lock(&self.buffer_manager);

        // Try the last insert page first, then every page from the start
        let hint = self.last_insert_page_id;
        let candidates =
            std::iter::once(hint).chain((0..self.page_count).filter(move |&p| p != hint));
        for page_id in candidates {
            let buffer = bm.get_page_mut(self.fid, page_id)?;
            let mut page = SlottedPage::open(buffer, page_id)?;
            if page.is_full() {
                continue;
            }
            if let Some(slot_id) = page.insert(&bytes)? {
                self.last_insert_page_id = page_id;
                return Ok(RecordId::new(page_id, slot_id));
            }
        }

        let page_id = self.page_count;
        let buffer = bm.new_page(self.fid, page_id)?;
        let mut page = SlottedPage::init(buffer, self.schema.record_size())?;
        let slot_id = page
            .insert(&bytes)?
            .ok_or(RecordError::RecordTooLarge(bytes.len()))?;
        self.page_count += 1;
        self.last_insert_page_id = page_id;
        log::trace!("table {} grew to {} pages", self.name, self.page_count);

        Ok(RecordId::new(page_id, slot_id))
    }

    pub fn get_record(&self, rid: RecordId) -> RecordResult<Record> {
        self.check_page(rid)?;
        let mut bm = lock(&self.buffer_manager);
        let page = SlottedPage::open(bm.get_page(self.fid, rid.page_id)?, rid.page_id)?;
        let bytes = page.record(rid.slot_id).ok_or(RecordError::RecordNotFound(rid))?;
        Ok(Record::deserialize(bytes, &self.schema)?.at(rid))
    }

    pub fn update_record(&mut self, rid: RecordId, record: &Record) -> RecordResult<()> {
        self.check_page(rid)?;
        let bytes = record.serialize(&self.schema)?;
        let mut bm = lock(&self.buffer_manager);
        let mut page = SlottedPage::open(bm.get_page_mut(self.fid, rid.page_id)?, rid.page_id)?;
        if !page.update(rid.slot_id, &bytes)? {
            return Err(RecordError::RecordNotFound(rid));
        }
        Ok(())
    }

    /// Free the slot holding `rid`; a slot that is already free is an error
    pub fn delete_record(&mut self, rid: RecordId) -> RecordResult<()> {
        self.check_page(rid)?;
        let mut bm = lock(&self.buffer_manager);
        let mut page = SlottedPage::open(bm.get_page_mut(self.fid, rid.page_id)?, rid.page_id)?;
        if !page.remove(rid.slot_id) {
            return Err(RecordError::RecordNotFound(rid));
        }
        Ok(())
    }

    /// First record in storage order
    pub fn first_record(&self) -> RecordResult<Option<Record>> {
        self.seek(0, 0)
    }

    /// The record stored after `rid`. `rid` itself need not still exist,
    /// so a cursor survives deletion of the record it points at.
    pub fn next_record(&self, rid: RecordId) -> RecordResult<Option<Record>> {
        self.seek(rid.page_id, rid.slot_id + 1)
    }

    /// All records in storage order
    pub fn scan(&self) -> RecordResult<Vec<Record>> {
        let mut results = Vec::new();
        let mut current = self.first_record()?;
        while let Some(record) = current {
            current = match record.rid() {
                Some(rid) => self.next_record(rid)?,
                None => None,
            };
            results.push(record);
        }
        Ok(results)
    }

    pub fn record_count(&self) -> RecordResult<usize> {
        let mut bm = lock(&self.buffer_manager);
        let mut count = 0;
        for page_id in 0..self.page_count {
            count += SlottedPage::open(bm.get_page(self.fid, page_id)?, page_id)?.used_slots();
        }
        Ok(count)
    }

    fn seek(&self, mut page_id: PageId, mut slot_id: SlotId) -> RecordResult<Option<Record>> {
        let mut bm = lock(&self.buffer_manager);
        while page_id < self.page_count {
            let page = SlottedPage::open(bm.get_page(self.fid, page_id)?, page_id)?;
            if let Some(found) = page.next_used_slot(slot_id) {
                let rid = RecordId::new(page_id, found);
                let bytes = page.record(found).ok_or(RecordError::RecordNotFound(rid))?;
                return Ok(Some(Record::deserialize(bytes, &self.schema)?.at(rid)));
            }
            page_id += 1;
            slot_id = 0;
        }
        Ok(None)
    }

    /// Undo a half-finished `create`: release the id and remove the file
    fn discard_created(bm: &mut BufferManager, fid: Option<FileId>, path: &Path) {
        if let Some(fid) = fid
            && let Err(e) = bm.close_file(fid)
        {
            log::warn!("cannot close {} after failed create: {}", path.display(), e);
        }
        if let Err(e) = bm.disk_manager_mut().destroy_file(path) {
            log::warn!("cannot remove {} after failed create: {}", path.display(), e);
        }
    }

    fn check_page(&self, rid: RecordId) -> RecordResult<()> {
        if rid.page_id >= self.page_count {
            return Err(RecordError::RecordNotFound(rid));
        }
        Ok(())
    }

    fn check_record_size(
        bm: &mut BufferManager,
        fid: FileId,
        schema: &RecordSchema,
    ) -> RecordResult<()> {
        let page = SlottedPage::open(bm.get_page(fid, 0)?, 0)?;
        if page.record_size() != schema.record_size() {
            return Err(RecordError::SchemaMismatch(format!(
                "table stores {}-byte records, schema describes {} bytes",
                page.record_size(),
                schema.record_size()
            )));
        }
        Ok(())
    }
}

/// A poisoned lock only means another thread panicked mid-operation; the
/// pool itself stays usable.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
