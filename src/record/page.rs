use super::error::{RecordError, RecordResult};
use super::record::SlotId;
use crate::file::{PAGE_SIZE, PageId};

const PAGE_MAGIC: u32 = 0x5044_4250; // "PBDP"
const HEADER_SIZE: usize = 16;

/// Fixed-length slotted page layout:
///
/// ```text
/// [magic u32][record_size u16][slot_count u16][used_slots u16][pad 6]
/// [slot bitmap, ceil(slot_count / 8) bytes]
/// [slot_count * record_size bytes of records]
/// ```
///
/// `B` is the page buffer; read methods need `AsRef<[u8]>`, mutating ones
/// also need `AsMut<[u8]>`, so the same view works over `&[u8]` from
/// `get_page` and `&mut [u8]` from `get_page_mut`.
pub struct SlottedPage<B> {
    buffer: B,
    record_size: usize,
    slot_count: usize,
    used_slots: usize,
}

impl<B> SlottedPage<B> {
    /// Number of records of `record_size` bytes that fit in one page
    pub fn capacity_for(record_size: usize) -> usize {
        if record_size == 0 || record_size > u16::MAX as usize {
            return 0;
        }
        let available = PAGE_SIZE - HEADER_SIZE;
        // slot_count * record_size + ceil(slot_count / 8) <= available
        let slots = (available * 8) / (record_size * 8 + 1);
        slots.min(u16::MAX as usize)
    }

    pub fn record_size(&self) -> usize {
        self.record_size
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    pub fn used_slots(&self) -> usize {
        self.used_slots
    }

    pub fn is_full(&self) -> bool {
        self.used_slots == self.slot_count
    }

    pub fn is_empty(&self) -> bool {
        self.used_slots == 0
    }

    fn bitmap_len(&self) -> usize {
        self.slot_count.div_ceil(8)
    }

    fn record_range(&self, slot_id: SlotId) -> std::ops::Range<usize> {
        let start = HEADER_SIZE + self.bitmap_len() + slot_id * self.record_size;
        start..start + self.record_size
    }
}

impl<B: AsRef<[u8]>> SlottedPage<B> {
    /// Interpret an existing page buffer
    pub fn open(buffer: B, page_id: PageId) -> RecordResult<Self> {
        let corrupted = |reason: &str| RecordError::CorruptedPage {
            page_id,
            reason: reason.to_string(),
        };

        let bytes = buffer.as_ref();
        if bytes.len() != PAGE_SIZE {
            return Err(corrupted("buffer is not one page long"));
        }
        if read_u32(bytes, 0) != PAGE_MAGIC {
            return Err(corrupted("bad magic"));
        }

        let record_size = read_u16(bytes, 4) as usize;
        let slot_count = read_u16(bytes, 6) as usize;
        let used_slots = read_u16(bytes, 8) as usize;

        if slot_count > Self::capacity_for(record_size) || used_slots > slot_count {
            return Err(corrupted("slot layout exceeds page size"));
        }

        Ok(Self {
            buffer,
            record_size,
            slot_count,
            used_slots,
        })
    }

    pub fn is_slot_used(&self, slot_id: SlotId) -> bool {
        if slot_id >= self.slot_count {
            return false;
        }
        let byte = self.buffer.as_ref()[HEADER_SIZE + slot_id / 8];
        byte & (1 << (slot_id % 8)) != 0
    }

    /// First used slot at or after `from`
    pub fn next_used_slot(&self, from: SlotId) -> Option<SlotId> {
        (from..self.slot_count).find(|&slot_id| self.is_slot_used(slot_id))
    }

    pub fn record(&self, slot_id: SlotId) -> Option<&[u8]> {
        if !self.is_slot_used(slot_id) {
            return None;
        }
        Some(&self.buffer.as_ref()[self.record_range(slot_id)])
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> SlottedPage<B> {
    /// Format `buffer` as an empty page for records of `record_size` bytes
    pub fn init(mut buffer: B, record_size: usize) -> RecordResult<Self> {
        let slot_count = Self::capacity_for(record_size);
        if slot_count == 0 {
            return Err(RecordError::RecordTooLarge(record_size));
        }

        let bytes = buffer.as_mut();
        bytes.fill(0);
        bytes[0..4].copy_from_slice(&PAGE_MAGIC.to_le_bytes());
        bytes[4..6].copy_from_slice(&(record_size as u16).to_le_bytes());
        bytes[6..8].copy_from_slice(&(slot_count as u16).to_le_bytes());

        Ok(Self {
            buffer,
            record_size,
            slot_count,
            used_slots: 0,
        })
    }

    /// Store `data` in the first free slot; `None` when the page is full
    pub fn insert(&mut self, data: &[u8]) -> RecordResult<Option<SlotId>> {
        self.check_len(data)?;
        let Some(slot_id) = (0..self.slot_count).find(|&s| !self.is_slot_used(s)) else {
            return Ok(None);
        };

        let range = self.record_range(slot_id);
        self.buffer.as_mut()[range].copy_from_slice(data);
        self.set_used(slot_id, true);
        Ok(Some(slot_id))
    }

    /// Overwrite the record in a used slot
    pub fn update(&mut self, slot_id: SlotId, data: &[u8]) -> RecordResult<bool> {
        self.check_len(data)?;
        if !self.is_slot_used(slot_id) {
            return Ok(false);
        }
        let range = self.record_range(slot_id);
        self.buffer.as_mut()[range].copy_from_slice(data);
        Ok(true)
    }

    /// Free a used slot; returns false if it was already free
    pub fn remove(&mut self, slot_id: SlotId) -> bool {
        if !self.is_slot_used(slot_id) {
            return false;
        }
        self.set_used(slot_id, false);
        true
    }

    fn check_len(&self, data: &[u8]) -> RecordResult<()> {
        if data.len() != self.record_size {
            return Err(RecordError::Serialization(format!(
                "Record size mismatch: expected {}, got {}",
                self.record_size,
                data.len()
            )));
        }
        Ok(())
    }

    fn set_used(&mut self, slot_id: SlotId, used: bool) {
        let bytes = self.buffer.as_mut();
        let mask = 1u8 << (slot_id % 8);
        if used {
            bytes[HEADER_SIZE + slot_id / 8] |= mask;
            self.used_slots += 1;
        } else {
            bytes[HEADER_SIZE + slot_id / 8] &= !mask;
            self.used_slots -= 1;
        }
        bytes[8..10].copy_from_slice(&(self.used_slots as u16).to_le_bytes());
    }
}

fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    type Page<'a> = SlottedPage<&'a mut [u8]>;

    #[test]
    fn test_capacity_for() {
        let slots = Page::capacity_for(23);
        assert!(slots > 300 && slots < 400);
        assert!(slots * 23 + slots.div_ceil(8) <= PAGE_SIZE - HEADER_SIZE);

        assert!(Page::capacity_for(10) > 700);
        assert_eq!(Page::capacity_for(0), 0);
        assert_eq!(Page::capacity_for(PAGE_SIZE), 0);
    }

    #[test]
    fn test_init_and_reopen() {
        let mut buffer = vec![0xffu8; PAGE_SIZE];
        {
            let mut page = Page::init(&mut buffer, 10).unwrap();
            assert!(page.is_empty());
            assert_eq!(page.insert(&[1; 10]).unwrap(), Some(0));
            assert_eq!(page.insert(&[2; 10]).unwrap(), Some(1));
            assert!(page.remove(0));
        }

        let page = SlottedPage::open(&buffer[..], 0).unwrap();
        assert_eq!(page.record_size(), 10);
        assert_eq!(page.used_slots(), 1);
        assert!(!page.is_slot_used(0));
        assert_eq!(page.record(1), Some(&[2u8; 10][..]));
        assert_eq!(page.next_used_slot(0), Some(1));
        assert_eq!(page.next_used_slot(2), None);
    }

    #[test]
    fn test_open_rejects_unformatted_page() {
        let buffer = vec![0u8; PAGE_SIZE];
        let result = SlottedPage::open(&buffer[..], 4);
        assert!(matches!(
            result,
            Err(RecordError::CorruptedPage { page_id: 4, .. })
        ));
    }

    #[test]
    fn test_insert_reuses_freed_slot() {
        let mut buffer = vec![0u8; PAGE_SIZE];
        let mut page = Page::init(&mut buffer, 8).unwrap();

        for expected in 0..3 {
            assert_eq!(page.insert(&[expected as u8; 8]).unwrap(), Some(expected));
        }
        assert!(page.remove(1));
        assert!(!page.remove(1));
        assert_eq!(page.insert(&[9; 8]).unwrap(), Some(1));
        assert_eq!(page.record(1), Some(&[9u8; 8][..]));
    }

    #[test]
    fn test_update() {
        let mut buffer = vec![0u8; PAGE_SIZE];
        let mut page = Page::init(&mut buffer, 4).unwrap();

        page.insert(&[1, 2, 3, 4]).unwrap();
        assert!(page.update(0, &[4, 3, 2, 1]).unwrap());
        assert!(!page.update(1, &[0; 4]).unwrap());
        assert_eq!(page.record(0), Some(&[4u8, 3, 2, 1][..]));
        assert!(page.update(0, &[0; 3]).is_err());
    }

    #[test]
    fn test_page_full() {
        let mut buffer = vec![0u8; PAGE_SIZE];
        let mut page = Page::init(&mut buffer, 1000).unwrap();
        let slot_count = page.slot_count();

        for _ in 0..slot_count {
            assert!(!page.is_full());
            assert!(page.insert(&[0; 1000]).unwrap().is_some());
        }

        assert!(page.is_full());
        assert_eq!(page.insert(&[0; 1000]).unwrap(), None);
    }

    #[test]
    fn test_record_too_large() {
        let mut buffer = vec![0u8; PAGE_SIZE];
        let result = Page::init(&mut buffer, PAGE_SIZE);
        assert!(matches!(result, Err(RecordError::RecordTooLarge(_))));
    }
}
