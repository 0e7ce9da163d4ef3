use std::collections::{HashMap, VecDeque};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use bytes::{Bytes, BytesMut};
use fs2::FileExt;
use finchdb_error::{errdata, errinput, Error};

use crate::page::PAGE_SIZE;
use crate::typedef::PageId;
use crate::Result;

/// Number of page slots the database file starts with. Doubled whenever
/// the file runs out of room.
const INITIAL_SLOT_CAPACITY: u64 = 32;

const ZEROED_PAGE: &[u8] = &[0; PAGE_SIZE];

/// Owns the database file and hands out page-granular reads and writes.
///
/// Page ids are allocated monotonically starting at 1; the slot (file
/// offset) backing a deallocated page is recycled for later allocations.
/// The file is locked exclusively for the lifetime of the manager so no
/// second process can mutate it underneath us.
#[derive(Debug)]
pub struct DiskManager {
    file: File,
    /// Highest page id handed out so far. 0 is the invalid sentinel.
    last_page_id: PageId,
    /// Offset in the file of every live page.
    offsets: HashMap<PageId, u64>,
    /// Slots freed by deallocation, reused before the file grows.
    reclaimed: VecDeque<u64>,
    /// Next never-used slot index.
    next_slot: u64,
    /// Number of slots the file currently has room for.
    slot_capacity: u64,
}

impl DiskManager {
    /// Opens (creating and truncating) the database file at `path` and
    /// takes an exclusive lock on it.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| Error::IO(format!("Unable to open file {}: {}", path.display(), e)))?;

        file.lock_exclusive()
            .map_err(|e| Error::IO(format!("Failed to acquire exclusive file lock: {}", e)))?;

        let mut dm = Self {
            file,
            last_page_id: 0,
            offsets: HashMap::new(),
            reclaimed: VecDeque::new(),
            next_slot: 0,
            slot_capacity: INITIAL_SLOT_CAPACITY,
        };
        dm.grow_file()?;

        Ok(dm)
    }

    /// Allocates a fresh page id backed by a zero-initialized slot.
    pub fn allocate_page(&mut self) -> Result<PageId> {
        self.last_page_id += 1;
        let page_id = self.last_page_id;

        let offset = self.take_slot()?;
        self.offsets.insert(page_id, offset);
        self.write_page(page_id, ZEROED_PAGE)?;

        Ok(page_id)
    }

    /// Releases a page's slot for reuse. The page id itself is retired.
    pub fn deallocate_page(&mut self, page_id: PageId) -> Result<()> {
        match self.offsets.remove(&page_id) {
            Some(offset) => {
                self.reclaimed.push_back(offset);
                Ok(())
            }
            None => errinput!("Page {} was never allocated", page_id),
        }
    }

    /// Reads a page's bytes, or `None` if the page id is not allocated.
    pub fn read_page(&mut self, page_id: PageId) -> Result<Option<Bytes>> {
        let Some(&offset) = self.offsets.get(&page_id) else {
            return Ok(None);
        };

        self.file.seek(SeekFrom::Start(offset))?;
        let mut buf = BytesMut::zeroed(PAGE_SIZE);
        self.file.read_exact(&mut buf)?;
        Ok(Some(buf.freeze()))
    }

    /// Writes a page's bytes and syncs them to stable storage.
    pub fn write_page(&mut self, page_id: PageId, data: &[u8]) -> Result<()> {
        if data.len() > PAGE_SIZE {
            return errdata!("Page data must fit in a page");
        }
        let Some(&offset) = self.offsets.get(&page_id) else {
            return errinput!("Page {} was never allocated", page_id);
        };

        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(data)?;
        self.file.sync_all()?;

        Ok(())
    }

    /// Picks the slot for a new page: a reclaimed one if any, otherwise
    /// the next unused slot, growing the file when it is full.
    fn take_slot(&mut self) -> Result<u64> {
        if let Some(offset) = self.reclaimed.pop_front() {
            return Ok(offset);
        }

        if self.next_slot == self.slot_capacity {
            self.slot_capacity *= 2;
            self.grow_file()?;
        }
        let offset = self.next_slot * PAGE_SIZE as u64;
        self.next_slot += 1;
        Ok(offset)
    }

    fn grow_file(&mut self) -> Result<()> {
        self.file
            .set_len(self.slot_capacity * PAGE_SIZE as u64)
            .map_err(|e| Error::IO(format!("Failed to resize file: {}", e)))?;
        Ok(())
    }
}

impl Drop for DiskManager {
    /// Releases the exclusive file lock so a new manager (or another
    /// process) can take over the file.
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            panic!("Failed to unlock file: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_disk_manager(dir: &TempDir) -> DiskManager {
        DiskManager::new(dir.path().join("finch.db")).expect("failed to create disk manager")
    }

    #[test]
    fn test_allocate_write_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut dm = temp_disk_manager(&dir);

        let pid = dm.allocate_page().unwrap();
        assert_eq!(pid, 1);

        // Freshly allocated pages read back zeroed.
        let bytes = dm.read_page(pid).unwrap().unwrap();
        assert!(bytes.iter().all(|&b| b == 0));

        let mut page = vec![0u8; PAGE_SIZE];
        page[..4].copy_from_slice(b"AAAA");
        dm.write_page(pid, &page).unwrap();

        let bytes = dm.read_page(pid).unwrap().unwrap();
        assert_eq!(&bytes[..4], b"AAAA");
    }

    #[test]
    fn test_read_of_unallocated_page_is_none() {
        let dir = TempDir::new().unwrap();
        let mut dm = temp_disk_manager(&dir);

        assert_eq!(dm.read_page(42).unwrap(), None);
    }

    #[test]
    fn test_write_to_unallocated_page_errors() {
        let dir = TempDir::new().unwrap();
        let mut dm = temp_disk_manager(&dir);

        assert!(dm.write_page(7, ZEROED_PAGE).is_err());
    }

    #[test]
    fn test_deallocate_retires_page_and_reuses_slot() {
        let dir = TempDir::new().unwrap();
        let mut dm = temp_disk_manager(&dir);

        let pid = dm.allocate_page().unwrap();
        let offset = *dm.offsets.get(&pid).unwrap();

        dm.deallocate_page(pid).unwrap();
        assert_eq!(dm.read_page(pid).unwrap(), None);
        assert!(dm.deallocate_page(pid).is_err());

        // The freed slot backs the next allocation; the id does not come back.
        let next = dm.allocate_page().unwrap();
        assert_ne!(next, pid);
        assert_eq!(*dm.offsets.get(&next).unwrap(), offset);
    }

    #[test]
    fn test_file_grows_past_initial_capacity() {
        let dir = TempDir::new().unwrap();
        let mut dm = temp_disk_manager(&dir);

        let mut pids = Vec::new();
        for _ in 0..(INITIAL_SLOT_CAPACITY * 2 + 1) {
            pids.push(dm.allocate_page().unwrap());
        }

        // Every page keeps its own slot.
        let mut page = vec![0u8; PAGE_SIZE];
        for (i, &pid) in pids.iter().enumerate() {
            page[0] = i as u8;
            dm.write_page(pid, &page).unwrap();
        }
        for (i, &pid) in pids.iter().enumerate() {
            assert_eq!(dm.read_page(pid).unwrap().unwrap()[0], i as u8);
        }
    }

    #[test]
    fn test_oversized_write_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut dm = temp_disk_manager(&dir);

        let pid = dm.allocate_page().unwrap();
        let oversized = vec![0u8; PAGE_SIZE + 1];
        assert!(dm.write_page(pid, &oversized).is_err());
    }
}
