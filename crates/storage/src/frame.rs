use core::fmt;
use std::sync::{
    atomic::{AtomicU32, Ordering},
    RwLock, RwLockReadGuard, RwLockWriteGuard,
};

use crate::page::{INVALID_PAGE_ID, PAGE_SIZE};
use crate::typedef::PageId;

/// A slot in the buffer pool: one page's bytes plus the bookkeeping the
/// pool needs to manage it.
///
/// A frame is in exactly one of three states: free (invalid page id),
/// pinned (resident with a nonzero pin count), or an unpinned resident
/// tracked by the replacer.
pub struct PageFrame {
    page_id: PageId,
    is_dirty: bool,
    pin_cnt: AtomicU32,
    /// Page latch. Handles hold it for the lifetime of a pin so readers
    /// and the writer of a page exclude each other.
    latch: RwLock<()>,
    data: [u8; PAGE_SIZE],
}

impl fmt::Debug for PageFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageFrame")
            .field("page_id", &self.page_id)
            .field("is_dirty", &self.is_dirty)
            .field("pin_cnt", &self.pin_cnt.load(Ordering::SeqCst))
            .finish()
    }
}

impl PageFrame {
    /// Creates an empty frame holding no page.
    pub(crate) fn new() -> Self {
        Self {
            page_id: INVALID_PAGE_ID,
            is_dirty: false,
            pin_cnt: AtomicU32::new(0),
            latch: RwLock::new(()),
            data: [0; PAGE_SIZE],
        }
    }

    /// Returns the id of the resident page, or [`INVALID_PAGE_ID`] if empty.
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// True iff the in-memory bytes differ from the on-disk bytes.
    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    /// Number of outstanding pins on this frame.
    pub fn pin_count(&self) -> u32 {
        self.pin_cnt.load(Ordering::Acquire)
    }

    /// Read-only access to the page bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable access to the page bytes.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub(crate) fn set_page_id(&mut self, page_id: PageId) {
        self.page_id = page_id;
    }

    pub(crate) fn set_dirty(&mut self, dirty: bool) {
        self.is_dirty = dirty;
    }

    pub(crate) fn set_pin_count(&mut self, pin_cnt: u32) {
        self.pin_cnt.store(pin_cnt, Ordering::Release);
    }

    pub(crate) fn increment_pin_count(&mut self) {
        self.pin_cnt.fetch_add(1, Ordering::SeqCst);
    }

    /// Decrements the pin count. Callers must have checked that it is
    /// nonzero; the buffer pool's unpin path does.
    pub(crate) fn decrement_pin_count(&mut self) {
        let prev = self.pin_cnt.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(prev > 0, "pin count underflow on page {}", self.page_id);
    }

    /// Returns the frame to its empty state: invalid page id, clean,
    /// unpinned, zeroed bytes.
    pub(crate) fn reset(&mut self) {
        self.page_id = INVALID_PAGE_ID;
        self.is_dirty = false;
        self.pin_cnt.store(0, Ordering::Release);
        self.data.fill(0);
    }

    /// Copies `data` into the page bytes at `offset`.
    ///
    /// # Panics
    /// Panics if the write would run past the end of the page.
    pub fn write(&mut self, offset: usize, data: &[u8]) {
        assert!(
            offset + data.len() <= PAGE_SIZE,
            "write of {} bytes at offset {} exceeds page size",
            data.len(),
            offset
        );
        self.data[offset..offset + data.len()].copy_from_slice(data);
    }

    pub(crate) fn read_latch(&self) -> RwLockReadGuard<'_, ()> {
        self.latch.read().unwrap()
    }

    pub(crate) fn write_latch(&self) -> RwLockWriteGuard<'_, ()> {
        self.latch.write().unwrap()
    }
}
