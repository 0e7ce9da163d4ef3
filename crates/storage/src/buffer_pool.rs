use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};

use finchdb_error::errinput;

use crate::disk::disk_manager::DiskManager;
use crate::frame::PageFrame;
use crate::frame_handle::{PageFrameMutHandle, PageFrameRefHandle};
use crate::replacer::replacer::Replacer;
use crate::typedef::{FrameId, PageId};
use crate::wal::LogManager;
use crate::Result;

/// Fixed-capacity cache of disk pages.
///
/// The pool owns `pool_size` frames and keeps a page table mapping
/// resident page ids to frames. Callers pin pages through the fetch and
/// create operations, read or mutate the bytes while pinned, and unpin
/// when done; unpinned frames become eviction candidates in the
/// replacer. Dirty frames are written back before their frame is reused.
///
/// Every operation runs under the pool-wide lock of the enclosing
/// `RwLock`, including the disk calls, so the page table, frames, free
/// list and replacer always agree when the lock is released.
#[derive(Debug)]
pub struct BufferPoolManager {
    frames: Vec<PageFrame>,
    page_table: HashMap<PageId, FrameId>,
    replacer: Box<dyn Replacer>,
    free_list: VecDeque<FrameId>,
    disk_manager: Arc<Mutex<DiskManager>>,
    /// Retained for write-ahead logging; nothing is logged yet.
    #[allow(dead_code)]
    log_manager: Option<Arc<LogManager>>,
}

impl BufferPoolManager {
    /// Creates a pool of `pool_size` empty frames.
    ///
    /// # Panics
    /// Panics if `pool_size` is zero.
    pub fn new(
        pool_size: usize,
        disk_manager: Arc<Mutex<DiskManager>>,
        log_manager: Option<Arc<LogManager>>,
        replacer: Box<dyn Replacer>,
    ) -> Self {
        assert!(pool_size > 0, "buffer pool needs at least one frame");

        let mut frames = Vec::with_capacity(pool_size);
        frames.resize_with(pool_size, PageFrame::new);

        Self {
            frames,
            page_table: HashMap::new(),
            replacer,
            free_list: (0..pool_size).collect(),
            disk_manager,
            log_manager,
        }
    }

    /// Claims a frame for a new resident: the free list's front if any,
    /// otherwise the replacer's victim. Returns `Ok(None)` when every
    /// frame is pinned. The claimed frame is written back if dirty,
    /// unmapped from the page table, and handed over reset.
    fn pick_frame(&mut self) -> Result<Option<FrameId>> {
        if let Some(frame_id) = self.free_list.pop_front() {
            return Ok(Some(frame_id));
        }

        let Some(frame_id) = self.replacer.victim() else {
            return Ok(None);
        };

        let frame = &mut self.frames[frame_id];
        debug_assert_eq!(frame.pin_count(), 0, "victim frame must be unpinned");

        if frame.is_dirty() {
            tracing::debug!(
                page_id = frame.page_id(),
                frame_id,
                "writing back dirty page before eviction"
            );
            let write_result = {
                let mut disk = self.disk_manager.lock().unwrap();
                disk.write_page(frame.page_id(), frame.data())
            };
            if let Err(e) = write_result {
                // The bytes were not persisted: keep the frame resident
                // and dirty, and put it back up for a retried eviction.
                self.replacer.unpin(frame_id);
                return Err(e);
            }
            frame.set_dirty(false);
        }

        self.page_table.remove(&frame.page_id());
        frame.reset();

        Ok(Some(frame_id))
    }

    /// Pins the frame holding `page_id`, faulting the page in from disk
    /// on a miss. `Ok(None)` means no frame could be claimed.
    fn fetch_frame(&mut self, page_id: PageId) -> Result<Option<FrameId>> {
        if let Some(&frame_id) = self.page_table.get(&page_id) {
            self.frames[frame_id].increment_pin_count();
            self.replacer.pin(frame_id);
            return Ok(Some(frame_id));
        }

        let Some(frame_id) = self.pick_frame()? else {
            return Ok(None);
        };

        let read_result = {
            let mut disk = self.disk_manager.lock().unwrap();
            disk.read_page(page_id)
        };
        let bytes = match read_result {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                self.free_list.push_front(frame_id);
                return errinput!("Page {} does not exist on disk", page_id);
            }
            Err(e) => {
                self.free_list.push_front(frame_id);
                return Err(e);
            }
        };
        tracing::trace!(page_id, frame_id, "fetch miss, page read from disk");

        let frame = &mut self.frames[frame_id];
        frame.set_page_id(page_id);
        frame.write(0, &bytes);
        frame.set_pin_count(1);
        self.page_table.insert(page_id, frame_id);

        Ok(Some(frame_id))
    }

    /// Fetches a read reference to a page, pinning its frame.
    pub(crate) fn fetch_page(&mut self, page_id: PageId) -> Result<Option<&PageFrame>> {
        match self.fetch_frame(page_id)? {
            Some(frame_id) => Ok(Some(&self.frames[frame_id])),
            None => Ok(None),
        }
    }

    /// Fetches a mutable reference to a page, pinning its frame.
    pub(crate) fn fetch_page_mut(&mut self, page_id: PageId) -> Result<Option<&mut PageFrame>> {
        match self.fetch_frame(page_id)? {
            Some(frame_id) => Ok(Some(&mut self.frames[frame_id])),
            None => Ok(None),
        }
    }

    /// Allocates a brand-new page and pins it in a claimed frame.
    ///
    /// The frame is claimed before the page id is allocated so a full
    /// pool does not leak ids. The new page starts dirty: its zeroed
    /// image is considered written and must survive eviction.
    pub(crate) fn create_page(&mut self) -> Result<Option<&mut PageFrame>> {
        let Some(frame_id) = self.pick_frame()? else {
            return Ok(None);
        };

        let allocated = {
            let mut disk = self.disk_manager.lock().unwrap();
            disk.allocate_page()
        };
        let page_id = match allocated {
            Ok(page_id) => page_id,
            Err(e) => {
                self.free_list.push_front(frame_id);
                return Err(e);
            }
        };
        tracing::trace!(page_id, frame_id, "created page");

        let frame = &mut self.frames[frame_id];
        frame.set_page_id(page_id);
        frame.set_pin_count(1);
        frame.set_dirty(true);
        self.page_table.insert(page_id, frame_id);

        Ok(Some(frame))
    }

    /// Releases one pin on a page, recording dirtiness. Returns `false`
    /// if the page is not resident or has no outstanding pin; nothing
    /// changes in that case. No bytes are written here; dirtiness is
    /// materialized on eviction or an explicit flush.
    pub fn unpin_page(&mut self, page_id: PageId, is_dirty: bool) -> bool {
        let Some(&frame_id) = self.page_table.get(&page_id) else {
            return false;
        };

        let frame = &mut self.frames[frame_id];
        if frame.pin_count() == 0 {
            return false;
        }

        if is_dirty {
            frame.set_dirty(true);
        }
        frame.decrement_pin_count();
        if frame.pin_count() == 0 {
            self.replacer.unpin(frame_id);
        }

        true
    }

    /// Writes a resident page's bytes to disk and clears its dirty flag.
    /// The page stays resident and keeps its pins. Returns `Ok(false)`
    /// if the page is not resident.
    pub fn flush_page(&mut self, page_id: PageId) -> Result<bool> {
        let Some(&frame_id) = self.page_table.get(&page_id) else {
            return Ok(false);
        };

        let frame = &mut self.frames[frame_id];
        {
            let mut disk = self.disk_manager.lock().unwrap();
            disk.write_page(page_id, frame.data())?;
        }
        frame.set_dirty(false);

        Ok(true)
    }

    /// Writes back every dirty resident page. Residency, pins and the
    /// replacer are untouched.
    pub fn flush_all_pages(&mut self) -> Result<()> {
        let mut disk = self.disk_manager.lock().unwrap();
        for (&page_id, &frame_id) in self.page_table.iter() {
            let frame = &mut self.frames[frame_id];
            if frame.is_dirty() {
                disk.write_page(page_id, frame.data())?;
                frame.set_dirty(false);
            }
        }
        Ok(())
    }

    /// Drops a page from the pool and deallocates it on disk.
    ///
    /// Returns `Ok(true)` for a page that is not resident (deleting it
    /// is trivially done), `Ok(false)` while the page has outstanding
    /// pins. The freed frame rejoins the free list.
    pub fn delete_page(&mut self, page_id: PageId) -> Result<bool> {
        let Some(&frame_id) = self.page_table.get(&page_id) else {
            return Ok(true);
        };

        if self.frames[frame_id].pin_count() > 0 {
            return Ok(false);
        }

        {
            let mut disk = self.disk_manager.lock().unwrap();
            disk.deallocate_page(page_id)?;
        }
        tracing::debug!(page_id, frame_id, "deleted page");

        self.page_table.remove(&page_id);
        // Pinning removes the frame from victim candidacy.
        self.replacer.pin(frame_id);
        self.frames[frame_id].reset();
        self.free_list.push_back(frame_id);

        Ok(true)
    }

    /// Total number of frames in the pool.
    pub fn capacity(&self) -> usize {
        self.frames.len()
    }

    /// Number of frames a fetch or create could claim right now: free
    /// frames plus eviction candidates.
    pub fn free_frame_count(&self) -> usize {
        self.free_list.len() + self.replacer.size()
    }

    /// Pin count of a resident page, or `None` if it is not resident.
    pub(crate) fn get_pin_count(&self, page_id: PageId) -> Option<u32> {
        let frame_id = self.page_table.get(&page_id)?;
        Some(self.frames[*frame_id].pin_count())
    }

    pub(crate) fn is_resident(&self, page_id: PageId) -> bool {
        self.page_table.contains_key(&page_id)
    }

    /// Creates a new page and returns a write handle for it.
    /// `Ok(None)` means every frame is pinned.
    pub fn create_page_handle(
        bpm: &Arc<RwLock<BufferPoolManager>>,
    ) -> Result<Option<PageFrameMutHandle<'_>>> {
        let page_frame = {
            let mut pool = bpm.write()?;
            // SAFETY:
            // The handle must package a reference into the pool's frame
            // array together with the Arc it came from, but the borrow
            // checker ties the frame reference to the lifetime of
            // `pool`, the guard, and so considers the whole pool
            // borrowed. We detach the reference through a raw pointer.
            // This is sound because the guard gives us exclusive access
            // while the frame is produced, the frame array never moves,
            // and the frame leaves the pool pinned, so no other thread
            // can recycle it before the handle unpins it on drop.
            let pool_ptr = &mut *pool as *mut BufferPoolManager;
            match unsafe { (*pool_ptr).create_page()? } {
                Some(frame) => frame,
                None => return Ok(None),
            }
        };

        Ok(Some(PageFrameMutHandle::new(bpm, page_frame)))
    }

    /// Fetches a read handle to a page. `Ok(None)` means the pool is
    /// exhausted.
    pub fn fetch_page_handle(
        bpm: &Arc<RwLock<BufferPoolManager>>,
        page_id: PageId,
    ) -> Result<Option<PageFrameRefHandle<'_>>> {
        let page_frame = {
            let mut pool = bpm.write()?;
            // SAFETY: see `create_page_handle`.
            let pool_ptr = &mut *pool as *mut BufferPoolManager;
            match unsafe { (*pool_ptr).fetch_page(page_id)? } {
                Some(frame) => frame,
                None => return Ok(None),
            }
        };

        Ok(Some(PageFrameRefHandle::new(bpm, page_frame)))
    }

    /// Fetches a write handle to a page. `Ok(None)` means the pool is
    /// exhausted.
    pub fn fetch_page_mut_handle(
        bpm: &Arc<RwLock<BufferPoolManager>>,
        page_id: PageId,
    ) -> Result<Option<PageFrameMutHandle<'_>>> {
        let page_frame = {
            let mut pool = bpm.write()?;
            // SAFETY: see `create_page_handle`.
            let pool_ptr = &mut *pool as *mut BufferPoolManager;
            match unsafe { (*pool_ptr).fetch_page_mut(page_id)? } {
                Some(frame) => frame,
                None => return Ok(None),
            }
        };

        Ok(Some(PageFrameMutHandle::new(bpm, page_frame)))
    }
}
