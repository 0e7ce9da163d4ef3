use core::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::buffer_pool::BufferPoolManager;
use crate::frame::PageFrame;

/// Scoped read pin on a page.
///
/// Holds the frame's read latch and keeps the page pinned for its
/// lifetime; dropping the handle unpins the page, making it evictable
/// again once the last holder is gone.
pub struct PageFrameRefHandle<'a> {
    bpm: &'a Arc<RwLock<BufferPoolManager>>,
    page_frame: &'a PageFrame,
    _latch: RwLockReadGuard<'a, ()>,
}

impl fmt::Debug for PageFrameRefHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageFrameRefHandle")
            .field("page_frame", &self.page_frame)
            .finish()
    }
}

impl<'a> PageFrameRefHandle<'a> {
    pub(crate) fn new(bpm: &'a Arc<RwLock<BufferPoolManager>>, page_frame: &'a PageFrame) -> Self {
        let frame_ptr = page_frame as *const PageFrame;
        // SAFETY: the latch guard borrows from the same frame the handle
        // already borrows; going through a raw pointer lets both live in
        // one struct. The frame stays pinned (and so in place) until the
        // guard is dropped, which happens before the borrow ends.
        let latch = unsafe { (*frame_ptr).read_latch() };
        PageFrameRefHandle {
            bpm,
            page_frame,
            _latch: latch,
        }
    }
}

impl Drop for PageFrameRefHandle<'_> {
    fn drop(&mut self) {
        let page_id = self.page_frame.page_id();
        if !self.bpm.write().unwrap().unpin_page(page_id, false) {
            tracing::warn!(page_id, "dropped read handle for a page with no pin");
        }
    }
}

impl Deref for PageFrameRefHandle<'_> {
    type Target = PageFrame;

    fn deref(&self) -> &Self::Target {
        self.page_frame
    }
}

/// Scoped write pin on a page.
///
/// Holds the frame's write latch for exclusive access. Dropping the
/// handle unpins the page and marks it dirty; mutation through the
/// handle is what the dirty bit is for, and a spurious write-back of an
/// untouched page is harmless.
pub struct PageFrameMutHandle<'a> {
    bpm: &'a Arc<RwLock<BufferPoolManager>>,
    page_frame: &'a mut PageFrame,
    _latch: RwLockWriteGuard<'a, ()>,
}

impl fmt::Debug for PageFrameMutHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageFrameMutHandle")
            .field("page_frame", &self.page_frame)
            .finish()
    }
}

impl<'a> PageFrameMutHandle<'a> {
    pub(crate) fn new(
        bpm: &'a Arc<RwLock<BufferPoolManager>>,
        page_frame: &'a mut PageFrame,
    ) -> Self {
        let frame_ptr = page_frame as *mut PageFrame;
        // SAFETY: see `PageFrameRefHandle::new`; identical, with the
        // write half of the latch.
        let latch = unsafe { (*frame_ptr).write_latch() };
        PageFrameMutHandle {
            bpm,
            page_frame,
            _latch: latch,
        }
    }
}

impl Drop for PageFrameMutHandle<'_> {
    fn drop(&mut self) {
        let page_id = self.page_frame.page_id();
        if !self.bpm.write().unwrap().unpin_page(page_id, true) {
            tracing::warn!(page_id, "dropped write handle for a page with no pin");
        }
    }
}

impl Deref for PageFrameMutHandle<'_> {
    type Target = PageFrame;

    fn deref(&self) -> &Self::Target {
        self.page_frame
    }
}

impl DerefMut for PageFrameMutHandle<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.page_frame
    }
}
