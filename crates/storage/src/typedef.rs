/// Identifier of a page on disk, assigned by the disk manager.
pub type PageId = u32;

/// Index of a slot in the buffer pool's frame array.
pub type FrameId = usize;
