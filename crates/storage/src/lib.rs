pub(crate) mod buffer_pool;
pub(crate) mod disk;
pub(crate) mod frame;
pub(crate) mod frame_handle;
pub(crate) mod page;
pub(crate) mod replacer;
pub(crate) mod typedef;
pub(crate) mod wal;

pub use buffer_pool::BufferPoolManager;
pub use disk::disk_manager::DiskManager;
pub use frame::PageFrame;
pub use frame_handle::{PageFrameMutHandle, PageFrameRefHandle};
pub use page::{INVALID_PAGE_ID, PAGE_SIZE};
pub use replacer::lru_replacer::LruReplacer;
pub use replacer::replacer::Replacer;
pub use typedef::{FrameId, PageId};
pub use wal::LogManager;

pub(crate) type Result<T> = std::result::Result<T, finchdb_error::Error>;
