use std::fmt::Debug;

use crate::typedef::FrameId;

/// Eviction policy over the pool's unpinned frames.
///
/// Implementations are internally synchronized so a replacer can be used
/// standalone; when driven under the pool's lock the inner lock is
/// uncontended.
pub trait Replacer: Send + Sync + Debug {
    /// Makes a frame a victim candidate. A frame that is already tracked
    /// keeps its position; the call is a no-op.
    fn unpin(&self, frame_id: FrameId);

    /// Withdraws a frame from victim candidacy. Untracked frames are ignored.
    fn pin(&self, frame_id: FrameId);

    /// Removes and returns the next victim, or `None` if no frame is
    /// evictable. The replacer never evicts on its own; the pool drives
    /// eviction through this call.
    fn victim(&self) -> Option<FrameId>;

    /// Number of frames currently eligible for eviction.
    fn size(&self) -> usize;
}
