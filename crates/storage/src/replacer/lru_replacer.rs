use std::sync::Mutex;

use hashlink::LinkedHashMap;

use super::replacer::Replacer;
use crate::typedef::FrameId;

/// Least-recently-used replacement policy.
///
/// The queue is an insertion-ordered hash map: front is the frame whose
/// unpin is oldest (the next victim), back is the most recently unpinned.
/// Every operation is O(1).
#[derive(Debug)]
pub struct LruReplacer {
    queue: Mutex<LinkedHashMap<FrameId, ()>>,
}

impl LruReplacer {
    pub fn new() -> Self {
        LruReplacer {
            queue: Mutex::new(LinkedHashMap::new()),
        }
    }
}

impl Default for LruReplacer {
    fn default() -> Self {
        Self::new()
    }
}

impl Replacer for LruReplacer {
    fn unpin(&self, frame_id: FrameId) {
        let mut queue = self.queue.lock().unwrap();
        // An already-tracked frame keeps its place in the victim order.
        if !queue.contains_key(&frame_id) {
            queue.insert(frame_id, ());
        }
    }

    fn pin(&self, frame_id: FrameId) {
        self.queue.lock().unwrap().remove(&frame_id);
    }

    fn victim(&self) -> Option<FrameId> {
        self.queue.lock().unwrap().pop_front().map(|(fid, ())| fid)
    }

    fn size(&self) -> usize {
        self.queue.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_victim_follows_unpin_order() {
        let replacer = LruReplacer::new();

        replacer.unpin(1);
        replacer.unpin(2);
        replacer.unpin(3);
        assert_eq!(3, replacer.size());

        assert_eq!(Some(1), replacer.victim());
        assert_eq!(Some(2), replacer.victim());
        assert_eq!(Some(3), replacer.victim());
        assert_eq!(None, replacer.victim());
        assert_eq!(0, replacer.size());
    }

    #[test]
    fn test_pin_withdraws_candidacy() {
        let replacer = LruReplacer::new();

        replacer.unpin(1);
        replacer.unpin(2);
        replacer.unpin(3);
        replacer.pin(2);

        assert_eq!(2, replacer.size());
        assert_eq!(Some(1), replacer.victim());
        assert_eq!(Some(3), replacer.victim());
        assert_eq!(None, replacer.victim());
    }

    #[test]
    fn test_duplicate_unpin_keeps_position() {
        let replacer = LruReplacer::new();

        replacer.unpin(1);
        replacer.unpin(2);
        // Frame 1 is already a candidate; this must not refresh it.
        replacer.unpin(1);

        assert_eq!(2, replacer.size());
        assert_eq!(Some(1), replacer.victim());
        assert_eq!(Some(2), replacer.victim());
    }

    #[test]
    fn test_pin_of_untracked_frame_is_noop() {
        let replacer = LruReplacer::new();

        replacer.pin(7);
        assert_eq!(0, replacer.size());

        replacer.unpin(7);
        replacer.pin(7);
        replacer.pin(7);
        assert_eq!(0, replacer.size());
        assert_eq!(None, replacer.victim());
    }

    #[test]
    fn test_reinsert_after_victim_goes_to_back() {
        let replacer = LruReplacer::new();

        replacer.unpin(1);
        replacer.unpin(2);
        assert_eq!(Some(1), replacer.victim());

        // Frame 1 becomes a candidate again, now younger than frame 2.
        replacer.unpin(1);
        assert_eq!(Some(2), replacer.victim());
        assert_eq!(Some(1), replacer.victim());
    }
}
