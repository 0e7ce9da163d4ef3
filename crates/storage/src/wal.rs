/// Handle to the write-ahead log.
///
/// The buffer pool stores one so recovery-aware callers can thread it
/// through to the storage layer, but no log records are emitted yet.
#[derive(Debug, Default)]
pub struct LogManager;

impl LogManager {
    pub fn new() -> Self {
        LogManager
    }
}
