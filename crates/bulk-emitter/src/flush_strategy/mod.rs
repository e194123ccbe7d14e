/// Decides when buffered entries are due for a flush.
///
/// Two triggers: the buffer reaching `max_batch` entries, and a tick arriving
/// at least `interval_ms` after the last flush while entries are waiting.
/// Times are milliseconds supplied by the caller.
#[derive(Debug, Clone)]
pub struct FlushCoordinator {
    max_batch: usize,
    interval_ms: u64,
    last_flush_ms: u64,
}

impl FlushCoordinator {
    pub fn new(max_batch: usize, interval_ms: u64, now_ms: u64) -> Self {
        Self {
            max_batch: max_batch.max(1),
            interval_ms,
            last_flush_ms: now_ms,
        }
    }

    /// Whether a buffer holding `count` entries must flush right after an append.
    pub fn should_flush_on_append(&self, count: usize) -> bool {
        count >= self.max_batch
    }

    /// Whether a tick at `now_ms` should flush a buffer holding `count` entries.
    pub fn should_flush_on_tick(&self, count: usize, now_ms: u64) -> bool {
        count > 0 && self.elapsed_since_flush(now_ms) >= self.interval_ms
    }

    /// Record that a flush started at `now_ms`.
    pub fn record_flush(&mut self, now_ms: u64) {
        self.last_flush_ms = now_ms;
    }

    fn elapsed_since_flush(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_flush_ms)
    }
}
