use std::time::{SystemTime, UNIX_EPOCH};

/// Millisecond time source used for flush bookkeeping.
///
/// `tick` callers pass their own `now`; the clock is only consulted for
/// flushes that have no caller-supplied time (initialization and size-triggered
/// flushes).
pub trait Clock: Send + Sync + 'static {
    fn now_millis(&self) -> u64;
}

/// Wall clock, milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}
