use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;

use crate::bulk;
use crate::flush_strategy::FlushCoordinator;

/// Encoded bulk entries in append order.
#[derive(Debug, Default)]
pub struct BufferData {
    pub queue: VecDeque<Bytes>,
}

impl BufferData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: Bytes) {
        self.queue.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// The request body for these entries.
    pub fn payload(&self) -> Bytes {
        bulk::join_entries(&self.queue)
    }
}

/// Entries and flush bookkeeping behind one mutex, so an append, its size
/// check and the snapshot-and-clear of a flush never interleave.
struct BufferState {
    data: BufferData,
    coordinator: FlushCoordinator,
}

/// Per-emitter outbound buffer.
///
/// Uses `std::sync::Mutex` because the lock is never held across `.await`.
pub struct OutboundBuffer {
    state: Mutex<BufferState>,
}

impl OutboundBuffer {
    pub fn new(coordinator: FlushCoordinator) -> Self {
        Self {
            state: Mutex::new(BufferState {
                data: BufferData::new(),
                coordinator,
            }),
        }
    }

    /// Number of buffered entries.
    pub fn len(&self) -> usize {
        self.lock().data.len()
    }

    /// Append an entry. If that fills the batch, the buffer is taken in the
    /// same critical section and returned for sending; `now` is only called
    /// in that case.
    pub fn push_and_maybe_take(
        &self,
        entry: Bytes,
        now: impl FnOnce() -> u64,
    ) -> Option<BufferData> {
        let mut guard = self.lock();
        guard.data.push(entry);
        if guard.coordinator.should_flush_on_append(guard.data.len()) {
            Some(Self::take_locked(&mut guard, now()))
        } else {
            None
        }
    }

    /// Take the buffer if a tick at `now_ms` makes it due.
    pub fn take_if_due(&self, now_ms: u64) -> Option<BufferData> {
        let mut guard = self.lock();
        if guard.coordinator.should_flush_on_tick(guard.data.len(), now_ms) {
            Some(Self::take_locked(&mut guard, now_ms))
        } else {
            None
        }
    }

    /// Take everything buffered and mark a flush at `now_ms`, even if empty.
    pub fn take(&self, now_ms: u64) -> BufferData {
        Self::take_locked(&mut self.lock(), now_ms)
    }

    fn take_locked(state: &mut BufferState, now_ms: u64) -> BufferData {
        state.coordinator.record_flush(now_ms);
        std::mem::take(&mut state.data)
    }

    fn lock(&self) -> MutexGuard<'_, BufferState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
