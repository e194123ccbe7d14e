use std::sync::Arc;

use tokio::runtime::Handle;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, warn};

use crate::buffers::{BufferData, OutboundBuffer};
use crate::bulk;
use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigError, EmitterOptions, Settings};
use crate::flush_strategy::FlushCoordinator;
use crate::guard::{EmitterState, FailureGuard};
use crate::record::Record;
use crate::transport::{BulkRequest, Transport};

/// Settings and buffer of an emitter that was initialized with a usable endpoint.
struct Active {
    settings: Settings,
    buffer: OutboundBuffer,
}

/// Buffers request/response records and ships them to a bulk endpoint.
///
/// Records are flushed when `max_batch` of them are waiting, or when a tick
/// finds entries older than the flush interval. Each flush is one
/// fire-and-forget POST: the buffer is cleared as soon as the request is
/// started, and nothing is retried. A transport-level failure disables the
/// emitter for good. None of this is ever surfaced to callers.
pub struct Emitter<T: Transport, C: Clock = SystemClock> {
    transport: Arc<T>,
    clock: C,
    guard: Arc<FailureGuard>,
    active: Option<Active>,
    in_flight: TaskTracker,
}

impl<T: Transport> Emitter<T, SystemClock> {
    pub fn new(transport: T) -> Self {
        Self::with_clock(transport, SystemClock)
    }
}

impl<T: Transport, C: Clock> Emitter<T, C> {
    /// Create an uninitialized (disabled) emitter using `clock` for flush times.
    pub fn with_clock(transport: T, clock: C) -> Self {
        Self {
            transport: Arc::new(transport),
            clock,
            guard: Arc::new(FailureGuard::new()),
            active: None,
            in_flight: TaskTracker::new(),
        }
    }

    /// Enable the emitter if `options` name a usable endpoint.
    ///
    /// Absent options or a missing endpoint leave it disabled. An emitter that
    /// is already enabled, or was disabled by a failure, ignores this call.
    pub fn initialize(&mut self, options: Option<&EmitterOptions>) {
        if self.guard.state() != EmitterState::DisabledByConfig {
            debug!(state = %self.guard.state(), "ignoring initialize on an initialized emitter");
            return;
        }

        let Some(options) = options else {
            debug!("no options supplied, bulk emitter disabled");
            return;
        };

        let settings = match Settings::resolve(options) {
            Ok(settings) => settings,
            Err(ConfigError::EndpointMissing) => {
                debug!("bulk endpoint not configured, bulk emitter disabled");
                return;
            }
            Err(e) => {
                warn!(error = %e, "bulk emitter disabled");
                return;
            }
        };

        let coordinator = FlushCoordinator::new(
            settings.max_batch,
            settings.flush_interval_ms,
            self.clock.now_millis(),
        );
        debug!(
            endpoint = %settings.endpoint,
            index_prefix = %settings.index_prefix,
            max_batch = settings.max_batch,
            "bulk emitter enabled"
        );
        self.active = Some(Active {
            settings,
            buffer: OutboundBuffer::new(coordinator),
        });
        self.guard.enable();
    }

    pub fn state(&self) -> EmitterState {
        self.guard.state()
    }

    /// Number of records waiting for the next flush.
    pub fn buffered(&self) -> usize {
        self.active.as_ref().map_or(0, |a| a.buffer.len())
    }

    /// Normalize a record's attributes and buffer it. Flushes immediately if
    /// this fills the batch. No-op unless enabled.
    pub fn process_record(&self, mut record: Record) {
        let Some(active) = self.enabled() else {
            return;
        };

        record.coerce_attributes();
        let entry = match bulk::encode_entry(&record, &active.settings.index_prefix) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, id = %record.id, "dropping record that failed to serialize");
                return;
            }
        };
        drop(record);

        if let Some(batch) = active
            .buffer
            .push_and_maybe_take(entry, || self.clock.now_millis())
        {
            self.send(&active.settings, batch);
        }
    }

    /// Flush if entries are waiting and the last flush is at least one flush
    /// interval before `now_ms`.
    pub fn tick(&self, now_ms: u64) {
        let Some(active) = self.enabled() else {
            return;
        };
        if let Some(batch) = active.buffer.take_if_due(now_ms) {
            self.send(&active.settings, batch);
        }
    }

    /// Send everything buffered now. No-op unless enabled.
    pub fn flush(&self) {
        let Some(active) = self.enabled() else {
            return;
        };
        let batch = active.buffer.take(self.clock.now_millis());
        self.send(&active.settings, batch);
    }

    /// Wait for every bulk request started so far to complete.
    pub async fn drain(&self) {
        self.in_flight.close();
        self.in_flight.wait().await;
        self.in_flight.reopen();
    }

    fn enabled(&self) -> Option<&Active> {
        self.active.as_ref().filter(|_| self.guard.is_enabled())
    }

    fn send(&self, settings: &Settings, batch: BufferData) {
        if batch.is_empty() {
            return;
        }
        let entries = batch.len();

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                if self.guard.trip() {
                    error!(error = %e, entries, "no async runtime to send bulk request, disabling emitter");
                }
                return;
            }
        };

        let request = BulkRequest {
            url: settings.bulk_url.clone(),
            body: batch.payload(),
            credentials: settings.credentials.clone(),
        };
        let transport = Arc::clone(&self.transport);
        let guard = Arc::clone(&self.guard);

        self.in_flight.spawn_on(
            async move {
                match transport.send(request).await {
                    Ok(status) if status.is_success() => {
                        debug!(entries, %status, "bulk request accepted");
                    }
                    Ok(status) => {
                        warn!(entries, %status, "bulk request rejected");
                    }
                    Err(e) => {
                        if guard.trip() {
                            error!(error = %e, entries, "bulk request failed, disabling emitter");
                        } else {
                            debug!(error = %e, entries, "bulk request failed");
                        }
                    }
                }
            },
            &handle,
        );
    }
}
