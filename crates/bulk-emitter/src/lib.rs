//! Ships API request/response records to a log store's bulk ingestion endpoint.
//!
//! Records are buffered as NDJSON bulk entries and flushed in one POST when a
//! batch fills or when a tick finds them old enough. Delivery is at most once:
//! a failed batch is dropped, and a transport failure switches the emitter off
//! for the rest of its life instead of disturbing the host.

pub mod buffers;
pub mod bulk;
pub mod clock;
pub mod coerce;
pub mod config;
pub mod emitter;
pub mod flush_strategy;
pub mod guard;
pub mod index;
pub mod record;
pub mod transport;

#[cfg(test)]
mod testing;

pub use clock::{Clock, SystemClock};
pub use config::{ConfigError, EmitterOptions};
pub use emitter::Emitter;
pub use guard::EmitterState;
pub use record::Record;
pub use transport::{HttpTransport, Transport, TransportError};
