use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use reqwest::StatusCode;

use crate::clock::Clock;
use crate::record::Record;
use crate::transport::{BulkRequest, Transport, TransportError};

/// 2023-06-15T10:00:00Z
pub const T0: u64 = 1_686_823_200_000;

/// Answers every request with a fixed status and keeps what it was sent.
#[derive(Clone)]
pub struct RecordingTransport {
    status: StatusCode,
    requests: Arc<Mutex<Vec<BulkRequest>>>,
}

impl RecordingTransport {
    pub fn ok() -> Self {
        Self::with_status(StatusCode::OK)
    }

    pub fn with_status(status: StatusCode) -> Self {
        Self {
            status,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn requests(&self) -> Vec<BulkRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for RecordingTransport {
    async fn send(&self, request: BulkRequest) -> Result<StatusCode, TransportError> {
        self.requests.lock().unwrap().push(request);
        Ok(self.status)
    }
}

/// Never reaches the server.
#[derive(Clone, Default)]
pub struct FailingTransport {
    pub calls: Arc<AtomicUsize>,
}

impl Transport for FailingTransport {
    async fn send(&self, _request: BulkRequest) -> Result<StatusCode, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(TransportError::Unavailable("connection refused".into()))
    }
}

/// Succeeds after a delay, counting requests that have started but not finished.
#[derive(Clone, Default)]
pub struct SlowTransport {
    pub in_flight: Arc<AtomicUsize>,
    pub peak_in_flight: Arc<AtomicUsize>,
    pub completed: Arc<AtomicUsize>,
}

impl Transport for SlowTransport {
    async fn send(&self, _request: BulkRequest) -> Result<StatusCode, TransportError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(StatusCode::OK)
    }
}

/// Clock that only moves when told to.
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn at(now_ms: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(now_ms)),
        }
    }

    pub fn set(&self, now_ms: u64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

pub fn timestamp(offset_ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(T0 as i64 + offset_ms).unwrap()
}

pub fn record(id: &str) -> Record {
    Record::new(id, timestamp(0))
}

/// Split a bulk body into its lines, parsing each as JSON.
pub fn ndjson_lines(body: &[u8]) -> Vec<serde_json::Value> {
    let text = std::str::from_utf8(body).unwrap();
    assert!(text.is_empty() || text.ends_with('\n'), "body must be newline-terminated");
    text.lines()
        .map(|l| serde_json::from_str(l).expect("every line must be valid JSON"))
        .collect()
}
