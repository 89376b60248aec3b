//! # Event Log
//! Bounded in-memory log of detected incidents.
//!
//! The poll loop is the only writer; API handlers read snapshots. The lock is
//! held just for the push or the copy, never across I/O.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

pub const DEFAULT_LOG_CAPACITY: usize = 500;
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One detected incident, as republished to readers.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct IncidentRecord {
    pub timestamp: String, // UTC, TIMESTAMP_FORMAT
    pub product: String,
    pub status: String,
    pub entry_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl IncidentRecord {
    pub fn new(
        ts: DateTime<Utc>,
        product: impl Into<String>,
        status: impl Into<String>,
        entry_id: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: format_utc(ts),
            product: product.into(),
            status: status.into(),
            entry_id: entry_id.into(),
            link: None,
        }
    }
}

/// Console form: timestamp, product, status, separator.
impl fmt::Display for IncidentRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] Product: {}\nStatus: {}\n{}",
            self.timestamp,
            self.product,
            self.status,
            "─".repeat(60)
        )
    }
}

pub fn format_utc(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Thread-safe FIFO of incident records, oldest evicted past capacity.
#[derive(Debug)]
pub struct EventLog {
    inner: Mutex<VecDeque<IncidentRecord>>,
    cap: usize,
}

impl EventLog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }

    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            inner: Mutex::new(VecDeque::with_capacity(cap.min(10_000))),
            cap,
        }
    }

    pub fn append(&self, record: IncidentRecord) {
        let mut v = self.inner.lock().expect("event log mutex poisoned");
        v.push_back(record);
        while v.len() > self.cap {
            v.pop_front();
        }
    }

    /// Independent copy, insertion order (oldest first).
    pub fn snapshot(&self) -> Vec<IncidentRecord> {
        let v = self.inner.lock().expect("event log mutex poisoned");
        v.iter().cloned().collect()
    }

    pub fn snapshot_newest_first(&self) -> Vec<IncidentRecord> {
        let v = self.inner.lock().expect("event log mutex poisoned");
        v.iter().rev().cloned().collect()
    }

    pub fn latest(&self) -> Option<IncidentRecord> {
        let v = self.inner.lock().expect("event log mutex poisoned");
        v.back().cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("event log mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}
