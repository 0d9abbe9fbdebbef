//! Request statistics for the time-series service

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of service request statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceStats {
    /// Requests handed to the transport, token fetches excluded
    pub requests_sent: u64,
    /// Successful pages of range reads
    pub pages_fetched: u64,
    /// Requests that were rejected or answered outside 2xx
    pub failed_requests: u64,
}

/// Live counters, updated without locking
#[derive(Debug, Default)]
pub struct RequestCounters {
    requests_sent: AtomicU64,
    pages_fetched: AtomicU64,
    failed_requests: AtomicU64,
}

impl RequestCounters {
    pub fn record_request(&self) {
        self.requests_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_page(&self) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ServiceStats {
        ServiceStats {
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
        }
    }
}
