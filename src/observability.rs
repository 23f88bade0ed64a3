//! Logging setup and in-process counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Metrics handle for recording counters
#[derive(Debug, Default)]
pub struct Metrics {
    transactions_ingested: AtomicU64,
    ingest_rejected: AtomicU64,
    streams_opened: AtomicU64,
    streams_closed: AtomicU64,
    streams_refused: AtomicU64,
    stream_events_sent: AtomicU64,
    heartbeats_sent: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transaction_ingested(&self) {
        self.transactions_ingested.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "transactions_ingested", "Metric incremented");
    }

    pub fn ingest_rejected(&self) {
        self.ingest_rejected.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "ingest_rejected", "Metric incremented");
    }

    pub fn stream_opened(&self) {
        self.streams_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stream_closed(&self) {
        self.streams_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stream_refused(&self) {
        self.streams_refused.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "streams_refused", "Metric incremented");
    }

    pub fn stream_event_sent(&self) {
        self.stream_events_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn heartbeat_sent(&self) {
        self.heartbeats_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let opened = self.streams_opened.load(Ordering::Relaxed);
        let closed = self.streams_closed.load(Ordering::Relaxed);

        MetricsSnapshot {
            transactions_ingested: self.transactions_ingested.load(Ordering::Relaxed),
            ingest_rejected: self.ingest_rejected.load(Ordering::Relaxed),
            streams_opened: opened,
            streams_active: opened.saturating_sub(closed),
            streams_refused: self.streams_refused.load(Ordering::Relaxed),
            stream_events_sent: self.stream_events_sent.load(Ordering::Relaxed),
            heartbeats_sent: self.heartbeats_sent.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub transactions_ingested: u64,
    pub ingest_rejected: u64,
    pub streams_opened: u64,
    pub streams_active: u64,
    pub streams_refused: u64,
    pub stream_events_sent: u64,
    pub heartbeats_sent: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_streams() {
        let metrics = Metrics::new();
        metrics.stream_opened();
        metrics.stream_opened();
        metrics.stream_closed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.streams_opened, 2);
        assert_eq!(snapshot.streams_active, 1);
    }
}
