//! Tail stream endpoint (GET /api/stream)
//!
//! Each connection gets its own task that polls the store for rows newer
//! than its cursor and pushes them, oldest first, into a bounded channel
//! that backs the `text/event-stream` response body:
//!
//! ```text
//! data: {"id":7,"name":"bananas","price":1.5,"units":"kg",...}
//!
//! : keep-alive
//!
//! ```
//!
//! The cursor only moves after a row has been handed to the channel. When
//! the client goes away hyper drops the body, the channel closes, and the
//! task stops at its next send or sleep. Clients resume with
//! `?since=<last id they saw>`.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{HeaderName, Uri, header},
    response::{
        IntoResponse,
        sse::{Event, Sse},
    },
};
use tokio::sync::{OwnedSemaphorePermit, mpsc};
use tokio::time::Instant;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{error::ApiError, models::Transaction, state::AppState, utils::cursor_from_uri};
use crate::config::StreamConfig;
use crate::ledger::TransactionStore;
use crate::observability::Metrics;

const KEEP_ALIVE_COMMENT: &str = "keep-alive";
const MAX_BACKOFF: Duration = Duration::from_secs(30);

type Frame = Result<Event, Infallible>;

/// Cursor and heartbeat bookkeeping for one stream
#[derive(Debug, Clone)]
pub struct Tailer {
    cursor: i64,
    last_emit: Instant,
    heartbeat_interval: Duration,
}

impl Tailer {
    pub fn new(cursor: i64, now: Instant, heartbeat_interval: Duration) -> Self {
        Self {
            cursor,
            last_emit: now,
            heartbeat_interval,
        }
    }

    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    /// Rows at or below the cursor were already emitted
    pub fn accepts(&self, row: &Transaction) -> bool {
        row.id > self.cursor
    }

    /// Record that `id` has been emitted
    pub fn advance(&mut self, id: i64, now: Instant) {
        debug_assert!(id > self.cursor);
        self.cursor = id;
        self.last_emit = now;
    }

    pub fn heartbeat_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_emit) >= self.heartbeat_interval
    }

    pub fn mark_heartbeat(&mut self, now: Instant) {
        self.last_emit = now;
    }
}

/// Why a tail task stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailExit {
    ClientGone,
    LifetimeExpired,
    ShuttingDown,
    StoreUnavailable,
    EncodeFailed,
}

/// Stream settings resolved from [`StreamConfig`]
#[derive(Debug, Clone, Copy)]
pub struct TailSettings {
    pub poll_interval: Duration,
    pub heartbeat_interval: Duration,
    pub batch_size: usize,
    pub max_lifetime: Option<Duration>,
    pub max_consecutive_failures: u32,
}

impl From<&StreamConfig> for TailSettings {
    fn from(config: &StreamConfig) -> Self {
        Self {
            poll_interval: config.poll_interval.as_duration(),
            heartbeat_interval: config.heartbeat_interval.as_duration(),
            batch_size: config.batch_size,
            max_lifetime: config.max_lifetime.map(|d| d.as_duration()),
            max_consecutive_failures: config.max_consecutive_failures,
        }
    }
}

/// Delay before the next poll after `failures` consecutive store errors
fn backoff(poll_interval: Duration, failures: u32) -> Duration {
    poll_interval.saturating_mul(failures.max(1)).min(MAX_BACKOFF)
}

fn transaction_event(row: &Transaction) -> Result<Event, axum::Error> {
    Event::default().json_data(row)
}

fn heartbeat_event() -> Event {
    Event::default().comment(KEEP_ALIVE_COMMENT)
}

/// Tail stream endpoint (GET /api/stream?since=<id>)
///
/// Authentication runs in middleware, before anything is streamed. The
/// request is refused with 503 when `stream.max_connections` streams are
/// already open.
pub async fn stream_transactions(
    State(state): State<AppState>,
    uri: Uri,
) -> Result<impl IntoResponse, ApiError> {
    let cursor = cursor_from_uri(&uri);
    let limit = state.config.stream.max_connections;

    let permit = Arc::clone(&state.stream_slots)
        .try_acquire_owned()
        .map_err(|_| {
            state.metrics.stream_refused();
            warn!(limit, "Refusing stream, connection limit reached");
            ApiError::StreamLimitReached(limit)
        })?;

    let settings = TailSettings::from(&state.config.stream);
    let (tx, rx) = mpsc::channel::<Frame>(state.config.stream.channel_capacity);

    state.metrics.stream_opened();
    info!(cursor, "Tail stream opened");

    let task = TailTask {
        store: Arc::clone(&state.store),
        metrics: Arc::clone(&state.metrics),
        shutdown: state.shutdown.clone(),
        settings,
        tx,
    };
    tokio::spawn(task.run(Tailer::new(cursor, Instant::now(), settings.heartbeat_interval), permit));

    let headers = [
        (header::CONNECTION, "keep-alive"),
        (HeaderName::from_static("x-accel-buffering"), "no"),
    ];
    Ok((headers, Sse::new(ReceiverStream::new(rx))))
}

struct TailTask {
    store: Arc<TransactionStore>,
    metrics: Arc<Metrics>,
    shutdown: CancellationToken,
    settings: TailSettings,
    tx: mpsc::Sender<Frame>,
}

impl TailTask {
    async fn run(self, mut tailer: Tailer, permit: OwnedSemaphorePermit) {
        let exit = self.poll_loop(&mut tailer).await;

        self.metrics.stream_closed();
        info!(?exit, cursor = tailer.cursor(), "Tail stream closed");
        drop(permit);
    }

    async fn poll_loop(&self, tailer: &mut Tailer) -> TailExit {
        let deadline = self.settings.max_lifetime.map(|d| Instant::now() + d);
        let mut failures: u32 = 0;

        loop {
            let store = Arc::clone(&self.store);
            let cursor = tailer.cursor();
            let batch_size = self.settings.batch_size;
            let polled = tokio::task::spawn_blocking(move || store.since(cursor, batch_size)).await;

            let delay = match polled {
                Ok(Ok(rows)) => {
                    failures = 0;
                    if let Err(exit) = self.emit(tailer, rows).await {
                        return exit;
                    }
                    self.settings.poll_interval
                }
                Ok(Err(err)) => {
                    failures += 1;
                    warn!(error = %err, cursor, failures, "Stream poll failed");
                    if failures >= self.settings.max_consecutive_failures {
                        return TailExit::StoreUnavailable;
                    }
                    backoff(self.settings.poll_interval, failures)
                }
                Err(err) => {
                    failures += 1;
                    warn!(error = %err, cursor, failures, "Stream poll task failed");
                    if failures >= self.settings.max_consecutive_failures {
                        return TailExit::StoreUnavailable;
                    }
                    backoff(self.settings.poll_interval, failures)
                }
            };

            let mut wake = Instant::now() + delay;
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return TailExit::LifetimeExpired;
                }
                wake = wake.min(deadline);
            }

            tokio::select! {
                _ = tokio::time::sleep_until(wake) => {}
                _ = self.tx.closed() => return TailExit::ClientGone,
                _ = self.shutdown.cancelled() => return TailExit::ShuttingDown,
            }
        }
    }

    /// Sends one polled batch, or a heartbeat when the batch is empty.
    /// Returns the number of transaction events sent.
    async fn emit(&self, tailer: &mut Tailer, rows: Vec<Transaction>) -> Result<usize, TailExit> {
        if rows.is_empty() {
            let now = Instant::now();
            if tailer.heartbeat_due(now) {
                self.send(heartbeat_event()).await?;
                tailer.mark_heartbeat(now);
                self.metrics.heartbeat_sent();
            }
            return Ok(0);
        }

        let mut sent = 0usize;
        for row in &rows {
            if !tailer.accepts(row) {
                continue;
            }
            let event = transaction_event(row).map_err(|err| {
                warn!(error = %err, id = row.id, "Failed to encode stream event");
                TailExit::EncodeFailed
            })?;
            self.send(event).await?;
            tailer.advance(row.id, Instant::now());
            self.metrics.stream_event_sent();
            sent += 1;
        }
        debug!(cursor = tailer.cursor(), sent, "Stream batch sent");

        Ok(sent)
    }

    async fn send(&self, event: Event) -> Result<(), TailExit> {
        tokio::select! {
            sent = self.tx.send(Ok(event)) => sent.map_err(|_| TailExit::ClientGone),
            _ = self.shutdown.cancelled() => Err(TailExit::ShuttingDown),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64) -> Transaction {
        Transaction {
            id,
            name: format!("row-{id}"),
            price: 1.0,
            units: "units".to_string(),
            taken: 1,
            payable: 1.0,
            created_at: "2024-05-01T10:00:00.000000Z".to_string(),
        }
    }

    #[test]
    fn test_tailer_advances_and_filters() {
        let start = Instant::now();
        let mut tailer = Tailer::new(3, start, Duration::from_secs(15));

        assert!(!tailer.accepts(&row(3)));
        assert!(tailer.accepts(&row(4)));

        tailer.advance(4, start);
        assert_eq!(tailer.cursor(), 4);
        assert!(!tailer.accepts(&row(4)));
    }

    #[test]
    fn test_heartbeat_due_after_idle_interval() {
        let start = Instant::now();
        let mut tailer = Tailer::new(0, start, Duration::from_secs(15));

        assert!(!tailer.heartbeat_due(start + Duration::from_secs(14)));
        assert!(tailer.heartbeat_due(start + Duration::from_secs(15)));

        tailer.mark_heartbeat(start + Duration::from_secs(15));
        assert!(!tailer.heartbeat_due(start + Duration::from_secs(16)));
        assert!(tailer.heartbeat_due(start + Duration::from_secs(30)));
    }

    #[test]
    fn test_data_resets_heartbeat_timer() {
        let start = Instant::now();
        let mut tailer = Tailer::new(0, start, Duration::from_secs(15));

        tailer.advance(1, start + Duration::from_secs(10));
        assert!(!tailer.heartbeat_due(start + Duration::from_secs(20)));
        assert!(tailer.heartbeat_due(start + Duration::from_secs(25)));
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let poll = Duration::from_secs(1);
        assert_eq!(backoff(poll, 1), Duration::from_secs(1));
        assert_eq!(backoff(poll, 3), Duration::from_secs(3));
        assert_eq!(backoff(poll, 100), MAX_BACKOFF);
    }

    #[tokio::test]
    async fn test_emit_skips_rows_at_or_below_cursor() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let store =
            TransactionStore::open(temp_dir.path().join("emit.db"), 1, Duration::from_secs(1))
                .unwrap();
        let (tx, mut rx) = mpsc::channel::<Frame>(8);
        let task = TailTask {
            store: Arc::new(store),
            metrics: Arc::new(Metrics::new()),
            shutdown: CancellationToken::new(),
            settings: TailSettings::from(&StreamConfig::default()),
            tx,
        };
        let mut tailer = Tailer::new(2, Instant::now(), Duration::from_secs(15));

        let sent = task
            .emit(&mut tailer, vec![row(1), row(2), row(3), row(4)])
            .await
            .unwrap();

        assert_eq!(sent, 2);
        assert_eq!(tailer.cursor(), 4);
        assert_eq!(task.metrics.snapshot().stream_events_sent, 2);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_settings_from_config() {
        let settings = TailSettings::from(&StreamConfig::default());
        assert_eq!(settings.poll_interval, Duration::from_secs(1));
        assert_eq!(settings.heartbeat_interval, Duration::from_secs(15));
        assert_eq!(settings.batch_size, 100);
        assert_eq!(settings.max_lifetime, None);
    }
}
