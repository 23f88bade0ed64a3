use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::ledger::TransactionStore;
use crate::observability::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<TransactionStore>,
    pub metrics: Arc<Metrics>,
    /// One permit per open tail stream
    pub stream_slots: Arc<Semaphore>,
    /// Cancelled on server shutdown so open streams end
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: Config, store: TransactionStore) -> Self {
        let stream_slots = Arc::new(Semaphore::new(config.stream.max_connections));

        Self {
            config: Arc::new(config),
            store: Arc::new(store),
            metrics: Arc::new(Metrics::new()),
            stream_slots,
            shutdown: CancellationToken::new(),
        }
    }
}
