use axum::{
    Router,
    http::{HeaderValue, header},
    middleware,
    routing::get,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::info;

use super::{
    auth::require_api_key,
    services::{health, home, ingest_transaction, list_transactions, preflight},
    state::AppState,
    stream::stream_transactions,
};
use crate::config::Config;
use crate::ledger::TransactionStore;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Builds the application router.
///
/// The API key is checked on the data methods only; preflights, `/` and
/// `/health` are open. Every response allows any origin.
pub fn router(state: AppState) -> Router {
    let auth = middleware::from_fn_with_state(state.clone(), require_api_key);

    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route(
            "/api/transactions",
            get(list_transactions)
                .post(ingest_transaction)
                .route_layer(auth.clone())
                .options(preflight),
        )
        .route(
            "/api/stream",
            get(stream_transactions).route_layer(auth).options(preflight),
        )
        .with_state(state)
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
}

pub async fn serve(config: Config) -> Result<(), AnyError> {
    let address = config.server.bind_addr;

    info!(path = %config.store.database_path.display(), "Opening transaction store");
    let store = TransactionStore::open(
        &config.store.database_path,
        config.store.pool_size,
        config.store.busy_timeout.as_duration(),
    )
    .map_err(|e| format!("Failed to open transaction store: {}", e))?;

    let state = AppState::new(config, store);
    let shutdown = state.shutdown.clone();
    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "AutoBill API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM and cancels `streams` so open tail
/// connections end and graceful shutdown can complete.
async fn shutdown_signal(streams: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())
            .expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
    streams.cancel();
}
