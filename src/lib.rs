//! Star notary: a tamper-evident, append-only ledger of signed star
//! ownership claims, plus the HTTP surface that exposes it.

pub mod clock;
pub mod config;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod record;
pub mod routes;
pub mod storage;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use clock::Clock;
use crypto::SignatureVerifier;
use ledger::{contiguous_prefix, Ledger};
use storage::{RecordStore, StorageError};

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<RwLock<Ledger>>,
    pub store: Arc<dyn RecordStore>,
}

impl AppState {
    /// Restore the ledger from `store`, seeding and saving a genesis record
    /// when the store is empty. Records past a height gap are pruned from
    /// the store. Corrupt records are logged, not rejected.
    pub fn load(
        store: Arc<dyn RecordStore>,
        clock: Arc<dyn Clock>,
        verifier: Arc<dyn SignatureVerifier>,
        window: i64,
    ) -> Result<Self, StorageError> {
        let stored = store.load()?;
        let stored_len = stored.len();
        let kept = contiguous_prefix(&stored);
        let ledger = Ledger::restore(stored, clock, verifier).with_window(window);

        if kept < stored_len {
            store.prune_from(kept as u64)?;
        }
        for record in &ledger.records()[kept..] {
            store.save(record)?;
        }
        for bad in ledger.validate_chain() {
            warn!(height = bad.height, hash = %bad.hash, "corrupt record in stored chain");
        }
        info!(height = ?ledger.height(), window, "ledger ready");

        Ok(AppState {
            ledger: Arc::new(RwLock::new(ledger)),
            store,
        })
    }
}

/// Build the HTTP router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/requestValidation", post(routes::request_validation))
        .route("/submitstar", post(routes::submit_star))
        .route("/block/height/:height", get(routes::block_by_height))
        .route("/block/hash/:hash", get(routes::block_by_hash))
        .route("/blocks/:address", get(routes::claims_by_owner))
        .route("/validate", get(routes::validate_chain))
        .route("/health", get(routes::health))
        .route("/version", get(routes::version))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
