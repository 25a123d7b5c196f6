//! HTTP routes for requesting challenges, registering stars and auditing the chain.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::AppError;
use crate::record::{Record, StarClaim};
use crate::AppState;

#[derive(Deserialize)]
pub struct ChallengeRequest {
    pub address: String,
}

#[derive(Serialize, Deserialize)]
pub struct ChallengeResponse {
    pub challenge: String,
}

#[derive(Deserialize)]
pub struct SubmitStar {
    pub address: String,
    /// The challenge previously issued by `/requestValidation`.
    pub message: String,
    /// Hex Ed25519 signature over `message`.
    pub signature: String,
    pub star: serde_json::Value,
}

/// POST /requestValidation
pub async fn request_validation(
    State(state): State<AppState>,
    Json(req): Json<ChallengeRequest>,
) -> Result<Json<ChallengeResponse>, AppError> {
    let address = req.address.trim();
    if address.is_empty() {
        return Err(AppError::Validation("address must not be empty".into()));
    }
    let guard = state.ledger.read().await;
    Ok(Json(ChallengeResponse {
        challenge: guard.request_ownership_challenge(address),
    }))
}

/// POST /submitstar
pub async fn submit_star(
    State(state): State<AppState>,
    Json(req): Json<SubmitStar>,
) -> Result<Json<Record>, AppError> {
    let address = req.address.trim();
    if address.is_empty() {
        return Err(AppError::Validation("address must not be empty".into()));
    }

    // Write lock spans check, append and save, so disk order follows chain order.
    let mut guard = state.ledger.write().await;
    let record = guard.submit_claim(address, &req.message, &req.signature, req.star)?;
    if let Err(e) = state.store.save(&record) {
        error!(height = record.height, error = %e, "failed to persist record");
        return Err(e.into());
    }
    drop(guard);
    Ok(Json(record))
}

/// GET /block/height/:height
pub async fn block_by_height(
    State(state): State<AppState>,
    Path(height): Path<u64>,
) -> Result<Json<Record>, AppError> {
    let guard = state.ledger.read().await;
    guard
        .get_record_by_height(height)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no record at height {height}")))
}

/// GET /block/hash/:hash
pub async fn block_by_hash(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<Record>, AppError> {
    let guard = state.ledger.read().await;
    guard
        .get_record_by_hash(&hash)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no record with hash {hash}")))
}

/// GET /blocks/:address
pub async fn claims_by_owner(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Json<Vec<StarClaim>> {
    let guard = state.ledger.read().await;
    Json(guard.get_claims_by_owner(&address))
}

#[derive(Serialize, Deserialize)]
pub struct ValidateResp {
    pub ok: bool,
    /// Corrupt records, in chain order.
    pub errors: Vec<Record>,
}

/// GET /validate
pub async fn validate_chain(State(state): State<AppState>) -> Json<ValidateResp> {
    let guard = state.ledger.read().await;
    let errors = guard.validate_chain();
    Json(ValidateResp {
        ok: errors.is_empty(),
        errors,
    })
}

#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
}

/// GET /health
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

#[derive(Serialize)]
pub struct Version {
    pub version: &'static str,
    pub git_sha: Option<&'static str>,
}

/// GET /version
pub async fn version() -> Json<Version> {
    Json(Version {
        version: env!("CARGO_PKG_VERSION"),
        git_sha: option_env!("GIT_SHA"),
    })
}
