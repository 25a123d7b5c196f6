//! Ledger records: payload variants, canonical encoding and content hashing.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Literal carried by the genesis record.
pub const GENESIS_BODY: &str = "Genesis Block";

/// A wallet address binding an opaque asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarClaim {
    /// Hex-encoded Ed25519 verifying key of the claimant.
    pub owner_address: String,
    /// Stored and returned verbatim; never interpreted.
    pub asset: serde_json::Value,
}

/// Record body. Only the genesis record carries `Genesis`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    Genesis,
    Claim(StarClaim),
}

impl Payload {
    /// Deterministic byte encoding used as hash input.
    ///
    /// Claims are encoded as `len(owner) || owner || asset_json`, the length
    /// prefix keeping owner/asset boundaries unambiguous. `serde_json::Value`
    /// renders objects with sorted keys, so the asset encoding is stable.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        match self {
            Payload::Genesis => GENESIS_BODY.as_bytes().to_vec(),
            Payload::Claim(claim) => {
                let owner = claim.owner_address.as_bytes();
                let asset = claim.asset.to_string();
                let mut out = Vec::with_capacity(8 + owner.len() + asset.len());
                out.extend_from_slice(&(owner.len() as u64).to_le_bytes());
                out.extend_from_slice(owner);
                out.extend_from_slice(asset.as_bytes());
                out
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Position in the chain, 0 for genesis.
    pub height: u64,
    /// Unix seconds assigned at append time.
    pub created_at: i64,
    /// Hash of the preceding record (`None` for genesis).
    pub previous_hash: Option<String>,
    pub payload: Payload,
    /// SHA-256 hex over every other field, fixed at append time.
    pub hash: String,
}

impl Record {
    /// Unsealed record; the owning ledger assigns height, time, link and hash.
    pub fn new(payload: Payload) -> Self {
        Record {
            height: 0,
            created_at: 0,
            previous_hash: None,
            payload,
            hash: String::new(),
        }
    }

    /// Hash of the record's current fields, excluding `hash` itself.
    pub fn compute_hash(&self) -> String {
        hash_concat(&[
            &self.height.to_le_bytes(),
            &self.created_at.to_le_bytes(),
            self.previous_hash.as_deref().unwrap_or_default().as_bytes(),
            &self.payload.canonical_bytes(),
        ])
    }

    /// True iff the stored hash still matches the record's fields.
    pub fn validate(&self) -> bool {
        self.compute_hash() == self.hash
    }

    /// The ownership claim, or `None` for the genesis record.
    pub fn decode_payload(&self) -> Option<&StarClaim> {
        match &self.payload {
            Payload::Claim(claim) => Some(claim),
            Payload::Genesis => None,
        }
    }
}

/// Hash inputs (concatenate as bytes, SHA-256) and return lowercase hex.
pub fn hash_concat(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for p in parts {
        hasher.update(p);
    }
    hex::encode(hasher.finalize())
}
