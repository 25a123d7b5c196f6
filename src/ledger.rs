//! The hash-linked ledger and its signed-challenge admission protocol.
//!
//! Records are only ever appended. Every mutation goes through
//! [`Ledger::append`], which takes `&mut self`; callers sharing a ledger
//! must hold a write lock across a whole `submit_claim` so that no two
//! appends observe the same last record.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::crypto::{normalize_address, SignatureVerifier};
use crate::record::{Payload, Record, StarClaim};

/// Maximum seconds between challenge issuance and claim submission.
pub const DEFAULT_VALIDATION_WINDOW: i64 = 300;

/// Domain tag closing every challenge message.
pub const CHALLENGE_TAG: &str = "starRegistry";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LedgerError {
    /// The challenge is older than the validation window.
    #[error("challenge expired: {elapsed}s elapsed, window is {window}s")]
    ExpiredChallenge { elapsed: i64, window: i64 },

    /// The wallet signature does not verify against the challenge.
    #[error("signature does not match address and challenge")]
    InvalidSignature,

    /// The challenge is not `address:timestamp:starRegistry`.
    #[error("malformed challenge: {0}")]
    MalformedChallenge(String),
}

pub struct Ledger {
    records: Vec<Record>,
    /// Height of the last record, `None` while empty.
    height: Option<u64>,
    window: i64,
    clock: Arc<dyn Clock>,
    verifier: Arc<dyn SignatureVerifier>,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("height", &self.height)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

impl Ledger {
    /// Fresh ledger holding only the genesis record.
    pub fn new(clock: Arc<dyn Clock>, verifier: Arc<dyn SignatureVerifier>) -> Self {
        let mut ledger = Ledger {
            records: Vec::new(),
            height: None,
            window: DEFAULT_VALIDATION_WINDOW,
            clock,
            verifier,
        };
        ledger.initialize();
        ledger
    }

    /// Rebuild a ledger from stored records, taken verbatim.
    ///
    /// Hashes are not recomputed, so tampering in storage survives the load
    /// and shows up in [`Ledger::validate_chain`]. Records past the first
    /// height gap are dropped; an empty prefix yields a fresh ledger with a
    /// new genesis record.
    pub fn restore(
        mut records: Vec<Record>,
        clock: Arc<dyn Clock>,
        verifier: Arc<dyn SignatureVerifier>,
    ) -> Self {
        let gap = contiguous_prefix(&records);
        if gap < records.len() {
            warn!(
                expected = gap,
                found = records[gap].height,
                dropped = records.len() - gap,
                "height gap in stored records; keeping contiguous prefix"
            );
            records.truncate(gap);
        }
        let height = records.last().map(|r| r.height);
        let mut ledger = Ledger {
            records,
            height,
            window: DEFAULT_VALIDATION_WINDOW,
            clock,
            verifier,
        };
        ledger.initialize();
        info!(records = ledger.records.len(), "ledger restored");
        ledger
    }

    /// Override the validation window (seconds).
    pub fn with_window(mut self, secs: i64) -> Self {
        self.window = secs;
        self
    }

    pub fn window(&self) -> i64 {
        self.window
    }

    /// Height of the last record, `None` while empty.
    pub fn height(&self) -> Option<u64> {
        self.height
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Append the genesis record if the chain is empty. Idempotent.
    pub fn initialize(&mut self) -> Option<&Record> {
        if self.height.is_some() {
            return None;
        }
        let genesis = self.append(Record::new(Payload::Genesis));
        info!(hash = %genesis.hash, "genesis record created");
        self.records.last()
    }

    /// Seal `record` onto the tip of the chain and return the stored copy.
    pub fn append(&mut self, mut record: Record) -> Record {
        record.height = self.height.map_or(0, |h| h + 1);
        record.created_at = self.clock.now();
        record.previous_hash = self.records.last().map(|prev| prev.hash.clone());
        record.hash = record.compute_hash();

        self.records.push(record.clone());
        self.height = Some(record.height);
        debug!(height = record.height, hash = %record.hash, "record appended");
        record
    }

    /// Message the wallet at `address` must sign to register a claim.
    pub fn request_ownership_challenge(&self, address: &str) -> String {
        let address = normalize_address(address);
        format!("{address}:{}:{CHALLENGE_TAG}", self.clock.now())
    }

    /// Admit a signed ownership claim.
    ///
    /// The window is checked before the signature. The owner is stored in
    /// normalized form. On any error the chain is left untouched.
    pub fn submit_claim(
        &mut self,
        address: &str,
        challenge: &str,
        signature: &str,
        asset: serde_json::Value,
    ) -> Result<Record, LedgerError> {
        let address = normalize_address(address);
        let address = address.as_str();
        let issued_at = parse_challenge_time(challenge)?;
        let now = self.clock.now();
        if issued_at > now {
            return Err(LedgerError::MalformedChallenge(format!(
                "timestamp {issued_at} is in the future"
            )));
        }

        let elapsed = now.checked_sub(issued_at).unwrap_or(i64::MAX);
        if elapsed > self.window {
            warn!(%address, elapsed, "rejected claim: challenge expired");
            return Err(LedgerError::ExpiredChallenge {
                elapsed,
                window: self.window,
            });
        }

        if !self.verifier.verify(challenge, address, signature) {
            warn!(%address, "rejected claim: invalid signature");
            return Err(LedgerError::InvalidSignature);
        }

        let record = self.append(Record::new(Payload::Claim(StarClaim {
            owner_address: address.to_string(),
            asset,
        })));
        info!(%address, height = record.height, hash = %record.hash, "claim registered");
        Ok(record)
    }

    /// First record whose hash equals `hash`. Linear scan, O(n).
    pub fn get_record_by_hash(&self, hash: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.hash == hash)
    }

    /// Record at `height`. Heights equal positions, so this is a direct index.
    pub fn get_record_by_height(&self, height: u64) -> Option<&Record> {
        usize::try_from(height)
            .ok()
            .and_then(|i| self.records.get(i))
    }

    /// Claims registered by `address`, in chain order.
    pub fn get_claims_by_owner(&self, address: &str) -> Vec<StarClaim> {
        let address = normalize_address(address);
        self.records
            .iter()
            .filter_map(Record::decode_payload)
            .filter(|c| c.owner_address == address)
            .cloned()
            .collect()
    }

    /// Corrupt records in chain order; empty means the chain is intact.
    ///
    /// A record is corrupt if its own hash no longer matches its fields, or
    /// if its successor's back-link does not point at it.
    pub fn validate_chain(&self) -> Vec<Record> {
        let mut corrupt = Vec::new();
        for (i, record) in self.records.iter().enumerate() {
            let broken_link = self
                .records
                .get(i + 1)
                .is_some_and(|next| next.previous_hash.as_deref() != Some(record.hash.as_str()));
            if !record.validate() || broken_link {
                corrupt.push(record.clone());
            }
        }
        corrupt
    }
}

/// Number of leading records whose height equals their position.
pub fn contiguous_prefix(records: &[Record]) -> usize {
    records
        .iter()
        .enumerate()
        .take_while(|(i, r)| r.height == *i as u64)
        .count()
}

/// Extract the issue time from `address:timestamp:starRegistry`.
///
/// Parsed from the right so the address segment may itself contain colons.
fn parse_challenge_time(challenge: &str) -> Result<i64, LedgerError> {
    let mut parts = challenge.rsplitn(3, ':');
    let (Some(tag), Some(ts), Some(address)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(LedgerError::MalformedChallenge(
            "expected address:timestamp:tag".into(),
        ));
    };
    if tag != CHALLENGE_TAG {
        return Err(LedgerError::MalformedChallenge(format!("unknown tag {tag:?}")));
    }
    if address.is_empty() {
        return Err(LedgerError::MalformedChallenge("empty address".into()));
    }
    match ts.parse::<i64>() {
        Ok(secs) if secs >= 0 => Ok(secs),
        _ => Err(LedgerError::MalformedChallenge(format!("bad timestamp {ts:?}"))),
    }
}
