//! Pluggable record persistence.
//!
//! The ledger itself is volatile; the server loads stored records at
//! startup and saves each record after it is appended.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing::warn;

use crate::record::Record;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Backend that records are loaded from and saved to.
pub trait RecordStore: Send + Sync {
    /// All stored records, sorted by height.
    fn load(&self) -> Result<Vec<Record>, StorageError>;

    /// Persist one record, replacing any record stored at the same height.
    fn save(&self, record: &Record) -> Result<(), StorageError>;

    /// Delete every stored record at `height` or above.
    fn prune_from(&self, height: u64) -> Result<(), StorageError>;
}

/// Keeps records in process memory only.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<Record>>,
}

impl RecordStore for MemoryStore {
    fn load(&self) -> Result<Vec<Record>, StorageError> {
        let guard = self.records.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(guard.clone())
    }

    fn save(&self, record: &Record) -> Result<(), StorageError> {
        let mut guard = self.records.lock().map_err(|_| StorageError::Poisoned)?;
        guard.retain(|r| r.height != record.height);
        guard.push(record.clone());
        guard.sort_by_key(|r| r.height);
        Ok(())
    }

    fn prune_from(&self, height: u64) -> Result<(), StorageError> {
        let mut guard = self.records.lock().map_err(|_| StorageError::Poisoned)?;
        guard.retain(|r| r.height < height);
        Ok(())
    }
}

/// One pretty-printed `block_<height>.json` per record.
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        ensure_dir(&dir)?;
        Ok(JsonDirStore { dir })
    }

    /// Compute the JSON filename for a record height.
    pub fn block_path(&self, height: u64) -> PathBuf {
        self.dir.join(format!("block_{height}.json"))
    }
}

impl RecordStore for JsonDirStore {
    /// Load all `*.json` files and sort by height. Files that do not parse as
    /// a record are skipped with a warning.
    fn load(&self) -> Result<Vec<Record>, StorageError> {
        ensure_dir(&self.dir)?;
        let mut out = vec![];
        for entry in fs::read_dir(&self.dir)? {
            let p = entry?.path();
            if p.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let mut buf = String::new();
            File::open(&p)?.read_to_string(&mut buf)?;
            match serde_json::from_str::<Record>(&buf) {
                Ok(record) => out.push(record),
                Err(e) => warn!(path = %p.display(), error = %e, "skipping unreadable record file"),
            }
        }
        out.sort_by_key(|r| r.height);
        Ok(out)
    }

    fn save(&self, record: &Record) -> Result<(), StorageError> {
        ensure_dir(&self.dir)?;
        let json = serde_json::to_string_pretty(record)?;
        let mut f = File::create(self.block_path(record.height))?;
        f.write_all(json.as_bytes())?;
        Ok(())
    }

    fn prune_from(&self, height: u64) -> Result<(), StorageError> {
        for entry in fs::read_dir(&self.dir)? {
            let p = entry?.path();
            let stored_height = p
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_prefix("block_"))
                .and_then(|n| n.strip_suffix(".json"))
                .and_then(|n| n.parse::<u64>().ok());
            if stored_height.is_some_and(|h| h >= height) {
                fs::remove_file(&p)?;
            }
        }
        Ok(())
    }
}

/// Ensure that the given directory exists (create recursively if needed).
pub fn ensure_dir(dir: &Path) -> std::io::Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Payload, StarClaim};

    fn record(height: u64, owner: &str) -> Record {
        let mut r = Record::new(Payload::Claim(StarClaim {
            owner_address: owner.into(),
            asset: serde_json::json!({"story": owner}),
        }));
        r.height = height;
        r.created_at = 1_700_000_000 + height as i64;
        r.hash = r.compute_hash();
        r
    }

    #[test]
    fn json_dir_store_loads_sorted_by_height() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::open(dir.path().join("data")).unwrap();
        for h in [2, 0, 10, 1] {
            store.save(&record(h, "alice")).unwrap();
        }
        let heights: Vec<_> = store.load().unwrap().iter().map(|r| r.height).collect();
        assert_eq!(heights, vec![0, 1, 2, 10]);
        assert!(store.block_path(10).exists());
    }

    #[test]
    fn json_dir_store_preserves_records_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::open(dir.path()).unwrap();
        let r = record(0, "alice");
        store.save(&r).unwrap();
        assert_eq!(store.load().unwrap(), vec![r]);
    }

    #[test]
    fn json_dir_store_skips_junk_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::open(dir.path()).unwrap();
        store.save(&record(0, "alice")).unwrap();
        fs::write(dir.path().join("block_1.json"), "{not json").unwrap();
        fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn json_dir_store_prunes_from_height() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::open(dir.path()).unwrap();
        for h in [0, 1, 3, 12] {
            store.save(&record(h, "alice")).unwrap();
        }
        fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        store.prune_from(2).unwrap();

        let heights: Vec<_> = store.load().unwrap().iter().map(|r| r.height).collect();
        assert_eq!(heights, vec![0, 1]);
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn memory_store_prunes_from_height() {
        let store = MemoryStore::default();
        for h in [0, 1, 2] {
            store.save(&record(h, "alice")).unwrap();
        }
        store.prune_from(1).unwrap();
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn memory_store_replaces_same_height() {
        let store = MemoryStore::default();
        store.save(&record(1, "alice")).unwrap();
        store.save(&record(0, "alice")).unwrap();
        store.save(&record(1, "bob")).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].decode_payload().unwrap().owner_address, "bob");
    }
}
