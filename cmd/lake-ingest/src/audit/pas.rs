//! Provenance audit stream: an append-only NDJSON file where every event
//! hashes its predecessor. `event_hash` covers the canonical JSON of the
//! event minus the hash field itself; the first event links to the zero
//! sentinel.

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::audit::{hash_without_field, manifest::TableSummary};

pub const ZERO_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("serializing pas event: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("writing pas chain {path}: {error}")]
    Write { path: PathBuf, error: std::io::Error },

    #[error("reading pas chain {path}: {error}")]
    Read { path: PathBuf, error: std::io::Error },

    #[error("pas chain broken at event {index}: {reason}")]
    ChainBroken { index: usize, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Producer {
    pub id: String,
    pub version: String,
    pub network: String,
    pub era: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasEvent {
    pub prev_hash: String,
    pub producer: Producer,
    pub ledger_start: u32,
    pub ledger_end: u32,
    pub ledger_count: u32,
    pub table_summaries: Vec<TableSummary>,
    pub manifest_checksum: String,
    pub total_rows: u64,
    pub duration_ms: u64,
    pub emitted_at: i64,
    pub event_hash: String,
}

pub struct BatchAudit<'a> {
    pub ledger_start: u32,
    pub ledger_end: u32,
    pub ledger_count: u32,
    pub table_summaries: Vec<TableSummary>,
    pub manifest_checksum: &'a str,
    pub total_rows: u64,
    pub duration_ms: u64,
}

/// Owns `pas/chain.log` and its rotated copies under `pas/backup/`. The
/// in-memory `prev_hash` only advances after a successful append+fsync.
pub struct PasEmitter {
    path: PathBuf,
    backup_dir: PathBuf,
    producer: Producer,
    prev_hash: String,
    events_emitted: u64,
    strict: bool,
    backup_every: u64,
}

impl PasEmitter {
    pub fn open(
        working_dir: &Path,
        producer: Producer,
        strict: bool,
        backup_every: u64,
    ) -> Result<Self, Error> {
        let path = working_dir.join("pas").join("chain.log");
        let backup_dir = working_dir.join("pas").join("backup");
        let (prev_hash, events_emitted) = match read_chain(&path) {
            Ok(events) => (
                events
                    .last()
                    .map_or_else(|| ZERO_HASH.to_string(), |e| e.event_hash.clone()),
                events.len() as u64,
            ),
            Err(Error::Read { .. }) => (ZERO_HASH.to_string(), 0),
            Err(e) => return Err(e),
        };
        Ok(Self {
            path,
            backup_dir,
            producer,
            prev_hash,
            events_emitted,
            strict,
            backup_every,
        })
    }

    pub fn prev_hash(&self) -> &str {
        &self.prev_hash
    }

    /// Appends one audit event for a flushed batch. In strict mode any
    /// failure propagates; otherwise it is logged and the chain head stays
    /// where it was. Returns `(event_index, event_hash)` on success.
    pub fn emit_batch(&mut self, batch: BatchAudit) -> Result<Option<(u64, String)>, Error> {
        match self.try_emit(&batch) {
            Ok(emitted) => Ok(Some(emitted)),
            Err(e) if self.strict => Err(e),
            Err(e) => {
                warn!(
                    ledger_start = batch.ledger_start,
                    ledger_end = batch.ledger_end,
                    "pas emission failed, chain head not advanced: {e}"
                );
                Ok(None)
            }
        }
    }

    fn try_emit(&mut self, batch: &BatchAudit) -> Result<(u64, String), Error> {
        let mut event = PasEvent {
            prev_hash: self.prev_hash.clone(),
            producer: self.producer.clone(),
            ledger_start: batch.ledger_start,
            ledger_end: batch.ledger_end,
            ledger_count: batch.ledger_count,
            table_summaries: batch.table_summaries.clone(),
            manifest_checksum: batch.manifest_checksum.to_string(),
            total_rows: batch.total_rows,
            duration_ms: batch.duration_ms,
            emitted_at: chrono::Utc::now().timestamp(),
            event_hash: String::new(),
        };
        event.event_hash = hash_without_field(&event, "event_hash")?;

        let line = serde_json::to_string(&event)?;
        let append = || -> std::io::Result<()> {
            if let Some(dir) = self.path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;
            writeln!(file, "{line}")?;
            file.sync_all()?;
            Ok(())
        };
        append().map_err(|error| Error::Write {
            path: self.path.clone(),
            error,
        })?;

        self.prev_hash = event.event_hash.clone();
        self.events_emitted += 1;

        if self.backup_every > 0 && self.events_emitted % self.backup_every == 0 {
            self.rotate_backup();
        }

        Ok((self.events_emitted, event.event_hash))
    }

    /// Best-effort rotated copy of the chain; verification can rebuild the
    /// head from here when the live file is lost.
    fn rotate_backup(&self) {
        let target = self
            .backup_dir
            .join(format!("chain-{}.log", self.events_emitted));
        let copy = || -> std::io::Result<()> {
            std::fs::create_dir_all(&self.backup_dir)?;
            std::fs::copy(&self.path, &target)?;
            Ok(())
        };
        match copy() {
            Ok(()) => info!(backup = %target.display(), "rotated pas backup"),
            Err(e) => warn!("rotating pas backup: {e}"),
        }
    }

    /// Replays the whole chain file, recomputing every hash from the first
    /// event forward.
    pub fn verify_chain_integrity(&self) -> Result<usize, Error> {
        verify_chain(&self.path)
    }
}

fn read_chain(path: &Path) -> Result<Vec<PasEvent>, Error> {
    let raw = std::fs::read_to_string(path).map_err(|error| Error::Read {
        path: path.to_path_buf(),
        error,
    })?;
    raw.lines()
        .enumerate()
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|e| Error::ChainBroken {
                index,
                reason: format!("unparseable event: {e}"),
            })
        })
        .collect()
}

/// Full-chain verification for one PAS file. Returns the chain length.
pub fn verify_chain(path: &Path) -> Result<usize, Error> {
    let events = read_chain(path)?;
    let mut expected_prev = ZERO_HASH.to_string();
    for (index, event) in events.iter().enumerate() {
        if event.prev_hash != expected_prev {
            return Err(Error::ChainBroken {
                index,
                reason: format!(
                    "prev_hash {} does not match expected {expected_prev}",
                    event.prev_hash
                ),
            });
        }
        let computed = hash_without_field(event, "event_hash")?;
        if computed != event.event_hash {
            return Err(Error::ChainBroken {
                index,
                reason: format!(
                    "event_hash {} does not match recomputed {computed}",
                    event.event_hash
                ),
            });
        }
        expected_prev = event.event_hash.clone();
    }
    Ok(events.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn producer() -> Producer {
        Producer {
            id: "stellar-lake-ingest".to_string(),
            version: "0.4.2".to_string(),
            network: "testnet".to_string(),
            era: "era-test".to_string(),
        }
    }

    fn batch(start: u32, end: u32) -> BatchAudit<'static> {
        BatchAudit {
            ledger_start: start,
            ledger_end: end,
            ledger_count: end - start + 1,
            table_summaries: Vec::new(),
            manifest_checksum: "deadbeef",
            total_rows: 42,
            duration_ms: 10,
        }
    }

    #[test]
    fn first_event_links_to_zero_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let mut emitter = PasEmitter::open(dir.path(), producer(), true, 0).unwrap();
        assert_eq!(emitter.prev_hash(), ZERO_HASH);

        let (index, hash) = emitter.emit_batch(batch(100, 149)).unwrap().unwrap();
        assert_eq!(index, 1);
        assert_eq!(emitter.prev_hash(), hash);

        let events = read_chain(&dir.path().join("pas/chain.log")).unwrap();
        assert_eq!(events[0].prev_hash, ZERO_HASH);
    }

    #[test]
    fn chain_of_four_verifies(){
        let dir = tempfile::tempdir().unwrap();
        let mut emitter = PasEmitter::open(dir.path(), producer(), true, 0).unwrap();
        for k in 0..4u32 {
            let start = 100 + 50 * k;
            emitter.emit_batch(batch(start, start + 49)).unwrap();
        }
        assert_eq!(emitter.verify_chain_integrity().unwrap(), 4);
    }

    #[test]
    fn reopening_resumes_the_chain_head() {
        let dir = tempfile::tempdir().unwrap();
        let head = {
            let mut emitter = PasEmitter::open(dir.path(), producer(), true, 0).unwrap();
            emitter.emit_batch(batch(100, 149)).unwrap();
            emitter.prev_hash().to_string()
        };
        let emitter = PasEmitter::open(dir.path(), producer(), true, 0).unwrap();
        assert_eq!(emitter.prev_hash(), head);
        assert_eq!(emitter.events_emitted, 1);
    }

    #[test]
    fn tampered_event_breaks_the_chain() {
        let dir = tempfile::tempdir().unwrap();
        let mut emitter = PasEmitter::open(dir.path(), producer(), true, 0).unwrap();
        emitter.emit_batch(batch(100, 149)).unwrap();
        emitter.emit_batch(batch(150, 199)).unwrap();

        let path = dir.path().join("pas/chain.log");
        let raw = std::fs::read_to_string(&path)
            .unwrap()
            .replace("\"total_rows\":42", "\"total_rows\":43");
        std::fs::write(&path, raw).unwrap();

        let err = verify_chain(&path).unwrap_err();
        assert!(matches!(err, Error::ChainBroken { index: 0, .. }));
    }

    #[test]
    fn non_strict_failure_keeps_chain_head() {
        let dir = tempfile::tempdir().unwrap();
        let mut emitter = PasEmitter::open(dir.path(), producer(), false, 0).unwrap();
        // Point the emitter at an unwritable path to force an IO error.
        emitter.path = dir.path().join("missing").join("chain.log");
        std::fs::write(dir.path().join("missing"), b"a file, not a dir").unwrap();

        let outcome = emitter.emit_batch(batch(100, 149)).unwrap();
        assert!(outcome.is_none());
        assert_eq!(emitter.prev_hash(), ZERO_HASH);
    }

    #[test]
    fn backups_rotate_on_schedule() {
        let dir = tempfile::tempdir().unwrap();
        let mut emitter = PasEmitter::open(dir.path(), producer(), true, 2).unwrap();
        for k in 0..4u32 {
            let start = 100 + 50 * k;
            emitter.emit_batch(batch(start, start + 49)).unwrap();
        }
        assert!(dir.path().join("pas/backup/chain-2.log").is_file());
        assert!(dir.path().join("pas/backup/chain-4.log").is_file());
    }
}
