use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    audit::{hash_without_field, sha256_hex},
    model::TableStat,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("serializing manifest: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("writing manifest {path}: {error}")]
    Write { path: PathBuf, error: std::io::Error },

    #[error("reading manifest {path}: {error}")]
    Read { path: PathBuf, error: std::io::Error },

    #[error("manifest checksum mismatch: stored {stored}, computed {computed}")]
    ChecksumMismatch { stored: String, computed: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSummary {
    pub name: String,
    pub row_count: u64,
    pub checksum: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub producer_version: String,
    pub ledger_start: u32,
    pub ledger_end: u32,
    pub ledger_count: u32,
    pub total_rows: u64,
    pub generated_at: String,
    pub tables: Vec<TableSummary>,
    pub manifest_checksum: String,
}

/// Cheap per-table fingerprint a resolver can recompute to detect
/// truncation without scanning rows.
fn table_checksum(table: &str, row_count: u64, ledger_start: u32, ledger_end: u32) -> String {
    sha256_hex(&format!("{table}:{row_count}:{ledger_start}:{ledger_end}"))
}

/// Builds the batch manifest from the written-table stats. The manifest
/// checksum covers the canonical JSON of every other field.
pub fn build(
    producer_version: &str,
    ledger_start: u32,
    ledger_end: u32,
    ledger_count: u32,
    written: &[TableStat],
) -> Result<Manifest, Error> {
    let tables: Vec<TableSummary> = written
        .iter()
        .map(|stat| TableSummary {
            name: stat.table.clone(),
            row_count: stat.row_count,
            checksum: table_checksum(&stat.table, stat.row_count, ledger_start, ledger_end),
        })
        .collect();

    let mut manifest = Manifest {
        producer_version: producer_version.to_string(),
        ledger_start,
        ledger_end,
        ledger_count,
        total_rows: tables.iter().map(|t| t.row_count).sum(),
        generated_at: chrono::Utc::now().to_rfc3339(),
        tables,
        manifest_checksum: String::new(),
    };
    manifest.manifest_checksum = hash_without_field(&manifest, "manifest_checksum")?;
    Ok(manifest)
}

/// Writes `manifests/{start}-{end}.json`, fsynced. Returns the path.
pub fn save(manifest: &Manifest, working_dir: &Path) -> Result<PathBuf, Error> {
    let dir = working_dir.join("manifests");
    let path = dir.join(format!(
        "{}-{}.json",
        manifest.ledger_start, manifest.ledger_end
    ));
    let body = serde_json::to_vec_pretty(manifest)?;
    let write = || -> std::io::Result<()> {
        std::fs::create_dir_all(&dir)?;
        std::fs::write(&path, &body)?;
        std::fs::File::open(&path)?.sync_all()?;
        Ok(())
    };
    write().map_err(|error| Error::Write {
        path: path.clone(),
        error,
    })?;
    Ok(path)
}

/// Parses a saved manifest and re-derives its checksum.
pub fn verify_file(path: &Path) -> Result<Manifest, Error> {
    let raw = std::fs::read_to_string(path).map_err(|error| Error::Read {
        path: path.to_path_buf(),
        error,
    })?;
    let manifest: Manifest = serde_json::from_str(&raw)?;
    let computed = hash_without_field(&manifest, "manifest_checksum")?;
    if computed != manifest.manifest_checksum {
        return Err(Error::ChecksumMismatch {
            stored: manifest.manifest_checksum,
            computed,
        });
    }
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> Vec<TableStat> {
        vec![
            TableStat {
                table: "ledgers_row_v2".to_string(),
                row_count: 100,
            },
            TableStat {
                table: "transactions_row_v2".to_string(),
                row_count: 100,
            },
            TableStat {
                table: "operations_row_v2".to_string(),
                row_count: 100,
            },
        ]
    }

    #[test]
    fn build_totals_and_checksums() {
        let manifest = build("0.4.2", 100, 199, 100, &stats()).unwrap();
        assert_eq!(manifest.ledger_count, 100);
        assert_eq!(manifest.total_rows, 300);
        assert_eq!(manifest.tables.len(), 3);
        assert_eq!(manifest.manifest_checksum.len(), 64);
        for table in &manifest.tables {
            assert_eq!(table.checksum.len(), 64);
        }
    }

    #[test]
    fn save_then_verify_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = build("0.4.2", 100, 199, 100, &stats()).unwrap();
        let path = save(&manifest, dir.path()).unwrap();
        assert!(path.ends_with("manifests/100-199.json"));

        let reloaded = verify_file(&path).unwrap();
        assert_eq!(reloaded, manifest);
    }

    #[test]
    fn tampered_manifest_fails_verification() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = build("0.4.2", 100, 199, 100, &stats()).unwrap();
        let path = save(&manifest, dir.path()).unwrap();

        let raw = std::fs::read_to_string(&path)
            .unwrap()
            .replace("\"total_rows\": 300", "\"total_rows\": 301");
        std::fs::write(&path, raw).unwrap();

        assert!(matches!(
            verify_file(&path),
            Err(Error::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn checksum_is_deterministic_for_same_inputs() {
        let a = build("0.4.2", 100, 199, 100, &stats()).unwrap();
        let mut b = a.clone();
        b.manifest_checksum = hash_without_field(&b, "manifest_checksum").unwrap();
        assert_eq!(a.manifest_checksum, b.manifest_checksum);
    }
}
