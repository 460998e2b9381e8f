//! Meta-table writes: dataset registry, per-batch lineage, quality results
//! and the append-only change log. Batch writes are single multi-row
//! statements so a remote catalog sees one round-trip per table.

use duckdb::{params, params_from_iter, ToSql};
use ulid::Ulid;

use crate::{
    lake::{Error, Lake},
    model::{TableStat, DATASETS},
    quality::QualityResult,
};

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Idempotent startup registration of all 19 datasets.
pub fn register_datasets(lake: &Lake) -> Result<(), Error> {
    let registered_at = now();
    for dataset in &DATASETS {
        lake.connection().execute(
            "INSERT OR REPLACE INTO _meta_datasets
             (name, table_name, description, schema_version, registered_at)
             VALUES (?, ?, ?, ?, ?)",
            params![
                dataset.name,
                dataset.table,
                dataset.description,
                schema_version(dataset.table),
                registered_at,
            ],
        )?;
    }
    Ok(())
}

fn schema_version(table: &str) -> i32 {
    table
        .rsplit("_v")
        .next()
        .and_then(|v| v.parse().ok())
        .unwrap_or(1)
}

fn dataset_name_for(table: &str) -> &'static str {
    DATASETS
        .iter()
        .find(|d| d.table == table)
        .map_or("unknown", |d| d.name)
}

pub struct BatchMeta<'a> {
    pub ledger_start: u32,
    pub ledger_end: u32,
    pub pipeline_version: &'a str,
    pub processor_name: &'a str,
    pub era_id: &'a str,
    pub version_label: &'a str,
}

/// One lineage row per written dataset, in a single statement. Returns the
/// generated lineage ids in `written` order for the later PAS linkage.
pub fn insert_lineage(
    lake: &Lake,
    batch: &BatchMeta,
    written: &[TableStat],
) -> Result<Vec<String>, Error> {
    if written.is_empty() {
        return Ok(Vec::new());
    }
    let created_at = now();
    let ids: Vec<String> = written.iter().map(|_| Ulid::new().to_string()).collect();

    let placeholders = vec!["(?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"; written.len()].join(", ");
    let sql = format!(
        "INSERT INTO _meta_lineage
         (id, dataset, source_ledger_start, source_ledger_end, pipeline_version,
          processor_name, row_count, created_at, era_id, version_label)
         VALUES {placeholders}"
    );

    let mut values: Vec<Box<dyn ToSql>> = Vec::with_capacity(written.len() * 10);
    for (stat, id) in written.iter().zip(&ids) {
        values.push(Box::new(id.clone()));
        values.push(Box::new(dataset_name_for(&stat.table).to_string()));
        values.push(Box::new(batch.ledger_start));
        values.push(Box::new(batch.ledger_end));
        values.push(Box::new(batch.pipeline_version.to_string()));
        values.push(Box::new(batch.processor_name.to_string()));
        values.push(Box::new(stat.row_count));
        values.push(Box::new(created_at));
        values.push(Box::new(batch.era_id.to_string()));
        values.push(Box::new(batch.version_label.to_string()));
    }
    lake.connection()
        .execute(&sql, params_from_iter(values.iter().map(|v| v.as_ref())))?;
    Ok(ids)
}

/// Links this batch's lineage rows to the PAS event that audited them.
pub fn link_lineage_to_pas(
    lake: &Lake,
    lineage_ids: &[String],
    pas_event_id: u64,
    pas_event_hash: &str,
) -> Result<(), Error> {
    if lineage_ids.is_empty() {
        return Ok(());
    }
    let placeholders = vec!["?"; lineage_ids.len()].join(", ");
    let sql = format!(
        "UPDATE _meta_lineage
         SET pas_event_id = ?, pas_event_hash = ?, pas_verified = true
         WHERE id IN ({placeholders})"
    );
    let mut values: Vec<Box<dyn ToSql>> = Vec::with_capacity(lineage_ids.len() + 2);
    values.push(Box::new(pas_event_id));
    values.push(Box::new(pas_event_hash.to_string()));
    for id in lineage_ids {
        values.push(Box::new(id.clone()));
    }
    lake.connection()
        .execute(&sql, params_from_iter(values.iter().map(|v| v.as_ref())))?;
    Ok(())
}

/// All quality results of one batch as a single insert.
pub fn insert_quality(
    lake: &Lake,
    ledger_start: u32,
    ledger_end: u32,
    results: &[QualityResult],
) -> Result<(), Error> {
    if results.is_empty() {
        return Ok(());
    }
    let created_at = now();
    let placeholders = vec!["(?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"; results.len()].join(", ");
    let sql = format!(
        "INSERT INTO _meta_quality
         (id, check_name, check_type, dataset, passed, failure_count, details,
          ledger_start, ledger_end, created_at)
         VALUES {placeholders}"
    );
    let mut values: Vec<Box<dyn ToSql>> = Vec::with_capacity(results.len() * 10);
    for result in results {
        values.push(Box::new(Ulid::new().to_string()));
        values.push(Box::new(result.check_name));
        values.push(Box::new(result.check_type.to_string()));
        values.push(Box::new(result.dataset));
        values.push(Box::new(result.passed));
        values.push(Box::new(result.failure_count));
        values.push(Box::new(result.details.clone()));
        values.push(Box::new(ledger_start));
        values.push(Box::new(ledger_end));
        values.push(Box::new(created_at));
    }
    lake.connection()
        .execute(&sql, params_from_iter(values.iter().map(|v| v.as_ref())))?;
    Ok(())
}

/// Append-only change log; schema-affecting startup actions only.
pub fn log_change(lake: &Lake, change: &str, details: Option<&str>) -> Result<(), Error> {
    lake.connection().execute(
        "INSERT INTO _meta_changes (id, change, details, created_at) VALUES (?, ?, ?, ?)",
        params![Ulid::new().to_string(), change, details, now()],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_lake() -> Lake {
        let lake = Lake::open_ephemeral().unwrap();
        lake.ensure_tables().unwrap();
        lake
    }

    fn batch<'a>() -> BatchMeta<'a> {
        BatchMeta {
            ledger_start: 100,
            ledger_end: 149,
            pipeline_version: "0.4.2",
            processor_name: "stellar-lake-ingest",
            era_id: "era-test",
            version_label: "v2",
        }
    }

    #[test]
    fn dataset_registration_is_idempotent() {
        let lake = test_lake();
        register_datasets(&lake).unwrap();
        register_datasets(&lake).unwrap();
        let count: i64 = lake
            .connection()
            .query_row("SELECT count(*) FROM _meta_datasets", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 19);
    }

    #[test]
    fn lineage_rows_cover_written_datasets_and_link_to_pas() {
        let lake = test_lake();
        let written = vec![
            TableStat {
                table: "ledgers_row_v2".to_string(),
                row_count: 50,
            },
            TableStat {
                table: "transactions_row_v2".to_string(),
                row_count: 80,
            },
        ];
        let ids = insert_lineage(&lake, &batch(), &written).unwrap();
        assert_eq!(ids.len(), 2);

        link_lineage_to_pas(&lake, &ids, 7, &"e".repeat(64)).unwrap();
        let verified: i64 = lake
            .connection()
            .query_row(
                "SELECT count(*) FROM _meta_lineage WHERE pas_verified AND pas_event_id = 7",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(verified, 2);
    }

    #[test]
    fn quality_results_are_batched() {
        let lake = test_lake();
        let results = vec![
            QualityResult {
                check_name: "sequence_monotonicity",
                check_type: crate::quality::CheckType::Consistency,
                dataset: "ledgers",
                passed: true,
                failure_count: 0,
                details: None,
            },
            QualityResult {
                check_name: "ledger_hash_format",
                check_type: crate::quality::CheckType::Validity,
                dataset: "ledgers",
                passed: false,
                failure_count: 3,
                details: Some("3 malformed hashes".to_string()),
            },
        ];
        insert_quality(&lake, 100, 149, &results).unwrap();
        let failed: i64 = lake
            .connection()
            .query_row(
                "SELECT failure_count FROM _meta_quality WHERE NOT passed",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(failed, 3);
    }
}
