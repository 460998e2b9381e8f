//! The per-worker orchestrator: drives the source stream, decomposes each
//! ledger, and runs the flush protocol
//! quality → sink → manifest → PAS → checkpoint → meta writes.

use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    audit::{
        checkpoint::{Checkpoint, Checkpointer},
        manifest,
        pas::{BatchAudit, PasEmitter, Producer},
    },
    buffer::WorkerBuffer,
    config::Config,
    extract,
    lake::{era::EraManager, meta, sink, Lake},
    quality,
    source::{LedgerRange, Source},
    version,
};

pub mod runner;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Source(#[from] crate::source::Error),

    #[error(transparent)]
    Lake(#[from] crate::lake::Error),

    #[error(transparent)]
    Checkpoint(#[from] crate::audit::checkpoint::Error),

    #[error(transparent)]
    Manifest(#[from] crate::audit::manifest::Error),

    #[error(transparent)]
    Pas(#[from] crate::audit::pas::Error),

    #[error("worker panicked: {0}")]
    WorkerPanic(String),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub ledgers_processed: u64,
    pub flushes: u64,
}

/// One worker's pipeline over one contiguous ledger range. Owns the buffer,
/// the lake connection, and the audit files under its working directory
/// exclusively.
pub struct Ingester {
    config: Config,
    range: LedgerRange,
    working_dir: PathBuf,
    lake: Lake,
    era: EraManager,
    checkpointer: Checkpointer,
    pas: PasEmitter,
    buffer: WorkerBuffer,
    ctx: extract::Ctx,
    cancel: CancellationToken,
    summary: RunSummary,
}

impl Ingester {
    /// Builds the worker and runs the startup protocol: era gate first (a
    /// frozen era refuses before anything else writes), then table and
    /// dataset registration, then checkpoint validation. The lake handle
    /// is a clone of the runner's root connection.
    pub fn new(
        config: Config,
        range: LedgerRange,
        working_dir: PathBuf,
        lake: Lake,
        cancel: CancellationToken,
    ) -> Result<Self, Error> {
        let network_name = config
            .network
            .name
            .clone()
            .unwrap_or_else(|| config.network.passphrase.clone());

        lake.ensure_meta_eras()?;
        let era = EraManager::new(&config.era.era_id, &network_name, &config.era.version_label);
        era.ensure_active(&lake, range.start)?;

        let created = lake.ensure_tables()?;
        for table in &created {
            meta::log_change(&lake, "table_created", Some(table))?;
        }
        meta::register_datasets(&lake)?;

        let checkpointer = Checkpointer::new(&working_dir);

        let producer = Producer {
            id: config.producer_id.clone(),
            version: version::pkg().to_string(),
            network: network_name,
            era: config.era.era_id.clone(),
        };
        let pas = PasEmitter::open(
            &working_dir,
            producer,
            config.ingest.strict_audit,
            config.ingest.pas_backup_every,
        )?;

        let ctx = extract::Ctx::new(&config.network.passphrase);

        Ok(Self {
            config,
            range,
            working_dir,
            lake,
            era,
            checkpointer,
            pas,
            buffer: WorkerBuffer::new(),
            ctx,
            cancel,
            summary: RunSummary::default(),
        })
    }

    /// The resume point from the persisted checkpoint, validated against
    /// the current network and source mode.
    fn resume_start(&self) -> Result<u32, Error> {
        match self.checkpointer.load()? {
            Some(checkpoint) => {
                Checkpointer::validate(
                    &checkpoint,
                    &self.config.network.passphrase,
                    self.config.source.mode,
                    version::pkg(),
                )?;
                let resume = Checkpointer::resume_point(&checkpoint, self.range.start);
                if resume > self.range.start {
                    info!(
                        checkpoint = checkpoint.last_completed_ledger,
                        resume, "resuming from checkpoint"
                    );
                }
                Ok(resume)
            }
            None => Ok(self.range.start),
        }
    }

    pub async fn run(mut self) -> Result<RunSummary, Error> {
        let start = self.resume_start()?;
        if let Some(end) = self.range.end {
            if start > end {
                info!(start, end, "range already completed by checkpoint");
                return Ok(self.summary);
            }
        }
        let range = LedgerRange {
            start,
            end: self.range.end,
        };

        let source = Source::from_config(&self.config)?;
        source.prepare(range).await?;
        let mut stream = source.stream(
            range,
            Duration::from_secs(self.config.source.stall_timeout_secs),
            self.cancel.child_token(),
        );

        let batch_size = self.config.ingest.batch_size;
        let commit_interval = Duration::from_secs(self.config.ingest.commit_interval_secs);

        loop {
            let next = tokio::select! {
                () = self.cancel.cancelled() => None,
                item = stream.next() => item,
            };
            let Some(item) = next else {
                break;
            };
            let ledger = item?;

            let extraction = extract::extract_ledger(&ledger, &self.ctx);
            self.buffer.append_ledger(extraction);
            self.summary.ledgers_processed += 1;

            if self.buffer.should_flush(batch_size, commit_interval) {
                // A lake failure is fatal for the batch, not the worker:
                // the buffer is retained and the flush re-attempted on the
                // next trigger.
                if let Err(e) = self.flush(None) {
                    warn!("flush failed, retaining buffer for retry: {e}");
                }
            }
        }

        // Best-effort final flush, bounded at shutdown.
        if !self.buffer.is_empty() {
            let deadline = Instant::now()
                + Duration::from_secs(self.config.ingest.shutdown_flush_timeout_secs);
            self.flush(Some(deadline))?;
        }

        info!(
            ledgers = self.summary.ledgers_processed,
            flushes = self.summary.flushes,
            "worker closed"
        );
        Ok(self.summary)
    }

    /// One pass of the flush protocol over the current buffer. The deadline
    /// is observed between steps only; an in-flight step is never
    /// interrupted.
    fn flush(&mut self, deadline: Option<Instant>) -> Result<(), Error> {
        let Some((ledger_start, ledger_end)) = self.buffer.ledger_bounds() else {
            return Ok(());
        };
        let started = Instant::now();
        let ledger_count = self.buffer.len_ledgers() as u32;
        let total_rows = self.buffer.total_rows();
        info!(ledger_start, ledger_end, ledger_count, total_rows, "flushing batch");

        let over_deadline =
            |what: &str| -> bool {
                if deadline.is_some_and(|d| Instant::now() > d) {
                    warn!(what, "shutdown flush deadline exceeded; stopping before step");
                    return true;
                }
                false
            };

        // Quality: recorded, never fatal.
        let quality_results = quality::run_checks(&self.buffer);
        for result in quality_results.iter().filter(|r| !r.passed) {
            warn!(
                check = result.check_name,
                dataset = result.dataset,
                failures = result.failure_count,
                "quality check failed"
            );
        }
        let failed = quality_results.iter().filter(|r| !r.passed).count();
        info!(
            checks = quality_results.len(),
            passed = quality_results.len() - failed,
            failed,
            "quality checks complete"
        );

        if over_deadline("lake append") {
            return Ok(());
        }
        let written = sink::append_batch(&self.lake, &self.buffer)?;

        // Audit steps: failures are configurable, and never advance state
        // they did not produce.
        let built =
            manifest::build(version::pkg(), ledger_start, ledger_end, ledger_count, &written)?;
        if !over_deadline("manifest") {
            match manifest::save(&built, &self.working_dir) {
                Ok(_) => {}
                Err(e) if self.config.ingest.strict_audit => return Err(e.into()),
                Err(e) => warn!("manifest emission failed: {e}"),
            }
        }

        let pas_emitted = if over_deadline("pas") {
            None
        } else {
            self.pas.emit_batch(BatchAudit {
                ledger_start,
                ledger_end,
                ledger_count,
                table_summaries: built.tables.clone(),
                manifest_checksum: &built.manifest_checksum,
                total_rows,
                duration_ms: started.elapsed().as_millis() as u64,
            })?
        };
        if let Some((_, event_hash)) = &pas_emitted {
            self.era.update_chain_head(&self.lake, event_hash)?;
        }

        if !over_deadline("checkpoint") {
            let update = self.checkpointer.update(&Checkpoint {
                last_completed_ledger: ledger_end,
                source_mode: self.config.source.mode,
                network_passphrase: self.config.network.passphrase.clone(),
                producer_version: version::pkg().to_string(),
                config_start: self.range.start,
                config_end: self.range.end,
                updated_at: chrono::Utc::now().timestamp(),
            });
            match update {
                Ok(()) => {}
                Err(e) if self.config.ingest.strict_audit => return Err(e.into()),
                Err(e) => warn!("checkpoint update failed: {e}"),
            }
        }

        if !over_deadline("meta writes") {
            let lineage_ids = meta::insert_lineage(
                &self.lake,
                &meta::BatchMeta {
                    ledger_start,
                    ledger_end,
                    pipeline_version: version::pkg(),
                    processor_name: &self.config.producer_id,
                    era_id: &self.config.era.era_id,
                    version_label: &self.config.era.version_label,
                },
                &written,
            )?;
            if let Some((event_id, event_hash)) = &pas_emitted {
                meta::link_lineage_to_pas(&self.lake, &lineage_ids, *event_id, event_hash)?;
            }
            meta::insert_quality(&self.lake, ledger_start, ledger_end, &quality_results)?;
        }

        self.buffer.mark_committed();
        self.summary.flushes += 1;
        info!(
            ledger_start,
            ledger_end,
            elapsed = %humantime::format_duration(started.elapsed()),
            "batch committed"
        );
        Ok(())
    }

}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::{
        audit::pas::{verify_chain, ZERO_HASH},
        config::{
            Config, EraConfig, IngestConfig, LakeConfig, Network, RangeConfig, SourceConfig,
            SourceMode,
        },
        model,
        testutils,
        xdr::{self, Limits, WriteXdr},
    };

    /// Materializes synthetic ledgers into a datastore layout.
    fn write_datastore(root: &Path, start: u32, end: u32, txs_per_ledger: usize) {
        for seq in start..=end {
            let ledger = testutils::closed_ledger(seq, txs_per_ledger);
            let dir = root.join(format!("{:08}", model::ledger_range(seq)));
            std::fs::create_dir_all(&dir).unwrap();
            let bytes = ledger.0.to_xdr(Limits::none()).unwrap();
            std::fs::write(dir.join(format!("{seq:08}.xdr")), bytes).unwrap();
        }
    }

    fn test_config(root: &Path, start: u32, end: u32, batch_size: usize) -> Config {
        Config {
            network: Network {
                passphrase: testutils::TEST_PASSPHRASE.to_string(),
                name: Some("testnet".to_string()),
            },
            source: SourceConfig {
                mode: SourceMode::Datastore,
                rpc_url: None,
                rpc_headers: Vec::new(),
                datastore_path: Some(root.join("ledgers")),
                poll_interval_secs: 1,
                stall_timeout_secs: 30,
            },
            range: RangeConfig {
                start,
                end: Some(end),
            },
            ingest: IngestConfig {
                batch_size,
                commit_interval_secs: 3600,
                num_workers: 1,
                shutdown_flush_timeout_secs: 30,
                strict_audit: true,
                pas_backup_every: 0,
            },
            lake: LakeConfig {
                data_path: root.join("lake"),
                catalog: None,
                schema: "raw".to_string(),
                s3: None,
            },
            era: EraConfig {
                era_id: "era-test".to_string(),
                version_label: "v2".to_string(),
            },
            working_dir: root.join("state"),
            producer_id: "stellar-lake-ingest".to_string(),
        }
    }

    async fn run_once(config: Config) -> Result<RunSummary, Error> {
        runner::run(config, CancellationToken::new()).await
    }

    #[tokio::test]
    async fn bounded_range_produces_one_audited_batch() {
        let dir = tempfile::tempdir().unwrap();
        write_datastore(&dir.path().join("ledgers"), 100, 199, 1);
        let config = test_config(dir.path(), 100, 199, 1000);

        let summary = run_once(config.clone()).await.unwrap();
        assert_eq!(summary.ledgers_processed, 100);
        assert_eq!(summary.flushes, 1);

        let manifest = crate::audit::manifest::verify_file(
            &dir.path().join("state/manifests/100-199.json"),
        )
        .unwrap();
        assert_eq!(manifest.ledger_count, 100);
        assert!(manifest.total_rows >= 300);

        let chain = dir.path().join("state/pas/chain.log");
        assert_eq!(verify_chain(&chain).unwrap(), 1);
        let first: serde_json::Value =
            serde_json::from_str(std::fs::read_to_string(&chain).unwrap().lines().next().unwrap())
                .unwrap();
        assert_eq!(first["prev_hash"], ZERO_HASH);

        let lake = crate::lake::Lake::open(&config.lake).unwrap();
        let rows: i64 = lake
            .connection()
            .query_row("SELECT count(*) FROM raw.ledgers_row_v2", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 100);
    }

    #[tokio::test]
    async fn batch_size_drives_flush_cadence_and_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        write_datastore(&dir.path().join("ledgers"), 100, 299, 1);
        let config = test_config(dir.path(), 100, 299, 50);

        let summary = run_once(config.clone()).await.unwrap();
        assert_eq!(summary.flushes, 4);

        for k in 0u32..4 {
            let start = 100 + 50 * k;
            assert!(dir
                .path()
                .join(format!("state/manifests/{}-{}.json", start, start + 49))
                .is_file());
        }
        assert_eq!(
            verify_chain(&dir.path().join("state/pas/chain.log")).unwrap(),
            4
        );

        let checkpoint = Checkpointer::new(&config.working_dir)
            .load()
            .unwrap()
            .unwrap();
        assert_eq!(checkpoint.last_completed_ledger, 299);
    }

    #[tokio::test]
    async fn restart_resumes_past_checkpoint_without_rewriting() {
        let dir = tempfile::tempdir().unwrap();
        write_datastore(&dir.path().join("ledgers"), 100, 299, 1);
        let config = test_config(dir.path(), 100, 299, 50);

        run_once(config.clone()).await.unwrap();
        let rerun = run_once(config.clone()).await.unwrap();
        assert_eq!(rerun.ledgers_processed, 0);
        assert_eq!(rerun.flushes, 0);

        let lake = crate::lake::Lake::open(&config.lake).unwrap();
        let rows: i64 = lake
            .connection()
            .query_row("SELECT count(*) FROM raw.ledgers_row_v2", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 200);
    }

    #[tokio::test]
    async fn malformed_account_entry_is_dropped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("ledgers");
        write_datastore(&root, 100, 104, 1);

        // Ledger 102 carries one account entry that panics inside the
        // snapshot decoding (signer list and sponsoring descriptors
        // disagree in length).
        let bad = testutils::closed_ledger_with_changes(
            102,
            vec![xdr::LedgerEntryChange::Created(
                testutils::malformed_account_entry(9, 102),
            )],
        );
        let bucket = root.join(format!("{:08}", model::ledger_range(102)));
        std::fs::write(
            bucket.join("00000102.xdr"),
            bad.0.to_xdr(Limits::none()).unwrap(),
        )
        .unwrap();

        let config = test_config(dir.path(), 100, 104, 1000);
        let summary = run_once(config.clone()).await.unwrap();
        assert_eq!(summary.ledgers_processed, 5);
        assert_eq!(summary.flushes, 1);

        let lake = crate::lake::Lake::open(&config.lake).unwrap();

        // The ledger row for the bad ledger is still emitted.
        let ledger_rows: i64 = lake
            .connection()
            .query_row(
                "SELECT count(*) FROM raw.ledgers_row_v2 WHERE sequence = 102",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(ledger_rows, 1);

        // The snapshot rows for the malformed account are absent.
        let accounts: i64 = lake
            .connection()
            .query_row("SELECT count(*) FROM raw.accounts_snapshot_v1", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(accounts, 0);
        let balances: i64 = lake
            .connection()
            .query_row(
                "SELECT count(*) FROM raw.native_balances_snapshot_v1",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(balances, 0);

        // The dropped entry leaves nothing for the balance format check.
        let (failures, passed): (i64, bool) = lake
            .connection()
            .query_row(
                "SELECT failure_count, passed FROM raw._meta_quality
                 WHERE check_name = 'balance_account_id_format'",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(failures, 0);
        assert!(passed);
    }

    #[tokio::test]
    async fn frozen_era_refuses_startup_before_any_extraction() {
        let dir = tempfile::tempdir().unwrap();
        write_datastore(&dir.path().join("ledgers"), 100, 109, 1);
        let config = test_config(dir.path(), 100, 109, 50);

        {
            let lake = crate::lake::Lake::open(&config.lake).unwrap();
            lake.ensure_meta_eras().unwrap();
            let era = crate::lake::era::EraManager::new("era-test", "testnet", "v2");
            era.ensure_active(&lake, 100).unwrap();
            era.freeze(&lake, 99).unwrap();
        }

        let err = run_once(config.clone()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Lake(crate::lake::Error::EraBlocked { .. })
        ));

        let lake = crate::lake::Lake::open(&config.lake).unwrap();
        let tables: i64 = lake
            .connection()
            .query_row(
                "SELECT count(*) FROM information_schema.tables
                 WHERE table_schema = 'raw' AND table_name = 'ledgers_row_v2'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(tables, 0);
    }

    #[tokio::test]
    async fn two_workers_cover_disjoint_sub_ranges_with_sharded_chains() {
        let dir = tempfile::tempdir().unwrap();
        write_datastore(&dir.path().join("ledgers"), 100, 199, 1);
        let mut config = test_config(dir.path(), 100, 199, 50);
        config.ingest.num_workers = 2;

        let summary = run_once(config.clone()).await.unwrap();
        assert_eq!(summary.ledgers_processed, 100);

        assert_eq!(
            verify_chain(&dir.path().join("state/worker-0/pas/chain.log")).unwrap(),
            1
        );
        assert_eq!(
            verify_chain(&dir.path().join("state/worker-1/pas/chain.log")).unwrap(),
            1
        );

        let lake = crate::lake::Lake::open(&config.lake).unwrap();
        let rows: i64 = lake
            .connection()
            .query_row("SELECT count(*) FROM raw.ledgers_row_v2", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 100);

        // One lineage row per worker per non-empty dataset.
        let lineage: i64 = lake
            .connection()
            .query_row(
                "SELECT count(*) FROM raw._meta_lineage WHERE dataset = 'ledgers'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(lineage, 2);
    }
}

