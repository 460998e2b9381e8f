//! Parallel runner: splits a bounded range into contiguous, non-overlapping
//! sub-ranges, one worker per sub-range. Workers share nothing but the lake
//! catalog (which serializes internally); each owns its working directory,
//! so checkpoints, manifests and PAS shards never contend.

use std::path::PathBuf;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    config::Config,
    ingest::{Error, Ingester, RunSummary},
    source::LedgerRange,
};

/// Contiguous sub-ranges covering `[start, end]`. The last worker absorbs
/// the division remainder.
pub fn split_range(start: u32, end: u32, workers: usize) -> Vec<(u32, u32)> {
    assert!(workers > 0, "worker count must be positive");
    let workers = workers as u32;
    let span = end - start;
    if workers == 1 || span < workers {
        return vec![(start, end)];
    }
    let chunk = span / workers;
    (0..workers)
        .map(|i| {
            let sub_start = start + i * chunk + u32::from(i > 0);
            let sub_end = if i == workers - 1 {
                end
            } else {
                start + (i + 1) * chunk
            };
            (sub_start, sub_end)
        })
        .collect()
}

fn worker_dir(base: &std::path::Path, worker: Option<usize>) -> PathBuf {
    match worker {
        None => base.to_path_buf(),
        Some(i) => base.join(format!("worker-{i}")),
    }
}

/// Runs the configured range. With one worker the pipeline runs in place;
/// with several, each gets its own Ingester over a disjoint sub-range and
/// the first error cancels the rest.
pub async fn run(config: Config, cancel: CancellationToken) -> Result<RunSummary, Error> {
    let lake = crate::lake::Lake::open(&config.lake)?;

    let workers = config.ingest.num_workers;
    let (Some(end), true) = (config.range.end, workers > 1) else {
        // Unbounded ranges cannot be split; tail with a single worker.
        let range = LedgerRange {
            start: config.range.start,
            end: config.range.end,
        };
        let working_dir = worker_dir(&config.working_dir, None);
        let ingester = Ingester::new(config, range, working_dir, lake, cancel)?;
        return ingester.run().await;
    };

    let sub_ranges = split_range(config.range.start, end, workers);
    info!(workers = sub_ranges.len(), "splitting range across workers");

    // Startup (era gate, DDL, registry) runs serially; only the streaming
    // pipelines run concurrently.
    let mut ingesters = Vec::new();
    for (i, (sub_start, sub_end)) in sub_ranges.into_iter().enumerate() {
        let mut worker_config = config.clone();
        worker_config.range.start = sub_start;
        worker_config.range.end = Some(sub_end);
        let working_dir = worker_dir(&config.working_dir, Some(i));
        let range = LedgerRange::bounded(sub_start, sub_end);
        let ingester = Ingester::new(
            worker_config,
            range,
            working_dir,
            lake.try_clone()?,
            cancel.clone(),
        )?;
        ingesters.push((i, sub_start, sub_end, ingester));
    }

    let mut set: JoinSet<Result<RunSummary, Error>> = JoinSet::new();
    for (i, sub_start, sub_end, ingester) in ingesters {
        set.spawn(async move {
            info!(worker = i, sub_start, sub_end, "worker starting");
            ingester.run().await
        });
    }

    let mut total = RunSummary::default();
    let mut first_error: Option<Error> = None;
    while let Some(joined) = set.join_next().await {
        let result = joined.unwrap_or_else(|e| Err(Error::WorkerPanic(e.to_string())));
        match result {
            Ok(summary) => {
                total.ledgers_processed += summary.ledgers_processed;
                total.flushes += summary.flushes;
            }
            Err(e) => {
                // First fatal error cancels every other worker.
                error!("worker failed: {e}");
                cancel.cancel();
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(total),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_workers_split_a_hundred_ledgers_evenly() {
        assert_eq!(split_range(100, 199, 2), vec![(100, 149), (150, 199)]);
    }

    #[test]
    fn last_worker_absorbs_the_remainder() {
        let ranges = split_range(0, 100, 3);
        assert_eq!(ranges, vec![(0, 33), (34, 66), (67, 100)]);
    }

    #[test]
    fn sub_ranges_are_contiguous_and_non_overlapping() {
        for workers in 1..=7 {
            let ranges = split_range(1000, 9999, workers);
            assert_eq!(ranges.first().unwrap().0, 1000);
            assert_eq!(ranges.last().unwrap().1, 9999);
            for pair in ranges.windows(2) {
                assert_eq!(pair[1].0, pair[0].1 + 1);
            }
        }
    }

    #[test]
    fn single_worker_gets_the_whole_range() {
        assert_eq!(split_range(5, 10, 1), vec![(5, 10)]);
    }

    #[test]
    fn tiny_ranges_do_not_split() {
        assert_eq!(split_range(5, 7, 8), vec![(5, 7)]);
    }
}
