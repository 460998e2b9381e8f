use std::{path::PathBuf, time::Duration};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    model::{self, ClosedLedger},
    source::{Error, LedgerRange},
    xdr::{self, Limits, ReadXdr},
};

/// Streams closed ledgers from a filesystem (or object-store mount)
/// datastore laid out as `<root>/<8-digit range bucket>/<8-digit seq>.xdr`,
/// one `LedgerCloseMeta` frame per file.
pub struct DatastoreSource {
    root: PathBuf,
    poll_interval: Duration,
}

impl DatastoreSource {
    pub fn new(root: PathBuf, poll_interval: Duration) -> Self {
        Self {
            root,
            poll_interval,
        }
    }

    fn ledger_path(&self, seq: u32) -> PathBuf {
        self.root
            .join(format!("{:08}", model::ledger_range(seq)))
            .join(format!("{seq:08}.xdr"))
    }

    pub async fn prepare(&self, range: LedgerRange) -> Result<(), Error> {
        if !self.root.is_dir() {
            return Err(Error::SourceUnavailable(format!(
                "datastore root {} is not a directory",
                self.root.display()
            )));
        }
        let first = self.ledger_path(range.start);
        if range.end.is_some() && !first.is_file() {
            return Err(Error::SourceUnavailable(format!(
                "datastore has no record for start ledger {} ({})",
                range.start,
                first.display()
            )));
        }
        debug!(root = %self.root.display(), start = range.start, "datastore source prepared");
        Ok(())
    }

    pub async fn produce(
        self,
        range: LedgerRange,
        tx: mpsc::Sender<Result<ClosedLedger, Error>>,
        cancel: CancellationToken,
    ) {
        let mut seq = range.start;
        loop {
            if cancel.is_cancelled() {
                return;
            }
            if let Some(end) = range.end {
                if seq > end {
                    return;
                }
            }

            let path = self.ledger_path(seq);
            if !path.is_file() {
                if range.end.is_some() {
                    // Bounded ranges must be gap-free.
                    let _ = tx
                        .send(Err(Error::Decode {
                            sequence: seq,
                            message: format!("missing datastore record {}", path.display()),
                        }))
                        .await;
                    return;
                }
                // Tailing an unbounded range: wait for the writer.
                tokio::select! {
                    () = cancel.cancelled() => return,
                    () = tokio::time::sleep(self.poll_interval) => continue,
                }
            }

            let item = read_ledger(&path, seq).await;
            let fatal = item.is_err();
            tokio::select! {
                () = cancel.cancelled() => return,
                sent = tx.send(item) => {
                    if sent.is_err() || fatal {
                        return;
                    }
                }
            }
            seq += 1;
        }
    }
}

async fn read_ledger(path: &std::path::Path, seq: u32) -> Result<ClosedLedger, Error> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| Error::SourceUnavailable(format!("reading {}: {e}", path.display())))?;
    let meta =
        xdr::LedgerCloseMeta::from_xdr(&bytes, Limits::none()).map_err(|e| Error::Decode {
            sequence: seq,
            message: e.to_string(),
        })?;
    let ledger = ClosedLedger(meta);
    if ledger.sequence() != seq {
        return Err(Error::Decode {
            sequence: seq,
            message: format!(
                "file {} holds ledger {} instead",
                path.display(),
                ledger.sequence()
            ),
        });
    }
    Ok(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_paths_bucket_by_partition() {
        let source = DatastoreSource::new(PathBuf::from("/data"), Duration::from_secs(1));
        assert_eq!(
            source.ledger_path(123_456),
            PathBuf::from("/data/00120000/00123456.xdr")
        );
        assert_eq!(
            source.ledger_path(7),
            PathBuf::from("/data/00000000/00000007.xdr")
        );
    }
}
