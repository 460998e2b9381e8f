use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    config::{Config, SourceMode},
    model::ClosedLedger,
};

pub mod datastore;
pub mod rpc;

/// Capacity of the source → orchestrator channel. Back-pressure is natural:
/// the orchestrator pulls, the producer blocks when the buffer is full.
const CHANNEL_CAPACITY: usize = 16;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("decoding ledger record at sequence {sequence}: {message}")]
    Decode { sequence: u32, message: String },

    #[error("source out of order: expected sequence {expected}, got {got}")]
    OutOfOrder { expected: u32, got: u32 },

    #[error("source produced no ledger within {}", humantime::format_duration(*.0))]
    Stalled(Duration),

    #[error("cancelled")]
    Cancelled,
}

/// A bounded, inclusive-on-both-ends request. `end == None` tails forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerRange {
    pub start: u32,
    pub end: Option<u32>,
}

impl LedgerRange {
    pub fn bounded(start: u32, end: u32) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    pub fn contains(&self, seq: u32) -> bool {
        seq >= self.start && self.end.map_or(true, |end| seq <= end)
    }
}

/// The two concrete source modes behind one dispatch point. The streaming
/// contract is the same for both: strictly ascending sequences, no gaps, no
/// duplicates, finite iff the range is bounded.
pub enum Source {
    Rpc(rpc::RpcSource),
    Datastore(datastore::DatastoreSource),
}

impl Source {
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        match config.source.mode {
            SourceMode::Rpc => Ok(Source::Rpc(rpc::RpcSource::new(
                config.source.rpc_url.as_deref().ok_or_else(|| {
                    Error::SourceUnavailable("rpc_url not configured".to_string())
                })?,
                &config.source.rpc_headers,
                Duration::from_secs(config.source.poll_interval_secs),
            )?)),
            SourceMode::Datastore => Ok(Source::Datastore(datastore::DatastoreSource::new(
                config.source.datastore_path.clone().ok_or_else(|| {
                    Error::SourceUnavailable("datastore_path not configured".to_string())
                })?,
                Duration::from_secs(config.source.poll_interval_secs),
            ))),
        }
    }

    /// Cheap reachability check before the worker commits to streaming.
    pub async fn prepare(&self, range: LedgerRange) -> Result<(), Error> {
        match self {
            Source::Rpc(s) => s.prepare(range).await,
            Source::Datastore(s) => s.prepare(range).await,
        }
    }

    /// Consumes the source and returns the pull side of its stream. The
    /// producer task ends at the range end, on a fatal error, or when the
    /// cancellation token fires.
    pub fn stream(
        self,
        range: LedgerRange,
        stall_timeout: Duration,
        cancel: CancellationToken,
    ) -> LedgerStream {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        match self {
            Source::Rpc(s) => {
                tokio::spawn(s.produce(range, tx, cancel));
            }
            Source::Datastore(s) => {
                tokio::spawn(s.produce(range, tx, cancel));
            }
        }
        LedgerStream { rx, stall_timeout }
    }
}

/// Pull side of a source stream, with the stall watchdog applied per recv.
pub struct LedgerStream {
    rx: mpsc::Receiver<Result<ClosedLedger, Error>>,
    stall_timeout: Duration,
}

impl LedgerStream {
    /// `None` means the stream ended cleanly (bounded range exhausted or
    /// producer cancelled after draining).
    pub async fn next(&mut self) -> Option<Result<ClosedLedger, Error>> {
        match tokio::time::timeout(self.stall_timeout, self.rx.recv()).await {
            Ok(item) => item,
            Err(_) => Some(Err(Error::Stalled(self.stall_timeout))),
        }
    }
}

/// Shared by both producers: enforce the ordering contract before a ledger
/// is handed to the channel.
pub(crate) fn enforce_order(expected: u32, got: u32) -> Result<(), Error> {
    if got == expected {
        Ok(())
    } else {
        Err(Error::OutOfOrder { expected, got })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_contains_is_inclusive() {
        let range = LedgerRange::bounded(100, 199);
        assert!(range.contains(100));
        assert!(range.contains(199));
        assert!(!range.contains(99));
        assert!(!range.contains(200));
    }

    #[test]
    fn unbounded_range_contains_everything_after_start() {
        let range = LedgerRange {
            start: 5,
            end: None,
        };
        assert!(range.contains(u32::MAX));
        assert!(!range.contains(4));
    }

    #[test]
    fn order_check_rejects_gaps_and_duplicates() {
        assert!(enforce_order(7, 7).is_ok());
        assert!(matches!(
            enforce_order(7, 9),
            Err(Error::OutOfOrder {
                expected: 7,
                got: 9
            })
        ));
        assert!(enforce_order(7, 6).is_err());
    }
}
