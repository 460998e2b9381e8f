use std::{
    io::Write,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::SourceMode;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("reading checkpoint {path}: {error}")]
    Read { path: PathBuf, error: std::io::Error },

    #[error("parsing checkpoint {path}: {error}")]
    Parse {
        path: PathBuf,
        error: serde_json::Error,
    },

    #[error("writing checkpoint {path}: {error}")]
    Write { path: PathBuf, error: std::io::Error },

    #[error("serializing checkpoint: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(
        "checkpoint network mismatch: checkpoint has {checkpoint}, config has {config}"
    )]
    NetworkMismatch { checkpoint: String, config: String },

    #[error("checkpoint source mode mismatch: checkpoint has {checkpoint}, config has {config}")]
    ModeMismatch {
        checkpoint: SourceMode,
        config: SourceMode,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub last_completed_ledger: u32,
    pub source_mode: SourceMode,
    pub network_passphrase: String,
    pub producer_version: String,
    pub config_start: u32,
    pub config_end: Option<u32>,
    pub updated_at: i64,
}

/// Owns `checkpoint/state.json` under the worker's working directory. At
/// most one active checkpoint exists there; updates are atomic
/// (write-to-temp, fsync, rename).
pub struct Checkpointer {
    path: PathBuf,
}

impl Checkpointer {
    pub fn new(working_dir: &Path) -> Self {
        Self {
            path: working_dir.join("checkpoint").join("state.json"),
        }
    }

    pub fn load(&self) -> Result<Option<Checkpoint>, Error> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                return Err(Error::Read {
                    path: self.path.clone(),
                    error,
                })
            }
        };
        let checkpoint = serde_json::from_str(&raw).map_err(|error| Error::Parse {
            path: self.path.clone(),
            error,
        })?;
        Ok(Some(checkpoint))
    }

    /// A checkpoint is compatible iff network passphrase and source mode
    /// match exactly. A differing producer version resumes with a warning:
    /// a version bump must not force a reingest.
    pub fn validate(
        checkpoint: &Checkpoint,
        network_passphrase: &str,
        source_mode: SourceMode,
        producer_version: &str,
    ) -> Result<(), Error> {
        if checkpoint.network_passphrase != network_passphrase {
            return Err(Error::NetworkMismatch {
                checkpoint: checkpoint.network_passphrase.clone(),
                config: network_passphrase.to_string(),
            });
        }
        if checkpoint.source_mode != source_mode {
            return Err(Error::ModeMismatch {
                checkpoint: checkpoint.source_mode,
                config: source_mode,
            });
        }
        if checkpoint.producer_version != producer_version {
            warn!(
                checkpoint_version = %checkpoint.producer_version,
                current_version = producer_version,
                "resuming a checkpoint written by a different producer version"
            );
        }
        Ok(())
    }

    /// The first ledger to process: the configured start, or just past the
    /// checkpoint when that is further along.
    pub fn resume_point(checkpoint: &Checkpoint, config_start: u32) -> u32 {
        config_start.max(checkpoint.last_completed_ledger.saturating_add(1))
    }

    pub fn update(&self, checkpoint: &Checkpoint) -> Result<(), Error> {
        let dir = self.path.parent().unwrap_or(Path::new("."));
        std::fs::create_dir_all(dir).map_err(|error| Error::Write {
            path: self.path.clone(),
            error,
        })?;
        let body = serde_json::to_vec_pretty(checkpoint)?;

        let write = || -> std::io::Result<()> {
            let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
            tmp.write_all(&body)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&self.path)
                .map_err(|e| e.error)?;
            Ok(())
        };
        write().map_err(|error| Error::Write {
            path: self.path.clone(),
            error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkpoint(last: u32) -> Checkpoint {
        Checkpoint {
            last_completed_ledger: last,
            source_mode: SourceMode::Rpc,
            network_passphrase: "Test SDF Network ; September 2015".to_string(),
            producer_version: "0.4.2".to_string(),
            config_start: 100,
            config_end: Some(299),
            updated_at: 1_700_000_000,
        }
    }

    #[test]
    fn missing_checkpoint_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let checkpointer = Checkpointer::new(dir.path());
        assert_eq!(checkpointer.load().unwrap(), None);
    }

    #[test]
    fn update_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let checkpointer = Checkpointer::new(dir.path());
        checkpointer.update(&checkpoint(149)).unwrap();
        assert_eq!(checkpointer.load().unwrap(), Some(checkpoint(149)));

        checkpointer.update(&checkpoint(199)).unwrap();
        assert_eq!(
            checkpointer.load().unwrap().unwrap().last_completed_ledger,
            199
        );
    }

    #[test]
    fn resume_point_advances_past_checkpoint() {
        assert_eq!(Checkpointer::resume_point(&checkpoint(299), 100), 300);
        assert_eq!(Checkpointer::resume_point(&checkpoint(50), 100), 100);
    }

    #[test]
    fn network_mismatch_is_rejected() {
        let err = Checkpointer::validate(
            &checkpoint(149),
            "Public Global Stellar Network ; September 2015",
            SourceMode::Rpc,
            "0.4.2",
        )
        .unwrap_err();
        assert!(matches!(err, Error::NetworkMismatch { .. }));
    }

    #[test]
    fn mode_mismatch_is_rejected() {
        let err = Checkpointer::validate(
            &checkpoint(149),
            "Test SDF Network ; September 2015",
            SourceMode::Datastore,
            "0.4.2",
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "checkpoint source mode mismatch: checkpoint has rpc, config has datastore"
        );
    }

    #[test]
    fn version_drift_is_accepted() {
        Checkpointer::validate(
            &checkpoint(149),
            "Test SDF Network ; September 2015",
            SourceMode::Rpc,
            "0.5.0",
        )
        .unwrap();
    }
}
