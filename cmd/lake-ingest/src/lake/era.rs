//! Era lifecycle over `_meta_eras`: the startup gate, the PAS chain-head
//! linkage, and the administrative freeze transition.

use duckdb::params;
use tracing::info;

use crate::lake::{Error, Lake};

pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_FROZEN: &str = "frozen";
pub const STATUS_DEPRECATED: &str = "deprecated";

pub struct EraManager {
    pub era_id: String,
    pub network: String,
    pub version_label: String,
}

impl EraManager {
    pub fn new(era_id: &str, network: &str, version_label: &str) -> Self {
        Self {
            era_id: era_id.to_string(),
            network: network.to_string(),
            version_label: version_label.to_string(),
        }
    }

    fn status(&self, lake: &Lake) -> Result<Option<String>, Error> {
        let mut stmt = lake
            .connection()
            .prepare("SELECT status FROM _meta_eras WHERE era_id = ? AND network = ?")?;
        let mut rows = stmt.query_map(params![self.era_id, self.network], |row| {
            row.get::<_, String>(0)
        })?;
        Ok(rows.next().transpose()?)
    }

    /// Startup gate: the configured era must exist as `active` (it is
    /// inserted if missing). A frozen or deprecated era refuses startup
    /// before any extractor runs, and a different active era on the same
    /// network is a configuration error.
    pub fn ensure_active(&self, lake: &Lake, ledger_start: u32) -> Result<(), Error> {
        match self.status(lake)?.as_deref() {
            Some(STATUS_ACTIVE) => Ok(()),
            Some(status) => Err(Error::EraBlocked {
                era_id: self.era_id.clone(),
                status: status.to_string(),
            }),
            None => {
                let mut stmt = lake.connection().prepare(
                    "SELECT era_id FROM _meta_eras WHERE network = ? AND status = ?",
                )?;
                let mut rows =
                    stmt.query_map(params![self.network, STATUS_ACTIVE], |row| {
                        row.get::<_, String>(0)
                    })?;
                if let Some(other) = rows.next().transpose()? {
                    return Err(Error::EraBlocked {
                        era_id: other,
                        status: format!("already active for network {}", self.network),
                    });
                }
                // OR IGNORE: parallel workers race through this insert.
                lake.connection().execute(
                    "INSERT OR IGNORE INTO _meta_eras
                     (era_id, network, version_label, ledger_start, status, created_at)
                     VALUES (?, ?, ?, ?, ?, ?)",
                    params![
                        self.era_id,
                        self.network,
                        self.version_label,
                        ledger_start,
                        STATUS_ACTIVE,
                        chrono::Utc::now().timestamp(),
                    ],
                )?;
                info!(era = %self.era_id, "registered new active era");
                Ok(())
            }
        }
    }

    /// Records the newest PAS event hash as the era's chain head.
    pub fn update_chain_head(&self, lake: &Lake, event_hash: &str) -> Result<(), Error> {
        lake.connection().execute(
            "UPDATE _meta_eras SET pas_chain_head = ? WHERE era_id = ? AND network = ?",
            params![event_hash, self.era_id, self.network],
        )?;
        Ok(())
    }

    /// `active → frozen`, irreversibly, stamping the closing ledger.
    pub fn freeze(&self, lake: &Lake, ledger_end: u32) -> Result<(), Error> {
        match self.status(lake)?.as_deref() {
            Some(STATUS_ACTIVE) => {
                lake.connection().execute(
                    "UPDATE _meta_eras
                     SET status = ?, ledger_end = ?, frozen_at = ?
                     WHERE era_id = ? AND network = ?",
                    params![
                        STATUS_FROZEN,
                        ledger_end,
                        chrono::Utc::now().timestamp(),
                        self.era_id,
                        self.network,
                    ],
                )?;
                info!(era = %self.era_id, ledger_end, "era frozen");
                Ok(())
            }
            Some(status) => Err(Error::NotFreezable {
                era_id: self.era_id.clone(),
                status: status.to_string(),
            }),
            None => Err(Error::NotFreezable {
                era_id: self.era_id.clone(),
                status: "missing".to_string(),
            }),
        }
    }

    pub fn chain_head(&self, lake: &Lake) -> Result<Option<String>, Error> {
        let mut stmt = lake
            .connection()
            .prepare("SELECT pas_chain_head FROM _meta_eras WHERE era_id = ? AND network = ?")?;
        let mut rows = stmt.query_map(params![self.era_id, self.network], |row| {
            row.get::<_, Option<String>>(0)
        })?;
        Ok(rows.next().transpose()?.flatten())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_lake() -> Lake {
        let lake = Lake::open_ephemeral().unwrap();
        lake.ensure_tables().unwrap();
        lake
    }

    fn manager() -> EraManager {
        EraManager::new("era-2025-q3", "testnet", "v2")
    }

    #[test]
    fn first_startup_inserts_active_era() {
        let lake = test_lake();
        let era = manager();
        era.ensure_active(&lake, 100).unwrap();
        era.ensure_active(&lake, 100).unwrap();
        assert_eq!(era.chain_head(&lake).unwrap(), None);
    }

    #[test]
    fn frozen_era_blocks_startup() {
        let lake = test_lake();
        let era = manager();
        era.ensure_active(&lake, 100).unwrap();
        era.freeze(&lake, 199).unwrap();

        let err = era.ensure_active(&lake, 200).unwrap_err();
        assert!(matches!(err, Error::EraBlocked { .. }));
        assert_eq!(
            err.to_string(),
            "era era-2025-q3 is frozen; writes are rejected"
        );
    }

    #[test]
    fn freeze_is_not_repeatable() {
        let lake = test_lake();
        let era = manager();
        era.ensure_active(&lake, 100).unwrap();
        era.freeze(&lake, 199).unwrap();
        let err = era.freeze(&lake, 250).unwrap_err();
        assert!(matches!(err, Error::NotFreezable { .. }));
    }

    #[test]
    fn second_active_era_on_same_network_is_rejected() {
        let lake = test_lake();
        manager().ensure_active(&lake, 100).unwrap();
        let other = EraManager::new("era-2025-q4", "testnet", "v2");
        assert!(matches!(
            other.ensure_active(&lake, 200),
            Err(Error::EraBlocked { .. })
        ));
    }

    #[test]
    fn chain_head_tracks_latest_event() {
        let lake = test_lake();
        let era = manager();
        era.ensure_active(&lake, 100).unwrap();
        era.update_chain_head(&lake, &"a".repeat(64)).unwrap();
        era.update_chain_head(&lake, &"b".repeat(64)).unwrap();
        assert_eq!(era.chain_head(&lake).unwrap(), Some("b".repeat(64)));
    }
}
