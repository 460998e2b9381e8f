use std::path::PathBuf;

use duckdb::Connection;
use tracing::{debug, info};

use crate::config::LakeConfig;

pub mod era;
pub mod meta;
pub mod schema;
pub mod sink;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("lake engine: {0}")]
    Duckdb(#[from] duckdb::Error),

    #[error("creating lake data dir {path}: {error}")]
    CreateDataDir {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("era {era_id} is {status}; writes are rejected")]
    EraBlocked { era_id: String, status: String },

    #[error("era {era_id} is {status}; only an active era may be frozen")]
    NotFreezable { era_id: String, status: String },
}

/// One worker's connection to the lakehouse catalog. The engine serializes
/// concurrent catalog writers internally; each worker still owns its own
/// connection and appenders.
pub struct Lake {
    conn: Connection,
    schema: String,
}

impl Lake {
    pub fn open(config: &LakeConfig) -> Result<Self, Error> {
        std::fs::create_dir_all(&config.data_path).map_err(|error| Error::CreateDataDir {
            path: config.data_path.clone(),
            error,
        })?;

        let conn = match &config.catalog {
            Some(catalog) => {
                let conn = Connection::open_in_memory()?;
                conn.execute_batch(&format!("ATTACH '{catalog}' AS lake; USE lake;"))?;
                conn
            }
            None => {
                let path = config.data_path.join("catalog.duckdb");
                Connection::open(path)?
            }
        };

        if let Some(s3) = &config.s3 {
            let url_style = s3.url_style.as_deref().unwrap_or("path");
            conn.execute_batch(&format!(
                "CREATE OR REPLACE SECRET lake_s3 (
                    TYPE S3,
                    KEY_ID '{}',
                    SECRET '{}',
                    REGION '{}',
                    ENDPOINT '{}',
                    URL_STYLE '{url_style}'
                )",
                s3.key_id, s3.secret, s3.region, s3.endpoint,
            ))?;
            debug!("configured s3 secret for lake storage");
        }

        conn.execute_batch(&format!(
            "CREATE SCHEMA IF NOT EXISTS {0}; USE {0};",
            config.schema
        ))?;

        Ok(Self {
            conn,
            schema: config.schema.clone(),
        })
    }

    /// A second connection to the same database instance. Workers clone
    /// the root connection instead of re-opening the file; the engine
    /// serializes concurrent writers internally.
    pub fn try_clone(&self) -> Result<Self, Error> {
        Ok(Self {
            conn: self.conn.try_clone()?,
            schema: self.schema.clone(),
        })
    }

    /// In-memory lake with the default schema, for tests.
    pub fn open_ephemeral() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("CREATE SCHEMA IF NOT EXISTS raw; USE raw;")?;
        Ok(Self {
            conn,
            schema: "raw".to_string(),
        })
    }

    /// Creates only the era registry, so the era gate can run before any
    /// other table exists.
    pub fn ensure_meta_eras(&self) -> Result<(), Error> {
        let ddl = schema::META_DDL
            .iter()
            .find(|(table, _)| *table == "_meta_eras")
            .map(|(_, ddl)| *ddl)
            .unwrap_or_default();
        self.conn.execute_batch(ddl)?;
        Ok(())
    }

    /// Creates every dataset and meta table that does not exist yet.
    /// Returns the tables that were newly created, for the change log.
    pub fn ensure_tables(&self) -> Result<Vec<String>, Error> {
        let existing = self.existing_tables()?;
        let mut created = Vec::new();
        for (table, ddl) in schema::TABLE_DDL.iter().chain(schema::META_DDL.iter()) {
            self.conn.execute_batch(ddl)?;
            if !existing.contains(&(*table).to_string()) {
                created.push((*table).to_string());
            }
        }
        if !created.is_empty() {
            info!(count = created.len(), "created lake tables");
        }
        Ok(created)
    }

    fn existing_tables(&self) -> Result<Vec<String>, Error> {
        let mut stmt = self.conn.prepare(
            "SELECT table_name FROM information_schema.tables WHERE table_schema = ?",
        )?;
        let names = stmt
            .query_map([&self.schema], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }
}
