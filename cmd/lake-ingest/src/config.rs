use std::{fmt, fs, path::{Path, PathBuf}};

use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("reading config {path}: {error}")]
    Read { path: PathBuf, error: std::io::Error },
    #[error("parsing config {path}: {error}")]
    Parse { path: PathBuf, error: serde_yaml::Error },
    #[error("invalid ledger range: start {start} greater than end {end}")]
    InvalidRange { start: u32, end: u32 },
    #[error("source mode {0} requires {1} to be set")]
    IncompleteSource(SourceMode, &'static str),
    #[error("network passphrase must not be empty")]
    EmptyPassphrase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMode {
    Rpc,
    Datastore,
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceMode::Rpc => f.write_str("rpc"),
            SourceMode::Datastore => f.write_str("datastore"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub passphrase: String,
    #[serde(default)]
    pub name: Option<String>,
}

fn default_poll_interval() -> u64 {
    2
}

fn default_stall_timeout() -> u64 {
    900
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub mode: SourceMode,
    #[serde(default)]
    pub rpc_url: Option<String>,
    /// Extra HTTP headers sent with every RPC request, e.g. auth tokens.
    #[serde(default)]
    pub rpc_headers: Vec<(String, String)>,
    #[serde(default)]
    pub datastore_path: Option<PathBuf>,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_stall_timeout")]
    pub stall_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RangeConfig {
    pub start: u32,
    #[serde(default)]
    pub end: Option<u32>,
}

fn default_batch_size() -> usize {
    64
}

fn default_commit_interval() -> u64 {
    10
}

fn default_num_workers() -> usize {
    1
}

fn default_shutdown_flush_timeout() -> u64 {
    30
}

fn default_pas_backup_every() -> u64 {
    256
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_commit_interval")]
    pub commit_interval_secs: u64,
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,
    #[serde(default = "default_shutdown_flush_timeout")]
    pub shutdown_flush_timeout_secs: u64,
    /// When true, a manifest/PAS/checkpoint failure aborts the worker
    /// instead of logging a warning.
    #[serde(default)]
    pub strict_audit: bool,
    #[serde(default = "default_pas_backup_every")]
    pub pas_backup_every: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            commit_interval_secs: default_commit_interval(),
            num_workers: default_num_workers(),
            shutdown_flush_timeout_secs: default_shutdown_flush_timeout(),
            strict_audit: false,
            pas_backup_every: default_pas_backup_every(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    pub endpoint: String,
    pub region: String,
    pub key_id: String,
    pub secret: String,
    #[serde(default)]
    pub url_style: Option<String>,
}

fn default_schema() -> String {
    "raw".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LakeConfig {
    pub data_path: PathBuf,
    /// Optional catalog to ATTACH; when absent the database at
    /// `<data_path>/catalog.duckdb` is used directly.
    #[serde(default)]
    pub catalog: Option<String>,
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default)]
    pub s3: Option<S3Config>,
}

fn default_era_id() -> String {
    "default".to_string()
}

fn default_version_label() -> String {
    "v2".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EraConfig {
    #[serde(default = "default_era_id")]
    pub era_id: String,
    #[serde(default = "default_version_label")]
    pub version_label: String,
}

impl Default for EraConfig {
    fn default() -> Self {
        Self {
            era_id: default_era_id(),
            version_label: default_version_label(),
        }
    }
}

fn default_working_dir() -> PathBuf {
    PathBuf::from("state")
}

fn default_producer_id() -> String {
    "stellar-lake-ingest".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub network: Network,
    pub source: SourceConfig,
    pub range: RangeConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    pub lake: LakeConfig,
    #[serde(default)]
    pub era: EraConfig,
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,
    #[serde(default = "default_producer_id")]
    pub producer_id: String,
}

/// The flat document shape produced by first-generation deployments. It
/// predates the datastore mode and the era registry, so everything beyond
/// network/source/range takes defaults.
#[derive(Debug, Clone, Deserialize)]
struct LegacyConfig {
    network_passphrase: String,
    rpc_url: String,
    start_ledger: u32,
    #[serde(default)]
    end_ledger: Option<u32>,
    #[serde(default = "default_batch_size")]
    batch_size: usize,
    data_path: PathBuf,
    #[serde(default = "default_working_dir")]
    working_dir: PathBuf,
}

impl From<LegacyConfig> for Config {
    fn from(legacy: LegacyConfig) -> Self {
        Config {
            network: Network {
                passphrase: legacy.network_passphrase,
                name: None,
            },
            source: SourceConfig {
                mode: SourceMode::Rpc,
                rpc_url: Some(legacy.rpc_url),
                rpc_headers: Vec::new(),
                datastore_path: None,
                poll_interval_secs: default_poll_interval(),
                stall_timeout_secs: default_stall_timeout(),
            },
            range: RangeConfig {
                start: legacy.start_ledger,
                end: legacy.end_ledger,
            },
            ingest: IngestConfig {
                batch_size: legacy.batch_size,
                ..IngestConfig::default()
            },
            lake: LakeConfig {
                data_path: legacy.data_path,
                catalog: None,
                schema: default_schema(),
                s3: None,
            },
            era: EraConfig::default(),
            working_dir: legacy.working_dir,
            producer_id: default_producer_id(),
        }
    }
}

impl Config {
    pub fn load(path: &Path, legacy: bool) -> Result<Self, Error> {
        let raw = fs::read_to_string(path).map_err(|error| Error::Read {
            path: path.to_path_buf(),
            error,
        })?;
        let config: Config = if legacy {
            let legacy: LegacyConfig =
                serde_yaml::from_str(&raw).map_err(|error| Error::Parse {
                    path: path.to_path_buf(),
                    error,
                })?;
            legacy.into()
        } else {
            serde_yaml::from_str(&raw).map_err(|error| Error::Parse {
                path: path.to_path_buf(),
                error,
            })?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.network.passphrase.is_empty() {
            return Err(Error::EmptyPassphrase);
        }
        if let Some(end) = self.range.end {
            if self.range.start > end {
                return Err(Error::InvalidRange {
                    start: self.range.start,
                    end,
                });
            }
        }
        match self.source.mode {
            SourceMode::Rpc if self.source.rpc_url.is_none() => {
                Err(Error::IncompleteSource(SourceMode::Rpc, "rpc_url"))
            }
            SourceMode::Datastore if self.source.datastore_path.is_none() => Err(
                Error::IncompleteSource(SourceMode::Datastore, "datastore_path"),
            ),
            _ => Ok(()),
        }
    }

    /// CLI `--start-ledger` wins over the configured range start.
    pub fn with_start_override(mut self, start_ledger: Option<u32>) -> Self {
        if let Some(start) = start_ledger {
            self.range.start = start;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
network:
  passphrase: "Test SDF Network ; September 2015"
  name: testnet
source:
  mode: rpc
  rpc_url: "http://localhost:8000"
  rpc_headers:
    - ["Authorization", "Bearer 1234"]
range:
  start: 100
  end: 199
ingest:
  batch_size: 50
  commit_interval_secs: 3600
lake:
  data_path: ./lake
era:
  era_id: era-2025-q3
  version_label: v2
working_dir: ./state
"#;

    const LEGACY: &str = r#"
network_passphrase: "Test SDF Network ; September 2015"
rpc_url: "http://localhost:8000"
start_ledger: 100
data_path: ./lake
"#;

    #[test]
    fn parses_full_config() {
        let config: Config = serde_yaml::from_str(FULL).unwrap();
        config.validate().unwrap();
        assert_eq!(config.source.mode, SourceMode::Rpc);
        assert_eq!(config.range.end, Some(199));
        assert_eq!(config.ingest.batch_size, 50);
        assert_eq!(config.ingest.commit_interval_secs, 3600);
        assert_eq!(config.ingest.num_workers, 1);
        assert_eq!(config.era.era_id, "era-2025-q3");
        assert_eq!(
            config.source.rpc_headers,
            vec![("Authorization".to_string(), "Bearer 1234".to_string())]
        );
    }

    #[test]
    fn parses_legacy_config() {
        let legacy: LegacyConfig = serde_yaml::from_str(LEGACY).unwrap();
        let config: Config = legacy.into();
        config.validate().unwrap();
        assert_eq!(config.source.mode, SourceMode::Rpc);
        assert_eq!(config.range.start, 100);
        assert_eq!(config.range.end, None);
        assert_eq!(config.era.era_id, "default");
    }

    #[test]
    fn rejects_inverted_range() {
        let mut config: Config = serde_yaml::from_str(FULL).unwrap();
        config.range.start = 500;
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid ledger range: start 500 greater than end 199"
        );
    }

    #[test]
    fn rejects_rpc_mode_without_url() {
        let mut config: Config = serde_yaml::from_str(FULL).unwrap();
        config.source.rpc_url = None;
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "source mode rpc requires rpc_url to be set");
    }

    #[test]
    fn start_override_wins() {
        let config: Config = serde_yaml::from_str(FULL).unwrap();
        let config = config.with_start_override(Some(150));
        assert_eq!(config.range.start, 150);
    }
}
