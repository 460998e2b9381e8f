use std::path::PathBuf;

#[derive(Debug, clap::Args, Clone, Default)]
#[group(skip)]
pub struct Args {
    /// Path to the YAML pipeline config
    #[arg(long, short = 'c', env = "INGEST_CONFIG", default_value = "config.yaml")]
    pub config: PathBuf,

    /// Parse the config with the flat legacy source shape
    #[arg(long)]
    pub legacy_config: bool,

    /// Filter logs output. To turn on `stellar_lake_ingest::source=trace`
    #[arg(long, short = 'f')]
    pub filter_logs: Vec<String>,

    /// Do not write logs to stderr
    #[arg(long, short = 'q')]
    pub quiet: bool,

    /// Log DEBUG events
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Log DEBUG and TRACE events
    #[arg(long, alias = "vv")]
    pub very_verbose: bool,

    /// Write the output of the logs to a file
    #[arg(long, alias = "log-to")]
    pub log_file: Option<PathBuf>,
}

impl Args {
    pub fn log_level(&self) -> Option<tracing::Level> {
        if self.quiet {
            None
        } else if self.very_verbose {
            Some(tracing::Level::TRACE)
        } else if self.verbose {
            Some(tracing::Level::DEBUG)
        } else {
            Some(tracing::Level::INFO)
        }
    }
}
