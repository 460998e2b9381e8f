use clap::Parser;

pub mod era;
pub mod global;
pub mod pas;
pub mod run;
pub mod version;

const ABOUT: &str = "Stream closed Stellar ledgers into an analytic lakehouse.

Consumes an ordered range of closed-ledger records from an RPC or datastore
source, decomposes each ledger into normalized datasets, and appends them to
the configured lake in audited, checkpointed batches.";

#[derive(Parser, Debug)]
#[command(
    name = "stellar-lake-ingest",
    about = ABOUT,
    version = version::long(),
    disable_help_subcommand = true,
)]
pub struct Root {
    #[clap(flatten)]
    pub global_args: global::Args,

    #[command(subcommand)]
    pub cmd: Cmd,
}

impl Root {
    pub fn new() -> Result<Self, Error> {
        Self::try_parse().map_err(Error::Clap)
    }

    pub async fn run(&mut self) -> Result<(), Error> {
        match &mut self.cmd {
            Cmd::Run(cmd) => cmd.run(&self.global_args).await?,
            Cmd::Pas(cmd) => cmd.run(&self.global_args)?,
            Cmd::Era(cmd) => cmd.run(&self.global_args)?,
            Cmd::Version(cmd) => cmd.run(),
        }
        Ok(())
    }
}

#[derive(Parser, Debug)]
pub enum Cmd {
    /// Run the ingestion pipeline over the configured ledger range
    Run(run::Cmd),
    /// Inspect and verify the provenance audit stream
    #[command(subcommand)]
    Pas(pas::Cmd),
    /// Administer processing eras
    #[command(subcommand)]
    Era(era::Cmd),
    /// Print version information
    Version(version::Cmd),
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Run(#[from] run::Error),
    #[error(transparent)]
    Pas(#[from] pas::Error),
    #[error(transparent)]
    Era(#[from] era::Error),
    #[error(transparent)]
    Clap(#[from] clap::error::Error),
}
