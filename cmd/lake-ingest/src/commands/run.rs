use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    commands::global,
    config::{self, Config},
    flowctl, ingest,
};

#[derive(Parser, Debug)]
#[group(skip)]
pub struct Cmd {
    /// Override the configured start ledger
    #[arg(long)]
    pub start_ledger: Option<u32>,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] config::Error),

    #[error(transparent)]
    Ingest(#[from] ingest::Error),
}

impl Cmd {
    pub async fn run(&self, global_args: &global::Args) -> Result<(), Error> {
        let config = Config::load(&global_args.config, global_args.legacy_config)?
            .with_start_override(self.start_ledger);
        config.validate()?;

        flowctl::register_if_enabled(&config).await;

        let cancel = CancellationToken::new();
        let signal_cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown signal received; flushing remaining buffer");
                signal_cancel.cancel();
            }
        });

        let summary = ingest::runner::run(config, cancel).await?;
        info!(
            ledgers = summary.ledgers_processed,
            flushes = summary.flushes,
            "ingestion complete"
        );
        Ok(())
    }
}
