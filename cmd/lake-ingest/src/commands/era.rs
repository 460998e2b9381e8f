use clap::Parser;

use crate::{
    commands::global,
    config::{self, Config},
    lake::{era::EraManager, Lake},
};

#[derive(Parser, Debug)]
pub enum Cmd {
    /// Freeze the configured era, closing it at the given ledger
    Freeze(FreezeCmd),
}

#[derive(Parser, Debug)]
#[group(skip)]
pub struct FreezeCmd {
    /// The last ledger covered by the era
    #[arg(long)]
    pub ledger_end: u32,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] config::Error),

    #[error(transparent)]
    Lake(#[from] crate::lake::Error),
}

impl Cmd {
    pub fn run(&self, global_args: &global::Args) -> Result<(), Error> {
        match self {
            Cmd::Freeze(cmd) => cmd.run(global_args),
        }
    }
}

impl FreezeCmd {
    pub fn run(&self, global_args: &global::Args) -> Result<(), Error> {
        let config = Config::load(&global_args.config, global_args.legacy_config)?;
        let lake = Lake::open(&config.lake)?;
        lake.ensure_meta_eras()?;

        let network = config
            .network
            .name
            .clone()
            .unwrap_or_else(|| config.network.passphrase.clone());
        let era = EraManager::new(&config.era.era_id, &network, &config.era.version_label);
        era.freeze(&lake, self.ledger_end)?;
        println!("era {} frozen at ledger {}", config.era.era_id, self.ledger_end);
        Ok(())
    }
}
