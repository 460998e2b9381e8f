use std::path::PathBuf;

use clap::Parser;

use crate::{
    audit::pas,
    commands::global,
    config::{self, Config},
};

#[derive(Parser, Debug)]
pub enum Cmd {
    /// Re-read the provenance audit stream and recompute every hash
    Verify(VerifyCmd),
}

#[derive(Parser, Debug)]
#[group(skip)]
pub struct VerifyCmd {
    /// Verify a specific chain file instead of the configured working dir
    #[arg(long)]
    pub chain: Option<PathBuf>,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] config::Error),

    #[error(transparent)]
    Pas(#[from] pas::Error),

    #[error("no pas chain found under {0}")]
    NoChains(PathBuf),
}

impl Cmd {
    pub fn run(&self, global_args: &global::Args) -> Result<(), Error> {
        match self {
            Cmd::Verify(cmd) => cmd.run(global_args),
        }
    }
}

impl VerifyCmd {
    pub fn run(&self, global_args: &global::Args) -> Result<(), Error> {
        let chains = match &self.chain {
            Some(chain) => vec![chain.clone()],
            None => {
                let config =
                    Config::load(&global_args.config, global_args.legacy_config)?;
                discover_chains(&config.working_dir)?
            }
        };

        for chain in chains {
            let length = pas::verify_chain(&chain)?;
            println!("{}: ok ({length} events)", chain.display());
        }
        Ok(())
    }
}

/// The unified chain plus any per-worker shards under the working dir.
fn discover_chains(working_dir: &std::path::Path) -> Result<Vec<PathBuf>, Error> {
    let mut chains = Vec::new();
    let unified = working_dir.join("pas").join("chain.log");
    if unified.is_file() {
        chains.push(unified);
    }
    if let Ok(entries) = std::fs::read_dir(working_dir) {
        let mut sharded: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .filter(|e| {
                e.file_name()
                    .to_string_lossy()
                    .starts_with("worker-")
            })
            .map(|e| e.path().join("pas").join("chain.log"))
            .filter(|p| p.is_file())
            .collect();
        sharded.sort();
        chains.append(&mut sharded);
    }
    if chains.is_empty() {
        return Err(Error::NoChains(working_dir.to_path_buf()));
    }
    Ok(chains)
}
