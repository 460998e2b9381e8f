use clap::Parser;

use crate::version;

#[derive(Parser, Debug)]
#[group(skip)]
pub struct Cmd {}

impl Cmd {
    #[allow(clippy::unused_self)]
    pub fn run(&self) {
        println!("stellar-lake-ingest {}", long());
    }
}

pub fn long() -> String {
    version::long()
}
