#![allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_panics_doc
)]
pub mod audit;
pub mod buffer;
pub mod cli;
pub mod commands;
pub mod config;
pub mod extract;
pub mod flowctl;
pub mod ingest;
pub mod lake;
pub mod model;
pub mod quality;
pub mod source;
#[cfg(test)]
pub mod testutils;
pub mod toid;
pub mod version;

pub use commands::Root;
pub use stellar_xdr::curr as xdr;
