//! Namechain Node Library.
//!
//! Command line tools to inspect name scripts and the name registry rules of a network.

mod cli;
mod commands;

pub use self::cli::run;

/// Command line error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid input: {0}")]
    Input(String),
    #[error("Invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

pub type Result<T> = std::result::Result<T, Error>;
