//! hnscan command line tool.
//!
//! Opens a block explorer index read-only and prints query results as JSON.

mod cli;
mod commands;
mod error;

pub use self::cli::run;
pub use self::error::{Error, Result};
