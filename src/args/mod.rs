//! CLI argument types and parsing helpers.
mod cli;
pub(crate) mod parsers;
mod types;


pub use cli::{BenchmarkArgs, Cli, Command, CommonArgs, TestArgs};
pub use types::OutputFormat;
