//! Subcommand orchestration: operation selection, console output and export.
mod console;
mod export;
mod run;
mod select;


pub(crate) use run::{RunStatus, run_benchmark, run_test};
