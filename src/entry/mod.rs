//! Process entry: argument parsing, configuration, runtime and exit status.
use std::process::ExitCode;

use clap::{CommandFactory, FromArgMatches};
use tracing::error;

use crate::app::{RunStatus, run_benchmark, run_test};
use crate::args::{Cli, Command};
use crate::error::AppResult;
use crate::shutdown::Shutdown;
use crate::shutdown_handlers::setup_signal_shutdown_handler;

/// Runs the CLI with the process arguments.
///
/// # Errors
///
/// Returns an error when arguments, configuration or the API document are
/// invalid, or when results cannot be exported.
pub fn run() -> AppResult<ExitCode> {
    let command = parse_args()?;
    let common = command.common();
    crate::logger::init_logging(common.verbose, common.no_color);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let status = runtime.block_on(run_async(command));
    status.map(|status| match status {
        RunStatus::Success => ExitCode::SUCCESS,
        RunStatus::Failed => ExitCode::FAILURE,
    })
}

/// Parses the CLI and folds in the config file. Help and version requests
/// exit here.
fn parse_args() -> AppResult<Command> {
    let matches = Cli::command().get_matches();
    let mut cli = Cli::from_arg_matches(&matches)?;
    let sub_matches = matches
        .subcommand()
        .map(|(_, sub)| sub.clone())
        .unwrap_or_default();

    let config = crate::config::load_config(cli.command.common().config.as_deref())?;
    if let Some(config) = config.as_ref() {
        crate::config::apply_config(&mut cli.command, &sub_matches, config)?;
    }
    Ok(cli.command)
}

async fn run_async(command: Command) -> AppResult<RunStatus> {
    let shutdown = Shutdown::new();
    let signal_task = setup_signal_shutdown_handler(&shutdown);

    let outcome = match &command {
        Command::Test(args) => run_test(args, &shutdown).await,
        Command::Benchmark(args) => run_benchmark(args, &shutdown).await,
    };

    // Stops the signal task.
    shutdown.cancel();
    if let Err(err) = signal_task.await {
        error!("Signal handler task failed: {}", err);
    }
    outcome
}
