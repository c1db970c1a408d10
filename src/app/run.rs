use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::args::{BenchmarkArgs, CommonArgs, TestArgs};
use crate::benchmark::{BenchmarkConfig, BenchmarkEvent, Benchmarker, EventHandler};
use crate::error::{AppError, AppResult};
use crate::openapi::{ApiDocument, Operation, OperationProvider};
use crate::shutdown::Shutdown;
use crate::tester::{Tester, TesterConfig};

use super::console::{Console, Stream};
use super::export::{export_benchmark_summary, export_test_summary};
use super::select::{base_url, select_operations};

const NO_OPERATIONS: &str = "No operations found matching the criteria";

/// Outcome of a subcommand, mapped to the process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunStatus {
    Success,
    Failed,
}

struct Plan {
    document: ApiDocument,
    operations: Vec<Operation>,
    console: Console,
}

fn plan(common: &CommonArgs) -> AppResult<Plan> {
    let document = ApiDocument::from_path(Path::new(&common.document)).map_err(AppError::spec)?;
    let server = base_url(&document, common.server.as_deref());
    let operations = select_operations(
        document.operations(&server),
        common.filter.as_deref(),
        &common.tags,
    );
    debug!(
        "Loaded '{}' {}: {} operations selected against {}",
        document.title(),
        document.version(),
        operations.len(),
        server
    );

    // Keep stdout clean for the export when it goes there.
    let stream = if common.output.is_some() && common.output_file.is_none() {
        Stream::Stderr
    } else {
        Stream::Stdout
    };
    let console = Console::new(common.no_color, common.verbose, stream);
    Ok(Plan {
        document,
        operations,
        console,
    })
}

/// Runs the `test` subcommand. Fails when any operation failed or the run
/// was interrupted.
///
/// # Errors
///
/// Returns an error when the document cannot be loaded, the HTTP client
/// cannot be built or the export cannot be written.
pub(crate) async fn run_test(args: &TestArgs, shutdown: &Shutdown) -> AppResult<RunStatus> {
    let common = &args.common;
    let Plan {
        document,
        operations,
        console,
    } = plan(common)?;
    if operations.is_empty() {
        console.note(NO_OPERATIONS);
        return Ok(RunStatus::Success);
    }

    let mut tester = Tester::new(&TesterConfig {
        timeout: common.timeout,
        seed: common.seed,
    })?
    .with_shutdown(shutdown.clone());
    let summary = tester
        .test_many(&operations, &document, |event| console.on_test_event(event))
        .await;

    if let Some(format) = common.output {
        export_test_summary(&summary, format, common.output_file.as_deref()).await?;
        if let Some(path) = common.output_file.as_deref() {
            console.note(&format!("\nResults exported to: {}", path));
        }
    }
    console.print_test_summary(&summary);

    if shutdown.is_cancelled() {
        info!("Test run interrupted after {} operations", summary.total_tests);
        return Ok(RunStatus::Failed);
    }
    Ok(if summary.all_passed() {
        RunStatus::Success
    } else {
        RunStatus::Failed
    })
}

/// Runs the `benchmark` subcommand. Partial results of an interrupted run
/// are still reported and exported.
///
/// # Errors
///
/// Returns an error when the document cannot be loaded, the HTTP client
/// cannot be built or the export cannot be written.
pub(crate) async fn run_benchmark(
    args: &BenchmarkArgs,
    shutdown: &Shutdown,
) -> AppResult<RunStatus> {
    let common = &args.common;
    let Plan {
        document,
        operations,
        console,
    } = plan(common)?;
    if operations.is_empty() {
        console.note(NO_OPERATIONS);
        return Ok(RunStatus::Success);
    }

    let config = BenchmarkConfig {
        iterations: args.iterations,
        concurrency: args.concurrency,
        warmup_runs: args.warmup,
        rate_limit: args.rate,
        timeout: common.timeout,
        keep_alive: !args.no_keepalive,
        seed: common.seed,
    };
    console.print_benchmark_configuration(&config, operations.len());

    let console = Arc::new(console);
    let handler_console = Arc::clone(&console);
    let on_event: EventHandler = Arc::new(move |event: &BenchmarkEvent<'_>| {
        handler_console.on_benchmark_event(event);
    });
    let benchmarker = Benchmarker::new(config, shutdown.clone())?.with_event_handler(on_event);

    let summary = benchmarker.benchmark_operations(&operations, &document).await;
    if shutdown.is_cancelled() {
        console.note("\nBenchmark interrupted, reporting partial results...");
    }

    if let Some(format) = common.output {
        export_benchmark_summary(&summary, format, common.output_file.as_deref()).await?;
        if let Some(path) = common.output_file.as_deref() {
            console.note(&format!("\nResults exported to: {}", path));
        }
    }
    console.print_benchmark_summary(&summary);
    Ok(RunStatus::Success)
}
