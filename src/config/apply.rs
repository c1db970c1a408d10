use clap::ArgMatches;
use clap::parser::ValueSource;

use crate::args::{BenchmarkArgs, Command, CommonArgs};
use crate::error::{AppError, AppResult, ConfigError, InputError};

use super::types::{BenchmarkSection, ConfigFile};

/// Applies configuration values to the parsed subcommand wherever the flag
/// was not given on the command line.
///
/// `matches` are the subcommand's own matches.
///
/// # Errors
///
/// Returns an error when a config value is out of range.
pub fn apply_config(
    command: &mut Command,
    matches: &ArgMatches,
    config: &ConfigFile,
) -> AppResult<()> {
    match command {
        Command::Test(args) => apply_common(&mut args.common, matches, config),
        Command::Benchmark(args) => {
            apply_common(&mut args.common, matches, config)?;
            if let Some(section) = config.benchmark.as_ref() {
                apply_benchmark(args, matches, section)?;
            }
            Ok(())
        }
    }
}

fn apply_common(
    args: &mut CommonArgs,
    matches: &ArgMatches,
    config: &ConfigFile,
) -> AppResult<()> {
    if !is_cli(matches, "server")
        && let Some(server) = config.server.clone()
    {
        args.server = Some(server);
    }

    if !is_cli(matches, "filter")
        && let Some(filter) = config.filter.clone()
    {
        args.filter = Some(filter);
    }

    if !is_cli(matches, "tags")
        && let Some(tags) = config.tags.clone()
    {
        args.tags = tags;
    }

    if !is_cli(matches, "verbose")
        && let Some(verbose) = config.verbose
    {
        args.verbose = verbose;
    }

    if !is_cli(matches, "timeout")
        && let Some(timeout) = config.timeout.as_ref()
    {
        args.timeout = timeout
            .to_duration()
            .map_err(|err| invalid_field("timeout", err))?;
    }

    if !is_cli(matches, "output")
        && let Some(output) = config.output
    {
        args.output = Some(output);
    }

    if !is_cli(matches, "output_file")
        && let Some(output_file) = config.output_file.clone()
    {
        args.output_file = Some(output_file);
    }

    if !is_cli(matches, "seed")
        && let Some(seed) = config.seed
    {
        args.seed = Some(seed);
    }

    if !is_cli(matches, "no_color")
        && let Some(no_color) = config.no_color
    {
        args.no_color = no_color;
    }

    Ok(())
}

fn apply_benchmark(
    args: &mut BenchmarkArgs,
    matches: &ArgMatches,
    section: &BenchmarkSection,
) -> AppResult<()> {
    if !is_cli(matches, "iterations")
        && let Some(iterations) = section.iterations
    {
        args.iterations = ensure_positive(iterations, "benchmark.iterations")?;
    }

    if !is_cli(matches, "concurrency")
        && let Some(concurrency) = section.concurrency
    {
        args.concurrency = ensure_positive(concurrency, "benchmark.concurrency")?;
    }

    if !is_cli(matches, "warmup")
        && let Some(warmup) = section.warmup
    {
        args.warmup = warmup;
    }

    if !is_cli(matches, "rate")
        && let Some(rate) = section.rate
    {
        if !rate.is_finite() || rate < 0.0 {
            return Err(invalid_field(
                "benchmark.rate",
                InputError::InvalidRate {
                    value: rate.to_string(),
                },
            ));
        }
        args.rate = rate;
    }

    if !is_cli(matches, "no_keepalive")
        && let Some(no_keepalive) = section.no_keepalive
    {
        args.no_keepalive = no_keepalive;
    }

    Ok(())
}

fn is_cli(matches: &ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(ValueSource::CommandLine)
}

fn ensure_positive(value: usize, field: &'static str) -> AppResult<usize> {
    if value == 0 {
        return Err(invalid_field(field, InputError::ValueTooSmall { min: 1 }));
    }
    Ok(value)
}

fn invalid_field(field: &'static str, source: InputError) -> AppError {
    AppError::config(ConfigError::InvalidField { field, source })
}
