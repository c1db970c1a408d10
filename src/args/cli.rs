use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use super::parsers::{
    parse_bool_env, parse_duration_arg, parse_positive_usize, parse_rate,
};
use super::types::OutputFormat;

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Contract tests and latency benchmarks for REST APIs, driven by their OpenAPI documents."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Send one generated request per operation and validate each response
    Test(TestArgs),
    /// Measure latency percentiles, throughput and error rates per operation
    Benchmark(BenchmarkArgs),
}

impl Command {
    #[must_use]
    pub const fn common(&self) -> &CommonArgs {
        match self {
            Self::Test(args) => &args.common,
            Self::Benchmark(args) => &args.common,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Test(_) => "test",
            Self::Benchmark(_) => "benchmark",
        }
    }
}

/// Flags shared by both subcommands.
#[derive(Debug, Args, Clone)]
pub struct CommonArgs {
    /// OpenAPI 3.x document (.json, .yaml or .yml)
    #[arg(value_name = "OPENAPI_FILE")]
    pub document: String,

    /// Override the server URL declared in the document
    #[arg(long)]
    pub server: Option<String>,

    /// Keep operations whose path or operation id contains this text
    #[arg(long)]
    pub filter: Option<String>,

    /// Keep operations carrying any of these tags (repeatable or comma separated)
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Show per-operation details and debug logs (unless overridden by SPECSTRESS_LOG/RUST_LOG)
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Per-request timeout (supports ms/s/m/h, bare numbers are seconds)
    #[arg(long, short = 't', default_value = "30s", value_parser = parse_duration_arg)]
    pub timeout: Duration,

    /// Export results as json or csv
    #[arg(long, short = 'o', value_enum)]
    pub output: Option<OutputFormat>,

    /// Write the export to this file instead of stdout
    #[arg(long = "output-file")]
    pub output_file: Option<String>,

    /// Seed for generated request data (random when unset)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Disable color output
    #[arg(long = "no-color", env = "NO_COLOR", value_parser = parse_bool_env)]
    pub no_color: bool,

    /// Config file (defaults to ./specstress.toml or ./specstress.json when present)
    #[arg(long)]
    pub config: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct TestArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Args, Clone)]
pub struct BenchmarkArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Measured requests per operation
    #[arg(long, short = 'n', default_value = "100", value_parser = parse_positive_usize)]
    pub iterations: usize,

    /// Concurrent workers per operation
    #[arg(long, short = 'c', default_value = "1", value_parser = parse_positive_usize)]
    pub concurrency: usize,

    /// Unmeasured warm-up requests per operation
    #[arg(long, short = 'w', default_value_t = 5)]
    pub warmup: usize,

    /// Maximum requests per second across all workers (0 = unlimited)
    #[arg(long, short = 'r', default_value = "0", value_parser = parse_rate)]
    pub rate: f64,

    /// Open a new connection for every request
    #[arg(long = "no-keepalive")]
    pub no_keepalive: bool,
}
