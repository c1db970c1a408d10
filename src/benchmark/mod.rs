//! Warm-up, concurrent rate-limited measurement and statistics per
//! operation, aggregated over a whole run.
mod stats;
mod worker;

#[cfg(test)]
mod tests;

use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use reqwest::Client;
use tracing::{debug, info, warn};

use crate::error::AppResult;
use crate::generator::Generator;
use crate::http::{ClientSettings, RateLimiter, RequestBuilder, build_client, send};
use crate::models::{BenchmarkResult, BenchmarkSummary};
use crate::openapi::{Operation, OperationDetails, OperationProvider};
use crate::shutdown::Shutdown;

pub use stats::percentile;

use worker::{Measurement, MeasuringPhase};

pub const DEFAULT_ITERATIONS: usize = 100;
pub const DEFAULT_CONCURRENCY: usize = 1;
pub const DEFAULT_WARMUP_RUNS: usize = 5;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Progress events per measuring phase, roughly one every 5%.
const PROGRESS_STEPS: usize = 20;
/// Warm-up progress events per warm-up phase.
const WARMUP_PROGRESS_STEPS: usize = 5;

#[derive(Debug, Clone, Copy)]
pub struct BenchmarkConfig {
    pub iterations: usize,
    pub concurrency: usize,
    pub warmup_runs: usize,
    /// Requests per second across all workers; zero means unlimited.
    pub rate_limit: f64,
    pub timeout: Duration,
    pub keep_alive: bool,
    pub seed: Option<u64>,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            concurrency: DEFAULT_CONCURRENCY,
            warmup_runs: DEFAULT_WARMUP_RUNS,
            rate_limit: 0.0,
            timeout: DEFAULT_TIMEOUT,
            keep_alive: true,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenchmarkEventKind {
    WarmupStarting,
    WarmupProgress,
    WarmupCompleted,
    BenchmarkStarting,
    BenchmarkProgress,
    BenchmarkCompleted,
}

/// One benchmark notification.
///
/// `progress`/`max_iterations` are set for starting and progress events;
/// the running figures only for `BenchmarkProgress`; `result` only for
/// `BenchmarkCompleted`.
#[derive(Debug, Clone, Copy)]
pub struct BenchmarkEvent<'run> {
    pub kind: BenchmarkEventKind,
    pub operation: &'run Operation,
    pub result: Option<&'run BenchmarkResult>,
    pub index: usize,
    pub total: usize,
    pub progress: usize,
    pub max_iterations: usize,
    pub running_avg: Duration,
    pub running_reqs_per_sec: f64,
    pub error_count: usize,
}

impl<'run> BenchmarkEvent<'run> {
    const fn new(
        kind: BenchmarkEventKind,
        operation: &'run Operation,
        index: usize,
        total: usize,
    ) -> Self {
        Self {
            kind,
            operation,
            result: None,
            index,
            total,
            progress: 0,
            max_iterations: 0,
            running_avg: Duration::ZERO,
            running_reqs_per_sec: 0.0,
            error_count: 0,
        }
    }
}

/// Receives events synchronously on whichever task produced them;
/// progress events may arrive from several workers at once.
pub type EventHandler = Arc<dyn Fn(&BenchmarkEvent<'_>) + Send + Sync>;

pub struct Benchmarker {
    config: BenchmarkConfig,
    client: Client,
    limiter: OnceLock<Option<Arc<RateLimiter>>>,
    shutdown: Shutdown,
    on_event: EventHandler,
}

impl Benchmarker {
    /// Creates a benchmarker whose HTTP pool holds at least one connection
    /// per worker.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be built.
    pub fn new(config: BenchmarkConfig, shutdown: Shutdown) -> AppResult<Self> {
        let config = BenchmarkConfig {
            concurrency: config.concurrency.max(1),
            timeout: if config.timeout.is_zero() {
                DEFAULT_TIMEOUT
            } else {
                config.timeout
            },
            ..config
        };
        let client = build_client(&ClientSettings {
            timeout: config.timeout,
            keep_alive: config.keep_alive,
            pool_size: config.concurrency,
        })?;
        Ok(Self {
            config,
            client,
            limiter: OnceLock::new(),
            shutdown,
            on_event: Arc::new(|_: &BenchmarkEvent<'_>| {}),
        })
    }

    #[must_use]
    pub fn with_event_handler(mut self, on_event: EventHandler) -> Self {
        self.on_event = on_event;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// One limiter for the whole run, started on first use.
    fn limiter(&self) -> Option<Arc<RateLimiter>> {
        self.limiter
            .get_or_init(|| RateLimiter::spawn(self.config.rate_limit).map(Arc::new))
            .clone()
    }

    fn emit(&self, event: &BenchmarkEvent<'_>) {
        (self.on_event)(event);
    }

    /// Benchmarks `operations` strictly in order and aggregates the results.
    ///
    /// Metadata or request-build failures are recorded as operations with a
    /// 100% error rate and the run moves on. A cancelled run returns the
    /// operations finished so far plus the partial one, if any request of
    /// it completed.
    pub async fn benchmark_operations(
        &self,
        operations: &[Operation],
        provider: &dyn OperationProvider,
    ) -> BenchmarkSummary {
        let mut summary = BenchmarkSummary::new(
            self.config.iterations,
            self.config.concurrency,
            self.config.warmup_runs,
        );
        let started = Instant::now();
        let total = operations.len();

        for (index, operation) in operations.iter().enumerate() {
            if self.shutdown.is_cancelled() {
                break;
            }
            let Some(result) = self
                .benchmark_operation(operation, provider, index, total)
                .await
            else {
                break;
            };
            summary.add_result(result);
        }
        if self.shutdown.is_cancelled() {
            info!(
                "Benchmark cancelled after {} of {} operations",
                summary.total_endpoints, total
            );
        }

        summary.finalize(started.elapsed());
        summary
    }

    /// Runs warm-up and measurement for one operation.
    ///
    /// Returns `None` when the run was cancelled before any measured
    /// request completed.
    pub async fn benchmark_operation(
        &self,
        operation: &Operation,
        provider: &dyn OperationProvider,
        index: usize,
        total: usize,
    ) -> Option<BenchmarkResult> {
        debug!("Benchmarking {} {}", operation.method, operation.path);
        let mut builder = RequestBuilder::new(Generator::with_seed(self.config.seed));

        let details = match self.prepare(operation, provider, &mut builder) {
            Ok(details) => details,
            Err(error) => return Some(self.fail(operation, error, index, total)),
        };

        if !self.warm_up(operation, &details, &mut builder, index, total).await {
            info!("Warm-up of {} {} cancelled", operation.method, operation.path);
            return None;
        }

        let mut starting = BenchmarkEvent::new(
            BenchmarkEventKind::BenchmarkStarting,
            operation,
            index,
            total,
        );
        starting.max_iterations = self.config.iterations;
        self.emit(&starting);

        let phase = MeasuringPhase {
            config: self.config,
            client: self.client.clone(),
            limiter: self.limiter(),
            shutdown: self.shutdown.clone(),
            on_event: Arc::clone(&self.on_event),
            operation: Arc::new(operation.clone()),
            details,
            index,
            total,
            progress_every: self.config.iterations.div_ceil(PROGRESS_STEPS).max(1),
        };
        let Measurement { samples, elapsed } = phase.run().await;

        let cancelled = samples.len() < self.config.iterations;
        if cancelled && samples.is_empty() {
            info!(
                "Measurement of {} {} cancelled before any request completed",
                operation.method, operation.path
            );
            return None;
        }

        let attempted = if cancelled {
            samples.len()
        } else {
            self.config.iterations
        };
        let mut result = BenchmarkResult::new(
            operation,
            attempted,
            self.config.concurrency,
            self.config.warmup_runs,
        );
        result.cancelled = cancelled;
        stats::summarize(&mut result, &samples, elapsed);
        debug!(
            "Finished {} {}: {} ok, {} errors in {:?}",
            operation.method, operation.path, result.success_count, result.error_count, elapsed
        );

        let mut completed = BenchmarkEvent::new(
            BenchmarkEventKind::BenchmarkCompleted,
            operation,
            index,
            total,
        );
        completed.result = Some(&result);
        self.emit(&completed);
        Some(result)
    }

    /// Fetches details and builds one request before anything is sent.
    fn prepare(
        &self,
        operation: &Operation,
        provider: &dyn OperationProvider,
        builder: &mut RequestBuilder,
    ) -> Result<Arc<OperationDetails>, String> {
        let details = provider
            .operation_details(&operation.path, operation.method)
            .map_err(|err| format!("failed to get operation details: {}", err))?;
        builder
            .build(&details, &operation.server_url)
            .map_err(|err| format!("failed to build request: {}", err))?;
        Ok(details)
    }

    fn fail(
        &self,
        operation: &Operation,
        error: String,
        index: usize,
        total: usize,
    ) -> BenchmarkResult {
        warn!("Skipping {} {}: {}", operation.method, operation.path, error);
        let result = BenchmarkResult::failed(
            operation,
            self.config.iterations,
            self.config.concurrency,
            self.config.warmup_runs,
            error,
        );
        let mut completed = BenchmarkEvent::new(
            BenchmarkEventKind::BenchmarkCompleted,
            operation,
            index,
            total,
        );
        completed.result = Some(&result);
        self.emit(&completed);
        result
    }

    /// Sequential unmeasured requests. Returns `false` if cancelled.
    async fn warm_up(
        &self,
        operation: &Operation,
        details: &OperationDetails,
        builder: &mut RequestBuilder,
        index: usize,
        total: usize,
    ) -> bool {
        let runs = self.config.warmup_runs;
        if runs == 0 {
            return true;
        }
        let mut starting =
            BenchmarkEvent::new(BenchmarkEventKind::WarmupStarting, operation, index, total);
        starting.max_iterations = runs;
        self.emit(&starting);

        let report_every = (runs / WARMUP_PROGRESS_STEPS).max(1);
        for run in 1..=runs {
            if self.shutdown.is_cancelled() {
                return false;
            }
            if let Ok(request) = builder.build(details, &operation.server_url) {
                drop(send(&self.client, request, self.config.timeout, &self.shutdown).await);
            }
            if run.checked_rem(report_every) == Some(0) {
                let mut progress = BenchmarkEvent::new(
                    BenchmarkEventKind::WarmupProgress,
                    operation,
                    index,
                    total,
                );
                progress.progress = run;
                progress.max_iterations = runs;
                self.emit(&progress);
            }
        }

        self.emit(&BenchmarkEvent::new(
            BenchmarkEventKind::WarmupCompleted,
            operation,
            index,
            total,
        ));
        true
    }
}
