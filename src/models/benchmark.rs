use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use crate::openapi::{HttpMethod, Operation};

use super::duration_ns;

/// Distinct error messages kept per operation.
pub const MAX_SAMPLE_ERRORS: usize = 5;

/// Statistics for one benchmarked operation.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkResult {
    pub path: String,
    pub method: HttpMethod,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub operation_id: String,

    pub iterations: usize,
    pub concurrency: usize,
    pub warmup_runs: usize,

    #[serde(rename = "min_time_ns", serialize_with = "duration_ns")]
    pub min_time: Duration,
    #[serde(rename = "max_time_ns", serialize_with = "duration_ns")]
    pub max_time: Duration,
    #[serde(rename = "avg_time_ns", serialize_with = "duration_ns")]
    pub avg_time: Duration,
    #[serde(rename = "p50_time_ns", serialize_with = "duration_ns")]
    pub p50_time: Duration,
    #[serde(rename = "p90_time_ns", serialize_with = "duration_ns")]
    pub p90_time: Duration,
    #[serde(rename = "p99_time_ns", serialize_with = "duration_ns")]
    pub p99_time: Duration,

    pub requests_per_sec: f64,
    #[serde(rename = "total_duration_ns", serialize_with = "duration_ns")]
    pub total_duration: Duration,

    pub success_count: usize,
    pub error_count: usize,
    pub error_rate: f64,

    pub status_codes: BTreeMap<u16, usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sample_errors: Vec<String>,

    /// Set when the run was cancelled while this operation was measuring;
    /// `iterations` then counts only the attempts that finished.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub cancelled: bool,
}

impl BenchmarkResult {
    /// Empty statistics for `operation`.
    #[must_use]
    pub fn new(
        operation: &Operation,
        iterations: usize,
        concurrency: usize,
        warmup_runs: usize,
    ) -> Self {
        Self {
            path: operation.path.clone(),
            method: operation.method,
            operation_id: operation.operation_id.clone(),
            iterations,
            concurrency,
            warmup_runs,
            min_time: Duration::ZERO,
            max_time: Duration::ZERO,
            avg_time: Duration::ZERO,
            p50_time: Duration::ZERO,
            p90_time: Duration::ZERO,
            p99_time: Duration::ZERO,
            requests_per_sec: 0.0,
            total_duration: Duration::ZERO,
            success_count: 0,
            error_count: 0,
            error_rate: 0.0,
            status_codes: BTreeMap::new(),
            sample_errors: Vec::new(),
            cancelled: false,
        }
    }

    /// An operation that failed before any request was sent: every
    /// iteration counts as an error.
    #[must_use]
    pub fn failed(
        operation: &Operation,
        iterations: usize,
        concurrency: usize,
        warmup_runs: usize,
        error: String,
    ) -> Self {
        let mut result = Self::new(operation, iterations, concurrency, warmup_runs);
        result.error_count = iterations;
        result.error_rate = 100.0;
        result.sample_errors.push(error);
        result
    }

    /// Records an error message unless it was seen or the sample is full.
    pub fn sample_error(&mut self, error: &str) {
        if self.sample_errors.len() < MAX_SAMPLE_ERRORS
            && !self.sample_errors.iter().any(|seen| seen == error)
        {
            self.sample_errors.push(error.to_owned());
        }
    }
}

/// Aggregate over every benchmarked operation of one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BenchmarkSummary {
    pub total_endpoints: usize,
    #[serde(rename = "iterations_per_endpoint")]
    pub iterations: usize,
    pub concurrency: usize,
    pub warmup_runs: usize,

    #[serde(rename = "overall_min_time_ns", serialize_with = "duration_ns")]
    pub overall_min_time: Duration,
    #[serde(rename = "overall_max_time_ns", serialize_with = "duration_ns")]
    pub overall_max_time: Duration,
    #[serde(rename = "overall_avg_time_ns", serialize_with = "duration_ns")]
    pub overall_avg_time: Duration,

    pub total_requests: usize,
    pub total_successes: usize,
    pub total_errors: usize,
    pub overall_error_rate: f64,
    #[serde(rename = "total_duration_ns", serialize_with = "duration_ns")]
    pub total_duration: Duration,
    #[serde(rename = "overall_requests_per_sec")]
    pub overall_reqs_per_sec: f64,

    pub results: Vec<BenchmarkResult>,
}

impl BenchmarkSummary {
    #[must_use]
    pub fn new(iterations: usize, concurrency: usize, warmup_runs: usize) -> Self {
        Self {
            iterations,
            concurrency,
            warmup_runs,
            ..Self::default()
        }
    }

    /// Appends one operation's result and refreshes the running totals.
    pub fn add_result(&mut self, result: BenchmarkResult) {
        self.total_requests = self.total_requests.saturating_add(result.iterations);
        self.total_successes = self.total_successes.saturating_add(result.success_count);
        self.total_errors = self.total_errors.saturating_add(result.error_count);

        // Operations without a successful request have no latency figures.
        if result.success_count > 0 {
            if self.overall_min_time.is_zero() || result.min_time < self.overall_min_time {
                self.overall_min_time = result.min_time;
            }
            if result.max_time > self.overall_max_time {
                self.overall_max_time = result.max_time;
            }
        }

        self.results.push(result);
        self.total_endpoints = self.results.len();

        if self.total_requests > 0 {
            self.overall_error_rate =
                self.total_errors as f64 / self.total_requests as f64 * 100.0;
        }
        self.overall_avg_time = weighted_average(&self.results);
    }

    /// Sets the run's wall-clock duration and overall throughput.
    pub fn finalize(&mut self, total_duration: Duration) {
        self.total_duration = total_duration;
        if !total_duration.is_zero() {
            self.overall_reqs_per_sec = self.total_requests as f64 / total_duration.as_secs_f64();
        }
    }
}

/// Average latency weighted by each operation's iteration count.
fn weighted_average(results: &[BenchmarkResult]) -> Duration {
    let mut weighted_nanos: u128 = 0;
    let mut weight: u128 = 0;
    for result in results {
        let iterations = result.iterations as u128;
        weighted_nanos = weighted_nanos
            .saturating_add(result.avg_time.as_nanos().saturating_mul(iterations));
        weight = weight.saturating_add(iterations);
    }
    let average = weighted_nanos.checked_div(weight).unwrap_or(0);
    Duration::from_nanos(u64::try_from(average).unwrap_or(u64::MAX))
}
