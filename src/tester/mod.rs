//! One request per operation, classified pass or fail.

use std::time::{Duration, Instant};

use reqwest::Client;
use tracing::debug;

use crate::error::AppResult;
use crate::generator::Generator;
use crate::http::{ClientSettings, RequestBuilder, build_client, send};
use crate::models::{TestResult, TestSummary};
use crate::openapi::{Operation, OperationProvider};
use crate::shutdown::Shutdown;
use crate::validate::ResponseValidator;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
pub struct TesterConfig {
    pub timeout: Duration,
    pub seed: Option<u64>,
}

impl Default for TesterConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestEventKind {
    Starting,
    Completed,
}

/// Progress notification; `result` is set for `Completed` only.
#[derive(Debug, Clone, Copy)]
pub struct TestEvent<'run> {
    pub kind: TestEventKind,
    pub operation: &'run Operation,
    pub result: Option<&'run TestResult>,
    pub index: usize,
    pub total: usize,
}

pub struct Tester {
    builder: RequestBuilder,
    validator: ResponseValidator,
    client: Client,
    timeout: Duration,
    shutdown: Shutdown,
}

impl Tester {
    /// Creates a tester with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be built.
    pub fn new(config: &TesterConfig) -> AppResult<Self> {
        let timeout = if config.timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            config.timeout
        };
        let client = build_client(&ClientSettings::new(timeout))?;
        Ok(Self {
            builder: RequestBuilder::new(Generator::with_seed(config.seed)),
            validator: ResponseValidator::new(),
            client,
            timeout,
            shutdown: Shutdown::new(),
        })
    }

    #[must_use]
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Tests one operation. Failures are reported in the result, never
    /// returned as errors.
    pub async fn test_one(
        &mut self,
        operation: &Operation,
        provider: &dyn OperationProvider,
    ) -> TestResult {
        let mut result = TestResult::pending(operation);

        let details = match provider.operation_details(&operation.path, operation.method) {
            Ok(details) => details,
            Err(err) => {
                result.error = format!("failed to get operation details: {}", err);
                return result;
            }
        };

        let request = match self.builder.build(&details, &operation.server_url) {
            Ok(request) => request,
            Err(err) => {
                result.error = format!("failed to build request: {}", err);
                return result;
            }
        };

        let started = Instant::now();
        let outcome = send(&self.client, request, self.timeout, &self.shutdown).await;
        result.response_time = started.elapsed();
        let response = match outcome {
            Ok(response) => response,
            Err(err) => {
                result.error = err.to_string();
                return result;
            }
        };
        result.status_code = response.status;

        result.validation_errors = self.validator.validate(Some(&response), Some(&details));
        if result.validation_errors.is_empty() {
            result.passed = true;
        } else {
            let messages: Vec<String> = result
                .validation_errors
                .iter()
                .map(ToString::to_string)
                .collect();
            result.error = format!("validation failed: {}", messages.join("; "));
        }
        result
    }

    /// Tests `operations` in order. Stops early when the run is cancelled
    /// and returns what was collected.
    pub async fn test_many<F>(
        &mut self,
        operations: &[Operation],
        provider: &dyn OperationProvider,
        mut on_event: F,
    ) -> TestSummary
    where
        F: FnMut(&TestEvent<'_>),
    {
        let mut summary = TestSummary::default();
        let total = operations.len();
        for (index, operation) in operations.iter().enumerate() {
            if self.shutdown.is_cancelled() {
                debug!("Test run cancelled after {} of {} operations", index, total);
                break;
            }
            on_event(&TestEvent {
                kind: TestEventKind::Starting,
                operation,
                result: None,
                index,
                total,
            });

            let result = self.test_one(operation, provider).await;
            on_event(&TestEvent {
                kind: TestEventKind::Completed,
                operation,
                result: Some(&result),
                index,
                total,
            });
            summary.add_result(result);
        }
        summary
    }
}
