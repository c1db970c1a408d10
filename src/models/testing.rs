use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::openapi::{HttpMethod, Operation};

/// One way a response departs from its declared definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    pub path: String,
    pub method: HttpMethod,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub operation_id: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
    /// Zero when no response was received.
    pub status_code: u16,
    #[serde(rename = "response_time_ns", serialize_with = "super::duration_ns")]
    pub response_time: Duration,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub validation_errors: Vec<ValidationError>,
}

impl TestResult {
    /// A not-yet-passed result for `operation`.
    #[must_use]
    pub fn pending(operation: &Operation) -> Self {
        Self {
            path: operation.path.clone(),
            method: operation.method,
            operation_id: operation.operation_id.clone(),
            passed: false,
            error: String::new(),
            status_code: 0,
            response_time: Duration::ZERO,
            validation_errors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TestSummary {
    pub total_tests: usize,
    pub passed: usize,
    pub failed: usize,
    pub results: Vec<TestResult>,
}

impl TestSummary {
    pub fn add_result(&mut self, result: TestResult) {
        self.total_tests = self.total_tests.saturating_add(1);
        if result.passed {
            self.passed = self.passed.saturating_add(1);
        } else {
            self.failed = self.failed.saturating_add(1);
        }
        self.results.push(result);
    }

    #[must_use]
    pub const fn all_passed(&self) -> bool {
        self.failed == 0
    }
}
