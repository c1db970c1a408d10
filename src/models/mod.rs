//! Result data handed to the console renderer and the exporters.
mod benchmark;
mod testing;


pub use benchmark::{BenchmarkResult, BenchmarkSummary, MAX_SAMPLE_ERRORS};
pub use testing::{TestResult, TestSummary, ValidationError};

/// Serializes a `Duration` as integer nanoseconds.
pub(crate) fn duration_ns<S>(value: &std::time::Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u64(u64::try_from(value.as_nanos()).unwrap_or(u64::MAX))
}
