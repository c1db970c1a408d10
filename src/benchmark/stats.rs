use std::time::Duration;

use crate::models::BenchmarkResult;

/// Outcome of one measured attempt. `error` is empty on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RequestResult {
    pub duration: Duration,
    pub status: u16,
    pub error: String,
}

impl RequestResult {
    pub(crate) fn failure(duration: Duration, error: String) -> Self {
        Self {
            duration,
            status: 0,
            error,
        }
    }

    pub(crate) fn is_success(&self) -> bool {
        self.error.is_empty()
    }
}

/// `p`-th percentile of ascending `sorted`, interpolating linearly between
/// the two ranked samples around index `(n - 1) * p / 100`.
#[must_use]
pub fn percentile(sorted: &[Duration], p: u32) -> Duration {
    let (Some(first), Some(last)) = (sorted.first(), sorted.last()) else {
        return Duration::ZERO;
    };
    if p == 0 {
        return *first;
    }
    if p >= 100 {
        return *last;
    }

    let rank = u128::try_from(sorted.len().saturating_sub(1))
        .unwrap_or(u128::MAX)
        .saturating_mul(u128::from(p));
    let lower_index = usize::try_from(rank.checked_div(100).unwrap_or(0)).unwrap_or(usize::MAX);
    let weight = rank.checked_rem(100).unwrap_or(0);
    let Some(lower) = sorted.get(lower_index) else {
        return *last;
    };
    let Some(upper) = sorted.get(lower_index.saturating_add(1)) else {
        return *lower;
    };

    let lower_ns = lower.as_nanos();
    let span = upper.as_nanos().saturating_sub(lower_ns);
    let interpolated =
        lower_ns.saturating_add(span.saturating_mul(weight).checked_div(100).unwrap_or(0));
    Duration::from_nanos(u64::try_from(interpolated).unwrap_or(u64::MAX))
}

/// Fills latency, throughput, error and status statistics of `result`
/// from the attempts of its measuring phase.
pub(crate) fn summarize(
    result: &mut BenchmarkResult,
    samples: &[RequestResult],
    elapsed: Duration,
) {
    let mut durations = Vec::with_capacity(samples.len());
    let mut total = Duration::ZERO;
    for sample in samples {
        if sample.is_success() {
            result.success_count = result.success_count.saturating_add(1);
            durations.push(sample.duration);
            total = total.saturating_add(sample.duration);
        } else {
            result.error_count = result.error_count.saturating_add(1);
            result.sample_error(&sample.error);
        }
        if sample.status > 0 {
            let count = result.status_codes.entry(sample.status).or_insert(0);
            *count = count.saturating_add(1);
        }
    }

    durations.sort_unstable();
    if let (Some(min), Some(max)) = (durations.first(), durations.last()) {
        result.min_time = *min;
        result.max_time = *max;
        result.avg_time = total
            .checked_div(u32::try_from(durations.len()).unwrap_or(u32::MAX))
            .unwrap_or_default();
        result.p50_time = percentile(&durations, 50);
        result.p90_time = percentile(&durations, 90);
        result.p99_time = percentile(&durations, 99);
    }

    result.total_duration = elapsed;
    if !elapsed.is_zero() {
        result.requests_per_sec = result.iterations as f64 / elapsed.as_secs_f64();
    }
    if result.iterations > 0 {
        result.error_rate = result.error_count as f64 / result.iterations as f64 * 100.0;
    }
}
