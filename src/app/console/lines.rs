use std::time::Duration;

use crossterm::style::{Color, Stylize, style};

use crate::benchmark::{BenchmarkConfig, BenchmarkEvent};
use crate::models::{BenchmarkResult, BenchmarkSummary, TestResult, TestSummary};
use crate::openapi::Operation;

/// Results listed in the per-endpoint table unless verbose.
const TABLE_LIMIT: usize = 10;
const TABLE_PATH_WIDTH: usize = 38;
/// Error rate (percent) below which an endpoint is shown as degraded rather
/// than failing.
const DEGRADED_ERROR_RATE: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Segment {
    pub text: String,
    pub color: Option<Color>,
    pub bold: bool,
}

impl Segment {
    pub(crate) fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: None,
            bold: false,
        }
    }

    pub(crate) fn colored(text: impl Into<String>, color: Color) -> Self {
        Self {
            text: text.into(),
            color: Some(color),
            bold: false,
        }
    }

    pub(crate) fn strong(text: impl Into<String>, color: Option<Color>) -> Self {
        Self {
            text: text.into(),
            color,
            bold: true,
        }
    }
}

pub(crate) type Line = Vec<Segment>;

pub(crate) fn render(line: &[Segment], color: bool) -> String {
    let mut rendered = String::new();
    for segment in line {
        if !color || (segment.color.is_none() && !segment.bold) {
            rendered.push_str(&segment.text);
            continue;
        }
        let mut styled = style(segment.text.as_str());
        if let Some(tint) = segment.color {
            styled = styled.with(tint);
        }
        if segment.bold {
            styled = styled.bold();
        }
        rendered.push_str(&styled.to_string());
    }
    rendered
}

pub(crate) fn ms(value: Duration) -> String {
    format!("{:.2}ms", value.as_secs_f64() * 1000.0)
}

fn position(index: usize, total: usize) -> String {
    format!("[{}/{}]", index.saturating_add(1), total)
}

fn endpoint(operation: &Operation) -> String {
    format!("{} {}", operation.method, operation.path)
}

fn heading(text: &str) -> Line {
    vec![Segment::strong(text, Some(Color::White))]
}

pub(crate) fn test_running(operation: &Operation, index: usize, total: usize) -> Line {
    vec![Segment::plain(format!(
        "{} Running {}...",
        position(index, total),
        endpoint(operation)
    ))]
}

pub(crate) fn test_completed(
    result: &TestResult,
    index: usize,
    total: usize,
    verbose: bool,
) -> Vec<Line> {
    let verdict = if result.passed {
        Segment::strong("✓ PASS", Some(Color::Green))
    } else {
        Segment::strong("✗ FAIL", Some(Color::Red))
    };
    let mut lines = vec![vec![
        Segment::plain(format!("{} ", position(index, total))),
        verdict,
        Segment::plain(format!(" {} {}", result.method, result.path)),
    ]];
    if !verbose {
        return lines;
    }

    if !result.operation_id.is_empty() {
        lines.push(vec![Segment::plain(format!("    Operation ID: {}", result.operation_id))]);
    }
    lines.push(vec![Segment::plain(format!("    Status Code: {}", result.status_code))]);
    lines.push(vec![Segment::plain(format!("    Response Time: {}", ms(result.response_time)))]);
    if result.passed {
        return lines;
    }
    if !result.error.is_empty() {
        lines.push(vec![
            Segment::plain("    Error: "),
            Segment::colored(result.error.clone(), Color::Red),
        ]);
    }
    if !result.validation_errors.is_empty() {
        lines.push(vec![Segment::plain("    Validation Errors:")]);
        for error in &result.validation_errors {
            lines.push(vec![
                Segment::plain(format!("      - {}: ", error.field)),
                Segment::colored(error.message.clone(), Color::Red),
            ]);
        }
    }
    lines
}

pub(crate) fn test_summary(summary: &TestSummary) -> Vec<Line> {
    vec![
        Vec::new(),
        heading("=== Test Summary ==="),
        vec![Segment::plain(format!("Total Tests: {}", summary.total_tests))],
        vec![
            Segment::plain("Passed: "),
            Segment::strong(summary.passed.to_string(), Some(Color::Green)),
        ],
        vec![
            Segment::plain("Failed: "),
            Segment::strong(summary.failed.to_string(), Some(Color::Red)),
        ],
    ]
}

pub(crate) fn benchmark_configuration(config: &BenchmarkConfig, endpoints: usize) -> Vec<Line> {
    let mut lines = vec![
        Vec::new(),
        heading("=== Benchmark Configuration ==="),
        vec![Segment::plain(format!("Endpoints:   {}", endpoints))],
        vec![Segment::plain(format!("Iterations:  {} per endpoint", config.iterations))],
        vec![Segment::plain(format!("Concurrency: {}", config.concurrency))],
        vec![Segment::plain(format!("Warmup:      {} iterations", config.warmup_runs))],
    ];
    if config.rate_limit > 0.0 {
        lines.push(vec![Segment::plain(format!("Rate Limit:  {} req/sec", config.rate_limit))]);
    }
    lines.push(vec![Segment::plain(format!("Timeout:     {:?}", config.timeout))]);
    lines.push(vec![Segment::plain(format!("Keep-Alive:  {}", config.keep_alive))]);
    lines.push(Vec::new());
    lines
}

pub(crate) fn warmup_status(event: &BenchmarkEvent<'_>) -> Line {
    vec![Segment::plain(format!(
        "{} {} - Warmup {}/{}",
        position(event.index, event.total),
        endpoint(event.operation),
        event.progress,
        event.max_iterations
    ))]
}

pub(crate) fn warmup_starting(event: &BenchmarkEvent<'_>) -> Line {
    vec![Segment::plain(format!(
        "{} {} - Warming up ({} iterations)...",
        position(event.index, event.total),
        endpoint(event.operation),
        event.max_iterations
    ))]
}

pub(crate) fn warmup_completed(event: &BenchmarkEvent<'_>, elapsed: Duration) -> Line {
    vec![
        Segment::plain(format!("{} ", position(event.index, event.total))),
        Segment::colored("●", Color::Yellow),
        Segment::plain(format!(" Warmup completed in {}", ms(elapsed))),
    ]
}

pub(crate) fn benchmark_starting(event: &BenchmarkEvent<'_>) -> Line {
    vec![Segment::plain(format!(
        "{} {} - Running benchmark ({} iterations)...",
        position(event.index, event.total),
        endpoint(event.operation),
        event.max_iterations
    ))]
}

pub(crate) fn benchmark_status(event: &BenchmarkEvent<'_>) -> Line {
    vec![Segment::plain(format!(
        "{} {} - {}/{} (avg: {:.1}ms, {:.1} req/s, {} errors)",
        position(event.index, event.total),
        endpoint(event.operation),
        event.progress,
        event.max_iterations,
        event.running_avg.as_secs_f64() * 1000.0,
        event.running_reqs_per_sec,
        event.error_count
    ))]
}

pub(crate) fn benchmark_completed(
    result: &BenchmarkResult,
    index: usize,
    total: usize,
    elapsed: Duration,
    verbose: bool,
) -> Vec<Line> {
    let verdict = if result.error_rate <= 0.0 {
        Segment::colored("✓", Color::Green)
    } else if result.error_rate < DEGRADED_ERROR_RATE {
        Segment::colored("●", Color::Yellow)
    } else {
        Segment::colored("✗", Color::Red)
    };
    let mut headline = vec![
        Segment::plain(format!("{} ", position(index, total))),
        verdict,
        Segment::plain(format!(" {} {}", result.method, result.path)),
    ];
    if result.cancelled {
        headline.push(Segment::colored(" (cancelled)", Color::Yellow));
    }

    let mut lines = vec![
        headline,
        vec![
            Segment::plain("    "),
            Segment::strong("→", Some(Color::Cyan)),
            Segment::plain(format!(
                " avg: {} | p99: {} | {:.1} req/s | errors: {} ({:.1}%)",
                ms(result.avg_time),
                ms(result.p99_time),
                result.requests_per_sec,
                result.error_count,
                result.error_rate
            )),
        ],
    ];
    if !verbose {
        return lines;
    }

    lines.push(vec![Segment::plain(format!(
        "    Latency:  min={} | p50={} | p90={} | max={}",
        ms(result.min_time),
        ms(result.p50_time),
        ms(result.p90_time),
        ms(result.max_time)
    ))]);
    lines.push(vec![Segment::plain(format!(
        "    Duration: {} | Success: {} | Errors: {}",
        ms(elapsed),
        result.success_count,
        result.error_count
    ))]);
    if !result.status_codes.is_empty() {
        let codes: Vec<String> = result
            .status_codes
            .iter()
            .map(|(code, count)| format!("{}:{}", code, count))
            .collect();
        lines.push(vec![Segment::plain(format!("    Status codes: {}", codes.join(", ")))]);
    }
    if !result.sample_errors.is_empty() {
        lines.push(vec![Segment::plain("    Sample errors:")]);
        for error in &result.sample_errors {
            lines.push(vec![
                Segment::plain("      - "),
                Segment::colored(error.clone(), Color::Red),
            ]);
        }
    }
    lines
}

pub(crate) fn benchmark_summary(summary: &BenchmarkSummary, verbose: bool) -> Vec<Line> {
    let mut lines = vec![
        Vec::new(),
        heading("=== Benchmark Summary ==="),
        vec![Segment::plain(format!("Total Endpoints:    {}", summary.total_endpoints))],
        vec![Segment::plain(format!("Total Requests:     {}", summary.total_requests))],
        vec![Segment::plain(format!(
            "Total Duration:     {:.2}s",
            summary.total_duration.as_secs_f64()
        ))],
        vec![
            Segment::plain("Overall Throughput: "),
            Segment::strong(format!("{:.1} req/sec", summary.overall_reqs_per_sec), Some(Color::Cyan)),
        ],
        Vec::new(),
        heading("Latency Overview:"),
        vec![Segment::plain(format!("  Min: {}", ms(summary.overall_min_time)))],
        vec![Segment::plain(format!("  Avg: {}", ms(summary.overall_avg_time)))],
        vec![Segment::plain(format!("  Max: {}", ms(summary.overall_max_time)))],
        Vec::new(),
    ];

    if summary.total_errors > 0 {
        lines.push(heading("Error Summary:"));
        lines.push(vec![
            Segment::plain("  Total Errors: "),
            Segment::strong(summary.total_errors.to_string(), Some(Color::Red)),
        ]);
        lines.push(vec![
            Segment::plain("  Error Rate:   "),
            Segment::strong(format!("{:.2}%", summary.overall_error_rate), Some(Color::Red)),
        ]);
    } else {
        lines.push(vec![
            Segment::plain("Errors: "),
            Segment::strong("0", Some(Color::Green)),
        ]);
    }
    lines.push(Vec::new());

    if verbose || summary.results.len() <= TABLE_LIMIT {
        lines.push(heading("Per-Endpoint Results:"));
        lines.push(vec![Segment::plain(format!(
            "{:<8} {:<40} {:>10} {:>10} {:>10} {:>10}",
            "METHOD", "PATH", "AVG(ms)", "P99(ms)", "REQ/S", "ERR%"
        ))]);
        lines.push(vec![Segment::plain("-".repeat(90))]);
        for result in &summary.results {
            lines.push(vec![Segment::plain(format!(
                "{:<8} {:<40} {:>10.2} {:>10.2} {:>10.1} {:>10.1}",
                result.method.as_str(),
                truncate_path(&result.path),
                result.avg_time.as_secs_f64() * 1000.0,
                result.p99_time.as_secs_f64() * 1000.0,
                result.requests_per_sec,
                result.error_rate
            ))]);
        }
    }
    lines
}

fn truncate_path(path: &str) -> String {
    if path.chars().count() <= TABLE_PATH_WIDTH {
        return path.to_owned();
    }
    let kept: String = path
        .chars()
        .take(TABLE_PATH_WIDTH.saturating_sub(3))
        .collect();
    format!("{}...", kept)
}
