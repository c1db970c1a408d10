use std::borrow::Cow;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

use crate::args::OutputFormat;
use crate::error::{AppError, AppResult, SinkError};
use crate::models::{BenchmarkSummary, TestSummary};

const TEST_CSV_HEADER: &str = "method,path,operation_id,passed,status_code,response_time_ms,error";
const BENCHMARK_CSV_HEADER: &str = "method,path,operation_id,iterations,concurrency,min_ms,max_ms,avg_ms,p50_ms,p90_ms,p99_ms,requests_per_sec,success_count,error_count,error_rate";

/// Writes `summary` as `format` to `path`, or to stdout when `path` is `None`.
pub(crate) async fn export_test_summary(
    summary: &TestSummary,
    format: OutputFormat,
    path: Option<&str>,
) -> AppResult<()> {
    let content = match format {
        OutputFormat::Json => to_json(summary)?,
        OutputFormat::Csv => test_csv(summary),
    };
    write_output(&content, path).await
}

/// Writes `summary` as `format` to `path`, or to stdout when `path` is `None`.
pub(crate) async fn export_benchmark_summary(
    summary: &BenchmarkSummary,
    format: OutputFormat,
    path: Option<&str>,
) -> AppResult<()> {
    let content = match format {
        OutputFormat::Json => to_json(summary)?,
        OutputFormat::Csv => benchmark_csv(summary),
    };
    write_output(&content, path).await
}

fn to_json<T: Serialize>(value: &T) -> AppResult<String> {
    let mut json = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::sink(SinkError::Serialize { source: err }))?;
    json.push('\n');
    Ok(json)
}

pub(crate) fn test_csv(summary: &TestSummary) -> String {
    let mut out = String::from(TEST_CSV_HEADER);
    out.push('\n');
    for result in &summary.results {
        let status = result.status_code.to_string();
        let response_time = millis(result.response_time);
        push_row(
            &mut out,
            &[
                result.method.as_str(),
                &result.path,
                &result.operation_id,
                if result.passed { "true" } else { "false" },
                &status,
                &response_time,
                &result.error,
            ],
        );
    }
    out
}

pub(crate) fn benchmark_csv(summary: &BenchmarkSummary) -> String {
    let mut out = String::from(BENCHMARK_CSV_HEADER);
    out.push('\n');
    for result in &summary.results {
        let cells = [
            result.iterations.to_string(),
            result.concurrency.to_string(),
            millis(result.min_time),
            millis(result.max_time),
            millis(result.avg_time),
            millis(result.p50_time),
            millis(result.p90_time),
            millis(result.p99_time),
            format!("{:.2}", result.requests_per_sec),
            result.success_count.to_string(),
            result.error_count.to_string(),
            format!("{:.2}", result.error_rate),
        ];
        let mut row: Vec<&str> = vec![result.method.as_str(), &result.path, &result.operation_id];
        row.extend(cells.iter().map(String::as_str));
        push_row(&mut out, &row);
    }
    out
}

/// Milliseconds with two decimals.
fn millis(value: Duration) -> String {
    format!("{:.2}", value.as_secs_f64() * 1000.0)
}

fn push_row(out: &mut String, cells: &[&str]) {
    for (position, cell) in cells.iter().enumerate() {
        if position > 0 {
            out.push(',');
        }
        out.push_str(&csv_field(cell));
    }
    out.push('\n');
}

/// Quotes a cell containing a separator, quote or line break.
fn csv_field(cell: &str) -> Cow<'_, str> {
    if cell.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", cell.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(cell)
    }
}

async fn write_output(content: &str, path: Option<&str>) -> AppResult<()> {
    match path {
        Some(path) => {
            let file = tokio::fs::File::create(path).await.map_err(|err| {
                AppError::sink(SinkError::CreateFile {
                    path: PathBuf::from(path),
                    source: err,
                })
            })?;
            write_all(BufWriter::new(file), content).await
        }
        None => write_all(tokio::io::stdout(), content).await,
    }
}

async fn write_all<W: AsyncWrite + Unpin>(mut writer: W, content: &str) -> AppResult<()> {
    writer
        .write_all(content.as_bytes())
        .await
        .map_err(|err| AppError::sink(SinkError::Write { source: err }))?;
    writer
        .flush()
        .await
        .map_err(|err| AppError::sink(SinkError::Write { source: err }))
}
