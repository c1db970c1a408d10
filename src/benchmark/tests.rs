use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::json;

use super::stats::{RequestResult, summarize};
use super::*;
use crate::http::test_support::{MockResponse, spawn_mock_server};
use crate::openapi::{ApiDocument, HttpMethod, OperationProvider};

fn run_async_test<F>(future: F) -> Result<(), String>
where
    F: Future<Output = Result<(), String>>,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .map_err(|err| format!("Failed to build runtime: {}", err))?;
    runtime.block_on(future)
}

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

fn document() -> Result<ApiDocument, String> {
    ApiDocument::from_value(&json!({
        "openapi": "3.0.0",
        "info": { "title": "bench", "version": "1" },
        "paths": {
            "/ping": {
                "get": {
                    "operationId": "ping",
                    "responses": { "200": { "description": "ok" } }
                },
                "post": {
                    "operationId": "broken",
                    "requestBody": {
                        "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Missing" } } }
                    },
                    "responses": { "201": { "description": "created" } }
                }
            }
        }
    }))
    .map_err(|err| err.to_string())
}

fn operation(document: &ApiDocument, server: &str, method: HttpMethod) -> Result<Operation, String> {
    document
        .operations(server)
        .into_iter()
        .find(|operation| operation.method == method)
        .ok_or_else(|| format!("Missing {} operation", method))
}

fn config(iterations: usize, concurrency: usize, warmup_runs: usize) -> BenchmarkConfig {
    BenchmarkConfig {
        iterations,
        concurrency,
        warmup_runs,
        timeout: Duration::from_secs(5),
        seed: Some(3),
        ..BenchmarkConfig::default()
    }
}

fn recording_handler() -> (EventHandler, Arc<Mutex<Vec<BenchmarkEventKind>>>) {
    let kinds = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&kinds);
    let handler: EventHandler = Arc::new(move |event: &BenchmarkEvent<'_>| {
        if let Ok(mut seen) = sink.lock() {
            seen.push(event.kind);
        }
    });
    (handler, kinds)
}

#[test]
fn percentile_of_empty_is_zero() {
    assert_eq!(percentile(&[], 50), Duration::ZERO);
}

#[test]
fn percentile_interpolates_between_ranks() -> Result<(), String> {
    let sorted = [ms(10), ms(20), ms(30), ms(40)];
    let checks = [(0, ms(10)), (50, ms(25)), (100, ms(40))];
    for (p, expected) in checks {
        let actual = percentile(&sorted, p);
        if actual != expected {
            return Err(format!("p{} = {:?}, expected {:?}", p, actual, expected));
        }
    }
    Ok(())
}

#[test]
fn percentile_is_bounded_and_monotonic() -> Result<(), String> {
    let sorted = [ms(1), ms(2), ms(2), ms(7), ms(9), ms(30), ms(31)];
    let mut previous = Duration::ZERO;
    for p in 0..=100 {
        let value = percentile(&sorted, p);
        if value < previous || value < ms(1) || value > ms(31) {
            return Err(format!("p{} = {:?} breaks ordering after {:?}", p, value, previous));
        }
        previous = value;
    }
    Ok(())
}

#[test]
fn percentile_of_single_sample() {
    assert_eq!(percentile(&[ms(5)], 99), ms(5));
}

#[test]
fn summary_ignores_failed_attempts_for_latency() -> Result<(), String> {
    let operation = Operation {
        path: "/ping".to_owned(),
        method: HttpMethod::Get,
        operation_id: String::new(),
        tags: Vec::new(),
        server_url: "http://localhost".to_owned(),
    };
    let mut result = BenchmarkResult::new(&operation, 4, 1, 0);
    let ok = |millis, status| RequestResult {
        duration: ms(millis),
        status,
        error: String::new(),
    };
    let samples = [
        ok(10, 200),
        ok(30, 503),
        RequestResult::failure(ms(1), "request timed out after 1ms".to_owned()),
        RequestResult::failure(ms(2), "request timed out after 1ms".to_owned()),
    ];
    summarize(&mut result, &samples, Duration::from_secs(2));

    if result.success_count != 2 || result.error_count != 2 {
        return Err(format!("Unexpected counts: {:?}", result));
    }
    if result.min_time != ms(10) || result.max_time != ms(30) || result.avg_time != ms(20) {
        return Err(format!("Unexpected latency: {:?}", result));
    }
    if (result.error_rate - 50.0).abs() > f64::EPSILON
        || (result.requests_per_sec - 2.0).abs() > f64::EPSILON
    {
        return Err(format!("Unexpected rates: {:?}", result));
    }
    if result.status_codes.get(&503) != Some(&1) || result.status_codes.len() != 2 {
        return Err(format!("Unexpected status codes: {:?}", result.status_codes));
    }
    if result.sample_errors != ["request timed out after 1ms"] {
        return Err(format!("Unexpected sample errors: {:?}", result.sample_errors));
    }
    Ok(())
}

#[test]
fn healthy_endpoint_reports_no_errors() -> Result<(), String> {
    run_async_test(async {
        let server = spawn_mock_server(MockResponse::json(200, "{}"))?;
        let document = document()?;
        let operation = operation(&document, &server.url, HttpMethod::Get)?;
        let benchmarker =
            Benchmarker::new(config(10, 2, 2), Shutdown::new()).map_err(|err| err.to_string())?;

        let result = benchmarker
            .benchmark_operation(&operation, &document, 0, 1)
            .await
            .ok_or("Benchmark returned no result")?;
        if result.success_count != 10 || result.error_count != 0 || result.error_rate > 0.0 {
            return Err(format!("Unexpected counts: {:?}", result));
        }
        if result.status_codes.len() != 1 || result.status_codes.get(&200) != Some(&10) {
            return Err(format!("Unexpected status codes: {:?}", result.status_codes));
        }
        if result.min_time > result.p50_time
            || result.p50_time > result.p90_time
            || result.p90_time > result.p99_time
            || result.p99_time > result.max_time
        {
            return Err(format!("Percentiles out of order: {:?}", result));
        }
        if result.cancelled || result.requests_per_sec <= 0.0 {
            return Err(format!("Unexpected result: {:?}", result));
        }
        if server.hits() != 12 {
            return Err(format!("Expected 12 requests including warm-up, got {}", server.hits()));
        }
        Ok(())
    })
}

#[test]
fn server_errors_are_not_transport_errors() -> Result<(), String> {
    run_async_test(async {
        let server = spawn_mock_server(MockResponse::json(503, "{}"))?;
        let document = document()?;
        let operation = operation(&document, &server.url, HttpMethod::Get)?;
        let benchmarker =
            Benchmarker::new(config(4, 1, 0), Shutdown::new()).map_err(|err| err.to_string())?;

        let result = benchmarker
            .benchmark_operation(&operation, &document, 0, 1)
            .await
            .ok_or("Benchmark returned no result")?;
        if result.success_count != 4 || result.status_codes.get(&503) != Some(&4) {
            return Err(format!("Unexpected result: {:?}", result));
        }
        Ok(())
    })
}

#[test]
fn rate_limit_caps_the_whole_pool() -> Result<(), String> {
    run_async_test(async {
        let server = spawn_mock_server(MockResponse::json(200, "{}"))?;
        let document = document()?;
        let operation = operation(&document, &server.url, HttpMethod::Get)?;
        let limited = BenchmarkConfig {
            rate_limit: 5.0,
            ..config(10, 10, 0)
        };
        let benchmarker = Benchmarker::new(limited, Shutdown::new()).map_err(|err| err.to_string())?;

        let result = benchmarker
            .benchmark_operation(&operation, &document, 0, 1)
            .await
            .ok_or("Benchmark returned no result")?;
        if result.total_duration < Duration::from_millis(1500) {
            return Err(format!("Rate limit not applied: {:?}", result.total_duration));
        }
        if result.success_count != 10 {
            return Err(format!("Unexpected counts: {:?}", result));
        }
        Ok(())
    })
}

#[test]
fn unbuildable_operation_counts_every_iteration_as_error() -> Result<(), String> {
    run_async_test(async {
        let server = spawn_mock_server(MockResponse::json(201, "{}"))?;
        let document = document()?;
        let operation = operation(&document, &server.url, HttpMethod::Post)?;
        let (handler, kinds) = recording_handler();
        let benchmarker = Benchmarker::new(config(7, 2, 3), Shutdown::new())
            .map_err(|err| err.to_string())?
            .with_event_handler(handler);

        let result = benchmarker
            .benchmark_operation(&operation, &document, 0, 1)
            .await
            .ok_or("Benchmark returned no result")?;
        if result.error_count != 7 || (result.error_rate - 100.0).abs() > f64::EPSILON {
            return Err(format!("Unexpected counts: {:?}", result));
        }
        let first_error = result.sample_errors.first().map(String::as_str).unwrap_or_default();
        if !first_error.starts_with("failed to build request:") {
            return Err(format!("Unexpected error: {}", first_error));
        }
        if server.hits() != 0 {
            return Err(format!("No request should be sent, got {}", server.hits()));
        }
        let seen = kinds.lock().map_err(|err| err.to_string())?.clone();
        if seen != [BenchmarkEventKind::BenchmarkCompleted] {
            return Err(format!("Unexpected events: {:?}", seen));
        }
        Ok(())
    })
}

#[test]
fn events_follow_phase_order() -> Result<(), String> {
    run_async_test(async {
        let server = spawn_mock_server(MockResponse::json(200, "{}"))?;
        let document = document()?;
        let operation = operation(&document, &server.url, HttpMethod::Get)?;
        let (handler, kinds) = recording_handler();
        let benchmarker = Benchmarker::new(config(4, 2, 2), Shutdown::new())
            .map_err(|err| err.to_string())?
            .with_event_handler(handler);

        benchmarker
            .benchmark_operation(&operation, &document, 0, 1)
            .await
            .ok_or("Benchmark returned no result")?;

        let seen = kinds.lock().map_err(|err| err.to_string())?.clone();
        let expected = [
            BenchmarkEventKind::WarmupStarting,
            BenchmarkEventKind::WarmupProgress,
            BenchmarkEventKind::WarmupProgress,
            BenchmarkEventKind::WarmupCompleted,
            BenchmarkEventKind::BenchmarkStarting,
            BenchmarkEventKind::BenchmarkProgress,
            BenchmarkEventKind::BenchmarkProgress,
            BenchmarkEventKind::BenchmarkProgress,
            BenchmarkEventKind::BenchmarkProgress,
            BenchmarkEventKind::BenchmarkCompleted,
        ];
        if seen != expected {
            return Err(format!("Unexpected events: {:?}", seen));
        }
        Ok(())
    })
}

#[test]
fn no_warmup_skips_warmup_events() -> Result<(), String> {
    run_async_test(async {
        let server = spawn_mock_server(MockResponse::json(200, "{}"))?;
        let document = document()?;
        let operation = operation(&document, &server.url, HttpMethod::Get)?;
        let (handler, kinds) = recording_handler();
        let benchmarker = Benchmarker::new(config(40, 4, 0), Shutdown::new())
            .map_err(|err| err.to_string())?
            .with_event_handler(handler);

        benchmarker
            .benchmark_operation(&operation, &document, 0, 1)
            .await
            .ok_or("Benchmark returned no result")?;

        let seen = kinds.lock().map_err(|err| err.to_string())?.clone();
        let progress = seen
            .iter()
            .filter(|kind| **kind == BenchmarkEventKind::BenchmarkProgress)
            .count();
        if seen.first() != Some(&BenchmarkEventKind::BenchmarkStarting)
            || seen.last() != Some(&BenchmarkEventKind::BenchmarkCompleted)
            || progress != 20
        {
            return Err(format!("Unexpected events: {:?}", seen));
        }
        Ok(())
    })
}

#[test]
fn run_aggregates_operations_in_order() -> Result<(), String> {
    run_async_test(async {
        let server = spawn_mock_server(MockResponse::json(200, "{}"))?;
        let document = document()?;
        let operations = document.operations(&server.url);
        let benchmarker =
            Benchmarker::new(config(5, 1, 0), Shutdown::new()).map_err(|err| err.to_string())?;

        let summary = benchmarker.benchmark_operations(&operations, &document).await;
        if summary.total_endpoints != 2 || summary.results.len() != 2 {
            return Err(format!("Unexpected summary: {:?}", summary));
        }
        let methods: Vec<HttpMethod> = summary.results.iter().map(|result| result.method).collect();
        if methods != [HttpMethod::Get, HttpMethod::Post] {
            return Err(format!("Unexpected order: {:?}", methods));
        }
        if summary.total_requests != 10 || summary.total_errors != 5 || summary.total_successes != 5 {
            return Err(format!("Unexpected totals: {:?}", summary));
        }
        Ok(())
    })
}

#[test]
fn cancelled_run_returns_nothing() -> Result<(), String> {
    run_async_test(async {
        let server = spawn_mock_server(MockResponse::json(200, "{}"))?;
        let document = document()?;
        let operations = document.operations(&server.url);
        let shutdown = Shutdown::new();
        shutdown.cancel();
        let benchmarker = Benchmarker::new(config(5, 1, 1), shutdown).map_err(|err| err.to_string())?;

        let summary = benchmarker.benchmark_operations(&operations, &document).await;
        if summary.total_endpoints != 0 || server.hits() != 0 {
            return Err(format!("Unexpected summary: {:?}", summary));
        }
        Ok(())
    })
}

#[test]
fn cancellation_mid_measurement_keeps_partial_result() -> Result<(), String> {
    run_async_test(async {
        let server = spawn_mock_server(MockResponse::json(200, "{}").with_delay(ms(100)))?;
        let document = document()?;
        let operations = document.operations(&server.url);
        let shutdown = Shutdown::new();
        let benchmarker =
            Benchmarker::new(config(200, 2, 0), shutdown.clone()).map_err(|err| err.to_string())?;

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(ms(450)).await;
            shutdown.cancel();
        });
        let summary = benchmarker.benchmark_operations(&operations, &document).await;
        canceller.await.map_err(|err| err.to_string())?;

        let result = summary.results.first().ok_or("Partial result was dropped")?;
        if summary.results.len() != 1 || !result.cancelled {
            return Err(format!("Unexpected summary: {:?}", summary));
        }
        if result.iterations >= 200
            || result.iterations != result.success_count.saturating_add(result.error_count)
        {
            return Err(format!("Unexpected partial result: {:?}", result));
        }
        Ok(())
    })
}
