use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;

use super::test_support::{MockResponse, spawn_mock_server};
use super::*;
use crate::error::{BodyFailure, BuildError, SendError};
use crate::generator::Generator;
use crate::openapi::{
    HttpMethod, MediaType, OperationDetails, Parameter, ParameterLocation, RequestBody, Schema,
    SchemaId, SchemaRegistry, SchemaType,
};
use crate::shutdown::Shutdown;

fn run_async_test<F>(future: F) -> Result<(), String>
where
    F: Future<Output = Result<(), String>>,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .map_err(|err| format!("Failed to build runtime: {}", err))?;
    runtime.block_on(future)
}

fn param(name: &str, location: ParameterLocation, schema: Option<SchemaId>) -> Parameter {
    Parameter {
        name: name.to_owned(),
        location,
        required: true,
        schema,
    }
}

fn fixed(registry: &mut SchemaRegistry, example: serde_json::Value) -> SchemaId {
    registry.insert(Schema {
        example: Some(example),
        ..Schema::of_type(SchemaType::String)
    })
}

fn body_text(request: &reqwest::Request) -> Result<String, String> {
    let bytes = request
        .body()
        .and_then(reqwest::Body::as_bytes)
        .ok_or("Missing body")?;
    String::from_utf8(bytes.to_vec()).map_err(|err| err.to_string())
}

#[test]
fn builds_path_query_and_headers() -> Result<(), String> {
    let mut registry = SchemaRegistry::new();
    let id = fixed(&mut registry, json!(42));
    let query = fixed(&mut registry, json!("a b&c"));
    let header = fixed(&mut registry, json!("custom/type"));
    let mut details = OperationDetails::new("/pets/{petId}", HttpMethod::Get, Arc::new(registry));
    details.parameters = vec![
        param("petId", ParameterLocation::Path, Some(id)),
        param("q", ParameterLocation::Query, Some(query)),
        param("limit", ParameterLocation::Query, None),
        param("Accept", ParameterLocation::Header, Some(header)),
        param("session", ParameterLocation::Cookie, None),
    ];

    let mut builder = RequestBuilder::new(Generator::new(1));
    let request = builder
        .build(&details, "http://api.test/v1/")
        .map_err(|err| err.to_string())?;

    if request.url().as_str() != "http://api.test/v1/pets/42?q=a+b%26c&limit=test" {
        return Err(format!("Unexpected url: {}", request.url()));
    }
    if request.method() != reqwest::Method::GET || request.body().is_some() {
        return Err("GET must not carry a body".to_owned());
    }
    let headers = request.headers();
    if headers.get("accept").and_then(|value| value.to_str().ok()) != Some("custom/type") {
        return Err(format!("Header parameter did not override Accept: {:?}", headers));
    }
    if headers.get("user-agent").and_then(|value| value.to_str().ok()) != Some(DEFAULT_USER_AGENT)
    {
        return Err("Missing User-Agent".to_owned());
    }
    if headers.get("cookie").and_then(|value| value.to_str().ok()) != Some("session=test") {
        return Err(format!("Unexpected cookie header: {:?}", headers.get("cookie")));
    }
    Ok(())
}

#[test]
fn path_values_stay_inside_their_segment() -> Result<(), String> {
    let mut registry = SchemaRegistry::new();
    let id = fixed(&mut registry, json!("a?b#c/d e"));
    let mut details = OperationDetails::new("/items/{id}/tags", HttpMethod::Get, Arc::new(registry));
    details.parameters = vec![param("id", ParameterLocation::Path, Some(id))];

    let request = RequestBuilder::new(Generator::new(0))
        .build(&details, "http://api.test/v1")
        .map_err(|err| err.to_string())?;
    let url = request.url();
    if url.path() != "/v1/items/a%3Fb%23c%2Fd%20e/tags" {
        return Err(format!("Unexpected path: {}", url.path()));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(format!("Value leaked out of the path: {}", url));
    }
    Ok(())
}

#[test]
fn trailing_slash_of_the_template_is_kept() -> Result<(), String> {
    let details = OperationDetails::new("/pets/", HttpMethod::Get, Arc::new(SchemaRegistry::new()));
    let request = RequestBuilder::new(Generator::new(0))
        .build(&details, "http://api.test/")
        .map_err(|err| err.to_string())?;
    if request.url().as_str() != "http://api.test/pets/" {
        return Err(format!("Unexpected url: {}", request.url()));
    }
    Ok(())
}

#[test]
fn no_query_parameters_means_no_query_string() -> Result<(), String> {
    let details = OperationDetails::new("/health", HttpMethod::Get, Arc::new(SchemaRegistry::new()));
    let request = RequestBuilder::new(Generator::new(0))
        .build(&details, "http://api.test")
        .map_err(|err| err.to_string())?;
    if request.url().query().is_some() || request.url().path() != "/health" {
        return Err(format!("Unexpected url: {}", request.url()));
    }
    if request.headers().get("accept").and_then(|value| value.to_str().ok())
        != Some("application/json")
    {
        return Err("Missing default Accept".to_owned());
    }
    Ok(())
}

#[test]
fn body_prefers_json_media_type() -> Result<(), String> {
    let mut registry = SchemaRegistry::new();
    let name = fixed(&mut registry, json!("rex"));
    let pet = registry.insert(Schema {
        properties: vec![("name".to_owned(), Some(name))],
        required: vec!["name".to_owned()],
        ..Schema::of_type(SchemaType::Object)
    });
    let text = fixed(&mut registry, json!("plain"));
    let mut details = OperationDetails::new("/pets", HttpMethod::Post, Arc::new(registry));
    details.request_body = Some(RequestBody {
        required: true,
        content: vec![
            MediaType {
                media_type: "text/plain".to_owned(),
                schema: Some(text),
            },
            MediaType {
                media_type: "application/json".to_owned(),
                schema: Some(pet),
            },
        ],
    });

    let request = RequestBuilder::new(Generator::new(3))
        .build(&details, "http://api.test")
        .map_err(|err| err.to_string())?;
    if body_text(&request)? != r#"{"name":"rex"}"# {
        return Err(format!("Unexpected body: {}", body_text(&request)?));
    }
    if request.headers().get("content-type").and_then(|value| value.to_str().ok())
        != Some("application/json")
    {
        return Err("Unexpected content type".to_owned());
    }
    Ok(())
}

#[test]
fn form_and_text_bodies_use_their_wire_format() -> Result<(), String> {
    let mut registry = SchemaRegistry::new();
    let name = fixed(&mut registry, json!("a b"));
    let form = registry.insert(Schema {
        properties: vec![("name".to_owned(), Some(name))],
        required: vec!["name".to_owned()],
        ..Schema::of_type(SchemaType::Object)
    });
    let text = fixed(&mut registry, json!("hello"));
    let registry = Arc::new(registry);

    let mut details = OperationDetails::new("/forms", HttpMethod::Put, Arc::clone(&registry));
    details.request_body = Some(RequestBody {
        required: false,
        content: vec![MediaType {
            media_type: "application/x-www-form-urlencoded".to_owned(),
            schema: Some(form),
        }],
    });
    let mut builder = RequestBuilder::new(Generator::new(3));
    let request = builder
        .build(&details, "http://api.test")
        .map_err(|err| err.to_string())?;
    if body_text(&request)? != "name=a+b" {
        return Err(format!("Unexpected form body: {}", body_text(&request)?));
    }

    details.request_body = Some(RequestBody {
        required: false,
        content: vec![MediaType {
            media_type: "text/plain".to_owned(),
            schema: Some(text),
        }],
    });
    let request = builder
        .build(&details, "http://api.test")
        .map_err(|err| err.to_string())?;
    if body_text(&request)? != "hello" {
        return Err(format!("Unexpected text body: {}", body_text(&request)?));
    }
    Ok(())
}

#[test]
fn declared_body_without_schema_fails() -> Result<(), String> {
    let mut details = OperationDetails::new("/pets", HttpMethod::Patch, Arc::new(SchemaRegistry::new()));
    details.request_body = Some(RequestBody {
        required: true,
        content: vec![MediaType {
            media_type: "application/json".to_owned(),
            schema: None,
        }],
    });
    match RequestBuilder::new(Generator::new(0)).build(&details, "http://api.test") {
        Err(BuildError::BodyGeneration {
            source: BodyFailure::NoSchema { media_type },
        }) if media_type == "application/json" => {}
        other => return Err(format!("Unexpected result: {:?}", other.map(|_| ()))),
    }

    details.request_body = Some(RequestBody::default());
    match RequestBuilder::new(Generator::new(0)).build(&details, "http://api.test") {
        Err(BuildError::BodyGeneration {
            source: BodyFailure::NoContent,
        }) => Ok(()),
        other => Err(format!("Unexpected result: {:?}", other.map(|_| ()))),
    }
}

#[test]
fn body_is_ignored_for_methods_without_one() -> Result<(), String> {
    let mut details = OperationDetails::new("/pets", HttpMethod::Delete, Arc::new(SchemaRegistry::new()));
    details.request_body = Some(RequestBody::default());
    let request = RequestBuilder::new(Generator::new(0))
        .build(&details, "http://api.test")
        .map_err(|err| err.to_string())?;
    if request.body().is_some() {
        return Err("DELETE must not carry a body".to_owned());
    }
    Ok(())
}

#[test]
fn parameter_generation_failure_names_the_parameter() -> Result<(), String> {
    let mut other_registry = SchemaRegistry::new();
    other_registry.insert(Schema::default());
    let foreign = other_registry.insert(Schema::default());
    let mut details = OperationDetails::new("/pets/{petId}", HttpMethod::Get, Arc::new(SchemaRegistry::new()));
    details.parameters = vec![param("petId", ParameterLocation::Path, Some(foreign))];
    match RequestBuilder::new(Generator::new(0)).build(&details, "http://api.test") {
        Err(BuildError::ParameterGeneration { name, location, .. })
            if name == "petId" && location == ParameterLocation::Path =>
        {
            Ok(())
        }
        other => Err(format!("Unexpected result: {:?}", other.map(|_| ()))),
    }
}

#[test]
fn relative_server_url_is_rejected() -> Result<(), String> {
    let details = OperationDetails::new("/pets", HttpMethod::Get, Arc::new(SchemaRegistry::new()));
    match RequestBuilder::new(Generator::new(0)).build(&details, "/v1") {
        Err(BuildError::InvalidUrl { url, .. }) if url == "/v1/pets" => Ok(()),
        other => Err(format!("Unexpected result: {:?}", other.map(|_| ()))),
    }
}

#[test]
fn send_reads_status_headers_and_body() -> Result<(), String> {
    run_async_test(async {
        let server = spawn_mock_server(MockResponse::json(201, r#"{"id":1}"#))?;
        let client = build_client(&ClientSettings::new(Duration::from_secs(5)))
            .map_err(|err| err.to_string())?;
        let details = OperationDetails::new("/pets", HttpMethod::Get, Arc::new(SchemaRegistry::new()));
        let request = RequestBuilder::new(Generator::new(0))
            .build(&details, &server.url)
            .map_err(|err| err.to_string())?;
        let snapshot = send(&client, request, Duration::from_secs(5), &Shutdown::new())
            .await
            .map_err(|err| err.to_string())?;
        if snapshot.status != 201 || snapshot.body != br#"{"id":1}"#.to_vec() {
            return Err(format!("Unexpected snapshot: {:?}", snapshot));
        }
        if snapshot.content_type() != "application/json" {
            return Err(format!("Unexpected content type: {}", snapshot.content_type()));
        }
        let seen = server.requests();
        let first = seen.first().ok_or("Server saw no request")?;
        if !first.starts_with("GET /pets HTTP/1.1") {
            return Err(format!("Unexpected request: {}", first));
        }
        Ok(())
    })
}

#[test]
fn send_times_out() -> Result<(), String> {
    run_async_test(async {
        let server = spawn_mock_server(
            MockResponse::json(200, "{}").with_delay(Duration::from_millis(500)),
        )?;
        let client = build_client(&ClientSettings::new(Duration::from_secs(5)))
            .map_err(|err| err.to_string())?;
        let request = reqwest::Request::new(
            reqwest::Method::GET,
            reqwest::Url::parse(&server.url).map_err(|err| err.to_string())?,
        );
        match send(&client, request, Duration::from_millis(50), &Shutdown::new()).await {
            Err(SendError::TimedOut(limit)) if limit == Duration::from_millis(50) => Ok(()),
            other => Err(format!("Unexpected result: {:?}", other)),
        }
    })
}

#[test]
fn send_stops_when_cancelled() -> Result<(), String> {
    run_async_test(async {
        let server = spawn_mock_server(
            MockResponse::json(200, "{}").with_delay(Duration::from_millis(500)),
        )?;
        let client = build_client(&ClientSettings::new(Duration::from_secs(5)))
            .map_err(|err| err.to_string())?;
        let request = reqwest::Request::new(
            reqwest::Method::GET,
            reqwest::Url::parse(&server.url).map_err(|err| err.to_string())?,
        );
        let shutdown = Shutdown::new();
        let canceller = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });
        match send(&client, request, Duration::from_secs(5), &shutdown).await {
            Err(SendError::Cancelled) => Ok(()),
            other => Err(format!("Unexpected result: {:?}", other)),
        }
    })
}

#[test]
fn rate_limiter_paces_acquisitions() -> Result<(), String> {
    run_async_test(async {
        let limiter = RateLimiter::spawn(20.0).ok_or("Expected a limiter")?;
        let shutdown = Shutdown::new();
        let started = Instant::now();
        for _ in 0..6 {
            if !limiter.acquire(&shutdown).await {
                return Err("Acquire failed".to_owned());
            }
        }
        // First token is immediate, the remaining five arrive every 50ms.
        if started.elapsed() < Duration::from_millis(200) {
            return Err(format!("Limiter too fast: {:?}", started.elapsed()));
        }
        Ok(())
    })
}

#[test]
fn rate_limiter_refills_on_the_first_tick_for_uneven_rates() -> Result<(), String> {
    run_async_test(async {
        let limiter = RateLimiter::spawn(3.0).ok_or("Expected a limiter")?;
        let shutdown = Shutdown::new();
        let started = Instant::now();
        for _ in 0..4 {
            if !limiter.acquire(&shutdown).await {
                return Err("Acquire failed".to_owned());
            }
        }
        // One immediate token plus three ticks of 1/3s each.
        let elapsed = started.elapsed();
        if elapsed < Duration::from_millis(900) || elapsed > Duration::from_millis(1250) {
            return Err(format!("Unexpected pacing at 3 req/s: {:?}", elapsed));
        }
        Ok(())
    })
}

#[test]
fn rate_limiter_is_disabled_for_zero() -> Result<(), String> {
    run_async_test(async {
        if RateLimiter::spawn(0.0).is_some() || RateLimiter::spawn(-1.0).is_some() {
            return Err("Expected no limiter".to_owned());
        }
        Ok(())
    })
}

#[test]
fn rate_limiter_acquire_returns_false_after_cancel() -> Result<(), String> {
    run_async_test(async {
        let limiter = RateLimiter::spawn(0.5).ok_or("Expected a limiter")?;
        let shutdown = Shutdown::new();
        if !limiter.acquire(&shutdown).await {
            return Err("Initial token missing".to_owned());
        }
        shutdown.cancel();
        if limiter.acquire(&shutdown).await {
            return Err("Acquire succeeded after cancel".to_owned());
        }
        Ok(())
    })
}
