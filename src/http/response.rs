use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Request, Response};

use crate::error::SendError;
use crate::shutdown::Shutdown;

/// A fully read HTTP response.
#[derive(Debug, Clone, Default)]
pub struct ResponseSnapshot {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ResponseSnapshot {
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// Adds a header; invalid names or values are skipped.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(header_name), Ok(header_value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(header_name, header_value);
        }
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Reads status, headers and the whole body.
    ///
    /// # Errors
    ///
    /// Returns an error when the body cannot be read.
    pub async fn read(response: Response) -> Result<Self, reqwest::Error> {
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();
        Ok(Self {
            status,
            headers,
            body,
        })
    }

    /// Header value as text, or `None` when absent or not visible ASCII.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|value| value.to_str().ok())
    }

    /// The `Content-Type` header, empty when absent.
    #[must_use]
    pub fn content_type(&self) -> &str {
        self.header(CONTENT_TYPE.as_str()).unwrap_or_default()
    }
}

/// Executes one request, bounded by `timeout` and the run's cancellation.
///
/// # Errors
///
/// Returns an error when the run is cancelled, the timeout elapses, or the
/// transport fails.
pub async fn send(
    client: &Client,
    request: Request,
    timeout: Duration,
    shutdown: &Shutdown,
) -> Result<ResponseSnapshot, SendError> {
    let exchange = async {
        let response = client.execute(request).await?;
        ResponseSnapshot::read(response).await
    };
    tokio::select! {
        () = shutdown.cancelled() => Err(SendError::Cancelled),
        outcome = tokio::time::timeout(timeout, exchange) => match outcome {
            Ok(Ok(snapshot)) => Ok(snapshot),
            Ok(Err(err)) => Err(SendError::Transport { source: err }),
            Err(_elapsed) => Err(SendError::TimedOut(timeout)),
        },
    }
}
