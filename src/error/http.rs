use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Failed to build HTTP client: {source}")]
    BuildClientFailed {
        #[source]
        source: reqwest::Error,
    },
}

/// Failure of one HTTP exchange. Never retried.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("request cancelled")]
    Cancelled,
    #[error("request timed out after {}ms", .0.as_millis())]
    TimedOut(Duration),
    #[error("request failed: {source}")]
    Transport {
        #[source]
        source: reqwest::Error,
    },
}
