use std::time::Duration;

use reqwest::Client;

use crate::error::{AppError, AppResult, HttpError};

use super::request::DEFAULT_USER_AGENT;

/// Connection settings for the client shared by every worker of a run.
#[derive(Debug, Clone, Copy)]
pub struct ClientSettings {
    pub timeout: Duration,
    pub keep_alive: bool,
    /// Idle connections kept per host; at least the worker count.
    pub pool_size: usize,
}

impl ClientSettings {
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            keep_alive: true,
            pool_size: 1,
        }
    }
}

/// Builds the HTTP client.
///
/// # Errors
///
/// Returns an error when the TLS backend cannot be initialised.
pub fn build_client(settings: &ClientSettings) -> AppResult<Client> {
    let mut client_builder = Client::builder()
        .timeout(settings.timeout)
        .user_agent(DEFAULT_USER_AGENT);

    if settings.keep_alive {
        client_builder = client_builder.pool_max_idle_per_host(settings.pool_size.max(1));
    } else {
        client_builder = client_builder
            .pool_max_idle_per_host(0)
            .pool_idle_timeout(Some(Duration::from_secs(0)));
    }

    client_builder
        .build()
        .map_err(|err| AppError::http(HttpError::BuildClientFailed { source: err }))
}
