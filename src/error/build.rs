use thiserror::Error;

use crate::openapi::ParameterLocation;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("Schema #{id} is not present in the schema registry.")]
    UnknownSchema { id: usize },
}

/// Why a declared request body could not be produced.
#[derive(Debug, Error)]
pub enum BodyFailure {
    #[error("request body declares no media types")]
    NoContent,
    #[error("media type '{media_type}' has no resolvable schema")]
    NoSchema { media_type: String },
    #[error("{0}")]
    Generate(#[from] GenerateError),
    #[error("failed to serialize body as '{media_type}': {source}")]
    Serialize {
        media_type: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Failed to generate {location} parameter '{name}': {source}")]
    ParameterGeneration {
        name: String,
        location: ParameterLocation,
        #[source]
        source: GenerateError,
    },
    #[error("Failed to generate request body: {source}")]
    BodyGeneration {
        #[source]
        source: BodyFailure,
    },
    #[error("Invalid request URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Server URL '{url}' cannot carry a path")]
    NotABaseUrl { url: String },
    #[error("Invalid header name '{name}': {source}")]
    InvalidHeaderName {
        name: String,
        #[source]
        source: reqwest::header::InvalidHeaderName,
    },
    #[error("Invalid value for header '{name}': {source}")]
    InvalidHeaderValue {
        name: String,
        #[source]
        source: reqwest::header::InvalidHeaderValue,
    },
}

impl From<BodyFailure> for BuildError {
    fn from(source: BodyFailure) -> Self {
        BuildError::BodyGeneration { source }
    }
}
