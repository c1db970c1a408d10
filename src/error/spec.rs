use std::path::PathBuf;

use thiserror::Error;

use crate::openapi::HttpMethod;

#[derive(Debug, Error)]
pub enum SpecError {
    #[error("Failed to read API document '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse JSON API document '{path}': {source}")]
    ParseJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to parse YAML API document '{path}': {source}")]
    ParseYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },
    #[error("Unsupported API document extension '{ext}'. Use .json, .yaml or .yml.")]
    UnsupportedExtension { ext: String },
    #[error("API document must have a .json, .yaml or .yml extension.")]
    MissingExtension,
    #[error("API document root must be an object.")]
    NotAnObject,
    #[error("Swagger {version} documents are not supported; convert to OpenAPI 3.")]
    UnsupportedVersion { version: String },
    #[error("Path not found: {path}")]
    PathNotFound { path: String },
    #[error("Operation not found: {method} {path}")]
    OperationNotFound { method: HttpMethod, path: String },
}
