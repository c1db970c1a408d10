use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to create output file '{path}': {source}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write export: {source}")]
    Write {
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize export: {source}")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },
}
