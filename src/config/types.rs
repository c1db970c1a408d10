use std::time::Duration;

use serde::Deserialize;

use crate::args::OutputFormat;
use crate::args::parsers::parse_duration_arg;
use crate::error::InputError;

/// Contents of `specstress.toml` / `specstress.json`. Every field is
/// optional; command-line flags win over anything set here.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    pub server: Option<String>,
    pub filter: Option<String>,
    pub tags: Option<Vec<String>>,
    pub verbose: Option<bool>,
    pub timeout: Option<DurationValue>,
    pub output: Option<OutputFormat>,
    pub output_file: Option<String>,
    pub seed: Option<u64>,
    pub no_color: Option<bool>,
    pub benchmark: Option<BenchmarkSection>,
}

/// `[benchmark]` table; ignored by the `test` subcommand.
#[derive(Debug, Default, Deserialize)]
pub struct BenchmarkSection {
    pub iterations: Option<usize>,
    pub concurrency: Option<usize>,
    pub warmup: Option<usize>,
    pub rate: Option<f64>,
    #[serde(alias = "disable_keepalive")]
    pub no_keepalive: Option<bool>,
}

/// A duration written either as whole seconds or as text such as `"500ms"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    pub(crate) fn to_duration(&self) -> Result<Duration, InputError> {
        match self {
            Self::Seconds(0) => Err(InputError::DurationZero),
            Self::Seconds(secs) => Ok(Duration::from_secs(*secs)),
            Self::Text(text) => parse_duration_arg(text),
        }
    }
}
