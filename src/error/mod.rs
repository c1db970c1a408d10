mod app;
mod build;
mod config;
mod http;
mod input;
mod sink;
mod spec;

pub use app::{AppError, AppResult};
pub use build::{BodyFailure, BuildError, GenerateError};
pub use config::ConfigError;
pub use http::{HttpError, SendError};
pub use input::InputError;
pub use sink::SinkError;
pub use spec::SpecError;
