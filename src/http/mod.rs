//! Request assembly, the shared HTTP client and request pacing.
mod client;
mod rate;
mod request;
mod response;

#[cfg(test)]
pub(crate) mod test_support;
#[cfg(test)]
mod tests;

pub use client::{ClientSettings, build_client};
pub use rate::RateLimiter;
pub use request::{DEFAULT_USER_AGENT, RequestBuilder};
pub use response::{ResponseSnapshot, send};
