use chrono::{SecondsFormat, Utc};
use rand::Rng;
use rand::rngs::StdRng;

use super::Value;

const EMAIL: &str = "test@example.com";
const URI: &str = "https://example.com";
const UUID: &str = "123e4567-e89b-12d3-a456-426614174000";
const UNKNOWN_FORMAT: &str = "test-value";

/// Canonical placeholder for a `format` keyword.
pub(super) fn generate(rng: &mut StdRng, format: &str) -> Value {
    match format {
        "date" => Value::String(Utc::now().format("%Y-%m-%d").to_string()),
        "date-time" => Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
        "email" => Value::String(EMAIL.to_owned()),
        "uri" => Value::String(URI.to_owned()),
        "uuid" => Value::String(UUID.to_owned()),
        "int32" => Value::Integer(i64::from(rng.gen_range(0..=i32::MAX))),
        "int64" => Value::Integer(rng.gen_range(0..=i64::MAX)),
        "float" => Value::Number(f64::from(rng.r#gen::<f32>())),
        "double" => Value::Number(rng.r#gen::<f64>()),
        _ => Value::String(UNKNOWN_FORMAT.to_owned()),
    }
}
