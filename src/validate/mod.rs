//! Classifies a response against an operation's declared responses.
//!
//! Checks are deliberately shallow: status code, declared headers, content
//! type, and for JSON bodies the top-level kind plus required object keys.

use crate::http::ResponseSnapshot;
use crate::models::ValidationError;
use crate::openapi::{MediaType, OperationDetails, ResponseDefinition, SchemaType};

#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseValidator;

impl ResponseValidator {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Returns every mismatch found; an empty list means the response
    /// conforms. Missing inputs yield one descriptive error.
    #[must_use]
    pub fn validate(
        &self,
        response: Option<&ResponseSnapshot>,
        details: Option<&OperationDetails>,
    ) -> Vec<ValidationError> {
        let Some(response) = response else {
            return vec![ValidationError::new("response", "response is missing")];
        };
        let Some(details) = details else {
            return vec![ValidationError::new("operation", "operation details are missing")];
        };

        let Some(definition) = match_definition(details, response.status) else {
            return vec![ValidationError::new(
                "status_code",
                format!(
                    "unexpected status code {}, not defined in OpenAPI spec",
                    response.status
                ),
            )];
        };

        let mut errors = Vec::new();
        for header in &definition.headers {
            if response.header(header).is_none_or(str::is_empty) {
                errors.push(ValidationError::new(
                    format!("header.{}", header),
                    format!("missing required header: {}", header),
                ));
            }
        }

        let content_type = response.content_type();
        if definition.content.is_empty() {
            return errors;
        }
        if !content_type.is_empty() && !content_type_declared(&definition.content, content_type) {
            errors.push(ValidationError::new(
                "content_type",
                format!("unexpected content type: {}", content_type),
            ));
        }

        if content_type.to_ascii_lowercase().contains("json") {
            let schema = MediaType::find_json(&definition.content)
                .and_then(|media| media.schema)
                .and_then(|id| details.schemas.get(id));
            if let Some(schema) = schema {
                errors.extend(validate_body(
                    &response.body,
                    schema.primary_type(),
                    &schema.required,
                ));
            }
        }
        errors
    }
}

/// Exact code, then `default`, then the `Nxx` range.
fn match_definition(details: &OperationDetails, status: u16) -> Option<&ResponseDefinition> {
    let responses = &details.responses;
    responses
        .code(&status.to_string())
        .or(responses.default.as_ref())
        .or_else(|| responses.code(&format!("{}xx", status.checked_div(100).unwrap_or(0))))
}

fn content_type_declared(content: &[MediaType], actual: &str) -> bool {
    let actual = actual.to_ascii_lowercase();
    content.iter().any(|media| {
        let essence = media
            .media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        actual.contains(&essence)
    })
}

fn validate_body(
    body: &[u8],
    expected: Option<SchemaType>,
    required: &[String],
) -> Vec<ValidationError> {
    let decoded: serde_json::Value = match serde_json::from_slice(body) {
        Ok(decoded) => decoded,
        Err(err) => {
            return vec![ValidationError::new(
                "body",
                format!("failed to parse JSON response: {}", err),
            )];
        }
    };

    let mut errors = Vec::new();
    let kind_matches = match expected {
        Some(SchemaType::Object) => decoded.is_object(),
        Some(SchemaType::Array) => decoded.is_array(),
        Some(SchemaType::String) => decoded.is_string(),
        Some(SchemaType::Integer | SchemaType::Number) => decoded.is_number(),
        Some(SchemaType::Boolean) => decoded.is_boolean(),
        Some(SchemaType::Null) | None => true,
    };
    if let Some(expected) = expected
        && !kind_matches
    {
        let kind = match expected {
            SchemaType::Integer | SchemaType::Number => "number",
            SchemaType::String
            | SchemaType::Boolean
            | SchemaType::Array
            | SchemaType::Object
            | SchemaType::Null => expected.as_str(),
        };
        errors.push(ValidationError::new(
            "body",
            format!("expected {} type, got different type", kind),
        ));
    }

    if expected == Some(SchemaType::Object)
        && let Some(object) = decoded.as_object()
    {
        for name in required {
            if !object.contains_key(name) {
                errors.push(ValidationError::new(
                    format!("body.{}", name),
                    format!("missing required field: {}", name),
                ));
            }
        }
    }
    errors
}
