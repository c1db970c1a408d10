use reqwest::header::{ACCEPT, CONTENT_TYPE, COOKIE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Body, Request, Url};
use tracing::trace;

use crate::error::{BodyFailure, BuildError};
use crate::generator::{Generator, Value};
use crate::openapi::{MediaType, OperationDetails, Parameter, ParameterLocation, RequestBody};

pub const DEFAULT_USER_AGENT: &str = concat!("specstress/", env!("CARGO_PKG_VERSION"));

const DEFAULT_ACCEPT: &str = "application/json";
const FORM_MEDIA_TYPE: &str = "application/x-www-form-urlencoded";

/// Turns operation details into concrete requests with fresh values.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    generator: Generator,
}

impl RequestBuilder {
    #[must_use]
    pub const fn new(generator: Generator) -> Self {
        Self { generator }
    }

    /// Builds one request for `details` against `server_url`.
    ///
    /// Path tokens are substituted first, then the query string, body and
    /// headers. Header parameters override the default headers.
    ///
    /// # Errors
    ///
    /// Returns an error naming the parameter whose value could not be
    /// generated, when a declared body cannot be produced, or when the
    /// resulting URL or a header is invalid.
    pub fn build(
        &mut self,
        details: &OperationDetails,
        server_url: &str,
    ) -> Result<Request, BuildError> {
        let mut path_values = Vec::new();
        for param in details.parameters_in(ParameterLocation::Path) {
            let value = self.parameter_value(details, param)?;
            path_values.push((format!("{{{}}}", param.name), value));
        }

        let mut url = Url::parse(server_url).map_err(|err| BuildError::InvalidUrl {
            url: format!("{}{}", server_url.trim_end_matches('/'), details.path),
            source: err,
        })?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| BuildError::NotABaseUrl {
                    url: server_url.to_owned(),
                })?;
            segments.pop_if_empty();
            // Each segment is percent-encoded, so values cannot escape it.
            for template in details.path.trim_start_matches('/').split('/') {
                segments.push(&fill_segment(template, &path_values));
            }
        }

        let mut query = Vec::new();
        for param in details.parameters_in(ParameterLocation::Query) {
            let value = self.parameter_value(details, param)?;
            query.push((param.name.as_str(), value));
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        let mut request = Request::new(details.method.to_reqwest(), url);
        let headers = request.headers_mut();
        headers.insert(ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));

        if details.method.sends_body()
            && let Some(declared) = details.request_body.as_ref()
        {
            let (media_type, body) = self.body(details, declared)?;
            insert_header(request.headers_mut(), CONTENT_TYPE.as_str(), &media_type)?;
            *request.body_mut() = Some(Body::from(body));
        }

        for param in details.parameters_in(ParameterLocation::Header) {
            let value = self.parameter_value(details, param)?;
            insert_header(request.headers_mut(), &param.name, &value)?;
        }

        let mut cookies = Vec::new();
        for param in details.parameters_in(ParameterLocation::Cookie) {
            let value = self.parameter_value(details, param)?;
            cookies.push(format!("{}={}", param.name, value));
        }
        if !cookies.is_empty() {
            insert_header(request.headers_mut(), COOKIE.as_str(), &cookies.join("; "))?;
        }

        trace!("Built {} {}", request.method(), request.url());
        Ok(request)
    }

    fn parameter_value(
        &mut self,
        details: &OperationDetails,
        param: &Parameter,
    ) -> Result<String, BuildError> {
        self.generator
            .generate_parameter(&details.schemas, param.schema)
            .map(|value| value.to_string())
            .map_err(|err| BuildError::ParameterGeneration {
                name: param.name.clone(),
                location: param.location,
                source: err,
            })
    }

    /// Picks the JSON media type when declared, else the first one.
    fn body(
        &mut self,
        details: &OperationDetails,
        declared: &RequestBody,
    ) -> Result<(String, Vec<u8>), BodyFailure> {
        let media = MediaType::find_json(&declared.content)
            .or_else(|| declared.content.first())
            .ok_or(BodyFailure::NoContent)?;
        let schema = media.schema.ok_or_else(|| BodyFailure::NoSchema {
            media_type: media.media_type.clone(),
        })?;
        let value = self.generator.generate(&details.schemas, schema)?;
        let encoded = encode_body(&media.media_type, &value)?;
        Ok((media.media_type.clone(), encoded))
    }
}

/// Substitutes every `{name}` token of one path segment.
fn fill_segment(template: &str, values: &[(String, String)]) -> String {
    values
        .iter()
        .fold(template.to_owned(), |segment, (token, value)| {
            segment.replace(token, value)
        })
}

/// Serializes a body for its media type: JSON, form fields, or plain text.
fn encode_body(media_type: &str, value: &Value) -> Result<Vec<u8>, BodyFailure> {
    if media_type.contains("json") {
        return serde_json::to_vec(value).map_err(|err| BodyFailure::Serialize {
            media_type: media_type.to_owned(),
            source: err,
        });
    }
    let is_form = media_type
        .split(';')
        .next()
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(FORM_MEDIA_TYPE));
    if is_form && let Value::Object(fields) = value {
        let mut form = url::form_urlencoded::Serializer::new(String::new());
        for (name, field) in fields {
            form.append_pair(name, &field.to_string());
        }
        return Ok(form.finish().into_bytes());
    }
    Ok(value.to_string().into_bytes())
}

fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) -> Result<(), BuildError> {
    let header_name =
        HeaderName::from_bytes(name.as_bytes()).map_err(|err| BuildError::InvalidHeaderName {
            name: name.to_owned(),
            source: err,
        })?;
    let header_value = HeaderValue::from_str(value).map_err(|err| BuildError::InvalidHeaderValue {
        name: name.to_owned(),
        source: err,
    })?;
    headers.insert(header_name, header_value);
    Ok(())
}
