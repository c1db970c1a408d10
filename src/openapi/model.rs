use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Trace,
}

impl HttpMethod {
    /// Methods in the order operations are listed for a path.
    pub const ALL: [HttpMethod; 8] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
        HttpMethod::Head,
        HttpMethod::Options,
        HttpMethod::Trace,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Trace => "TRACE",
        }
    }

    /// Key of the operation object inside a path item.
    #[must_use]
    pub const fn document_key(self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Patch => "patch",
            HttpMethod::Delete => "delete",
            HttpMethod::Head => "head",
            HttpMethod::Options => "options",
            HttpMethod::Trace => "trace",
        }
    }

    /// Only POST, PUT and PATCH requests carry a generated body.
    #[must_use]
    pub const fn sends_body(self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }

    #[must_use]
    pub fn to_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Options => reqwest::Method::OPTIONS,
            HttpMethod::Trace => reqwest::Method::TRACE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim();
        HttpMethod::ALL
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(normalized))
            .ok_or_else(|| format!("Unsupported method: {}", s))
    }
}

/// One (path, method) pair extracted from an API document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub path: String,
    pub method: HttpMethod,
    pub operation_id: String,
    pub tags: Vec<String>,
    pub server_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SchemaId(usize);

impl SchemaId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    Null,
}

impl SchemaType {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "string" => Some(SchemaType::String),
            "integer" => Some(SchemaType::Integer),
            "number" => Some(SchemaType::Number),
            "boolean" => Some(SchemaType::Boolean),
            "array" => Some(SchemaType::Array),
            "object" => Some(SchemaType::Object),
            "null" => Some(SchemaType::Null),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            SchemaType::String => "string",
            SchemaType::Integer => "integer",
            SchemaType::Number => "number",
            SchemaType::Boolean => "boolean",
            SchemaType::Array => "array",
            SchemaType::Object => "object",
            SchemaType::Null => "null",
        }
    }
}

/// The subset of a JSON schema the generator and validator understand.
///
/// `items` and property schemas are `None` when the document referenced
/// something that could not be resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    pub types: Vec<SchemaType>,
    pub format: Option<String>,
    pub enum_values: Vec<serde_json::Value>,
    pub pattern: Option<String>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub items: Option<SchemaId>,
    pub properties: Vec<(String, Option<SchemaId>)>,
    pub required: Vec<String>,
    pub example: Option<serde_json::Value>,
    pub default: Option<serde_json::Value>,
}

impl Schema {
    #[must_use]
    pub fn of_type(schema_type: SchemaType) -> Self {
        Self {
            types: vec![schema_type],
            ..Self::default()
        }
    }

    #[must_use]
    pub fn primary_type(&self) -> Option<SchemaType> {
        self.types.first().copied()
    }

    #[must_use]
    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|required| required == name)
    }
}

/// Arena owning every schema of one document.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: Vec<Schema>,
}

impl SchemaRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, schema: Schema) -> SchemaId {
        let id = SchemaId(self.schemas.len());
        self.schemas.push(schema);
        id
    }

    #[must_use]
    pub fn get(&self, id: SchemaId) -> Option<&Schema> {
        self.schemas.get(id.0)
    }

    /// Reserves a slot so a schema can refer to itself before it is built.
    pub(crate) fn reserve(&mut self) -> SchemaId {
        self.insert(Schema::default())
    }

    pub(crate) fn fill(&mut self, id: SchemaId, schema: Schema) {
        if let Some(slot) = self.schemas.get_mut(id.0) {
            *slot = schema;
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParameterLocation {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "path" => Some(ParameterLocation::Path),
            "query" => Some(ParameterLocation::Query),
            "header" => Some(ParameterLocation::Header),
            "cookie" => Some(ParameterLocation::Cookie),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ParameterLocation::Path => "path",
            ParameterLocation::Query => "query",
            ParameterLocation::Header => "header",
            ParameterLocation::Cookie => "cookie",
        }
    }
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub schema: Option<SchemaId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaType {
    pub media_type: String,
    pub schema: Option<SchemaId>,
}

impl MediaType {
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.media_type.contains("json")
    }

    /// First JSON media type in declaration order.
    #[must_use]
    pub fn find_json(content: &[MediaType]) -> Option<&MediaType> {
        content.iter().find(|media| media.is_json())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestBody {
    pub required: bool,
    pub content: Vec<MediaType>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseDefinition {
    pub description: String,
    pub headers: Vec<String>,
    pub content: Vec<MediaType>,
}

/// Response definitions keyed by exact code or `Nxx` range, plus `default`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Responses {
    pub codes: Vec<(String, ResponseDefinition)>,
    pub default: Option<ResponseDefinition>,
}

impl Responses {
    #[must_use]
    pub fn code(&self, key: &str) -> Option<&ResponseDefinition> {
        self.codes
            .iter()
            .find(|(code, _)| code.eq_ignore_ascii_case(key))
            .map(|(_, definition)| definition)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty() && self.default.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct OperationDetails {
    pub operation_id: String,
    pub path: String,
    pub method: HttpMethod,
    pub parameters: Vec<Parameter>,
    pub request_body: Option<RequestBody>,
    pub responses: Responses,
    pub schemas: Arc<SchemaRegistry>,
}

impl OperationDetails {
    /// Details with no parameters, body or responses over `schemas`.
    #[must_use]
    pub fn new(path: &str, method: HttpMethod, schemas: Arc<SchemaRegistry>) -> Self {
        Self {
            operation_id: String::new(),
            path: path.to_owned(),
            method,
            parameters: Vec::new(),
            request_body: None,
            responses: Responses::default(),
            schemas,
        }
    }

    pub fn parameters_in(&self, location: ParameterLocation) -> impl Iterator<Item = &Parameter> {
        self.parameters
            .iter()
            .filter(move |parameter| parameter.location == location)
    }
}
