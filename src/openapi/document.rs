use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::SpecError;

use super::model::{
    HttpMethod, MediaType, Operation, OperationDetails, Parameter, ParameterLocation,
    RequestBody, ResponseDefinition, Responses, SchemaRegistry,
};
use super::provider::OperationProvider;
use super::resolve::Resolver;

const FALLBACK_SERVER: &str = "http://localhost";

struct Entry {
    tags: Vec<String>,
    details: Arc<OperationDetails>,
}

/// A loaded OpenAPI 3 document with every operation resolved up front.
pub struct ApiDocument {
    title: String,
    version: String,
    servers: Vec<String>,
    entries: Vec<Entry>,
    schemas: Arc<SchemaRegistry>,
}

struct Draft {
    tags: Vec<String>,
    operation_id: String,
    path: String,
    method: HttpMethod,
    parameters: Vec<Parameter>,
    request_body: Option<RequestBody>,
    responses: Responses,
}

impl ApiDocument {
    /// Reads a `.json`, `.yaml` or `.yml` document from disk.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read, is not valid JSON/YAML,
    /// or is not an OpenAPI 3 document.
    pub fn from_path(path: &Path) -> Result<Self, SpecError> {
        let content = std::fs::read_to_string(path).map_err(|source| SpecError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let value = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => {
                serde_json::from_str(&content).map_err(|source| SpecError::ParseJson {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            Some("yaml" | "yml") => {
                let yaml: serde_yaml_ng::Value =
                    serde_yaml_ng::from_str(&content).map_err(|source| SpecError::ParseYaml {
                        path: path.to_path_buf(),
                        source,
                    })?;
                yaml_to_json(yaml)
            }
            Some(ext) => {
                return Err(SpecError::UnsupportedExtension {
                    ext: ext.to_owned(),
                });
            }
            None => return Err(SpecError::MissingExtension),
        };
        Self::from_value(&value)
    }

    /// Builds a document from an already parsed JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error when the value is not an OpenAPI 3 document.
    pub fn from_value(root: &Value) -> Result<Self, SpecError> {
        if !root.is_object() {
            return Err(SpecError::NotAnObject);
        }
        if let Some(version) = root.get("swagger") {
            return Err(SpecError::UnsupportedVersion {
                version: render_scalar(version),
            });
        }

        let info = root.get("info");
        let title = info
            .and_then(|info| info.get("title"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        let version = info
            .and_then(|info| info.get("version"))
            .map(render_scalar)
            .unwrap_or_default();
        let servers = read_servers(root);

        let mut resolver = Resolver::new(root);
        let mut drafts = Vec::new();
        if let Some(paths) = root.get("paths").and_then(Value::as_object) {
            for (path, item) in paths {
                let Some(item) = resolver.deref(item) else {
                    continue;
                };
                let shared = item
                    .get("parameters")
                    .map(|params| read_parameters(&mut resolver, params))
                    .unwrap_or_default();
                for method in HttpMethod::ALL {
                    let Some(operation) = item.get(method.document_key()) else {
                        continue;
                    };
                    drafts.push(read_operation(
                        &mut resolver,
                        path,
                        method,
                        operation,
                        &shared,
                    ));
                }
            }
        }

        let schemas = Arc::new(resolver.into_registry());
        let entries = drafts
            .into_iter()
            .map(|draft| Entry {
                tags: draft.tags,
                details: Arc::new(OperationDetails {
                    operation_id: draft.operation_id,
                    path: draft.path,
                    method: draft.method,
                    parameters: draft.parameters,
                    request_body: draft.request_body,
                    responses: draft.responses,
                    schemas: Arc::clone(&schemas),
                }),
            })
            .collect::<Vec<_>>();
        debug!(
            "Loaded API document '{}' with {} operations and {} schemas",
            title,
            entries.len(),
            schemas.len()
        );

        Ok(Self {
            title,
            version,
            servers,
            entries,
            schemas,
        })
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Declared server URLs, or `http://localhost` when none are declared.
    #[must_use]
    pub fn server_urls(&self) -> Vec<String> {
        if self.servers.is_empty() {
            return vec![FALLBACK_SERVER.to_owned()];
        }
        self.servers.clone()
    }

    #[must_use]
    pub fn schemas(&self) -> &Arc<SchemaRegistry> {
        &self.schemas
    }
}

impl OperationProvider for ApiDocument {
    fn operations(&self, base_url: &str) -> Vec<Operation> {
        self.entries
            .iter()
            .map(|entry| Operation {
                path: entry.details.path.clone(),
                method: entry.details.method,
                operation_id: entry.details.operation_id.clone(),
                tags: entry.tags.clone(),
                server_url: base_url.to_owned(),
            })
            .collect()
    }

    fn operation_details(
        &self,
        path: &str,
        method: HttpMethod,
    ) -> Result<Arc<OperationDetails>, SpecError> {
        let mut path_known = false;
        for entry in &self.entries {
            if entry.details.path != path {
                continue;
            }
            path_known = true;
            if entry.details.method == method {
                return Ok(Arc::clone(&entry.details));
            }
        }
        if path_known {
            Err(SpecError::OperationNotFound {
                method,
                path: path.to_owned(),
            })
        } else {
            Err(SpecError::PathNotFound {
                path: path.to_owned(),
            })
        }
    }
}

fn read_servers(root: &Value) -> Vec<String> {
    let Some(servers) = root.get("servers").and_then(Value::as_array) else {
        return Vec::new();
    };
    servers
        .iter()
        .filter_map(|server| {
            let mut url = server.get("url").and_then(Value::as_str)?.to_owned();
            if let Some(variables) = server.get("variables").and_then(Value::as_object) {
                for (name, variable) in variables {
                    if let Some(default) = variable.get("default").and_then(Value::as_str) {
                        url = url.replace(&format!("{{{}}}", name), default);
                    }
                }
            }
            Some(url)
        })
        .collect()
}

fn read_operation<'doc>(
    resolver: &mut Resolver<'doc>,
    path: &str,
    method: HttpMethod,
    operation: &'doc Value,
    shared: &[Parameter],
) -> Draft {
    let own = operation
        .get("parameters")
        .map(|params| read_parameters(resolver, params))
        .unwrap_or_default();
    let mut parameters: Vec<Parameter> = shared
        .iter()
        .filter(|inherited| {
            !own.iter().any(|param| {
                param.name == inherited.name && param.location == inherited.location
            })
        })
        .cloned()
        .collect();
    parameters.extend(own);

    let request_body = operation
        .get("requestBody")
        .and_then(|body| resolver.deref(body))
        .map(|body| RequestBody {
            required: body.get("required").and_then(Value::as_bool).unwrap_or(false),
            content: read_content(resolver, body),
        });

    let mut responses = Responses::default();
    if let Some(declared) = operation.get("responses").and_then(Value::as_object) {
        for (code, response) in declared {
            let Some(response) = resolver.deref(response) else {
                continue;
            };
            let definition = read_response(resolver, response);
            if code == "default" {
                responses.default = Some(definition);
            } else {
                responses.codes.push((code.clone(), definition));
            }
        }
    }

    Draft {
        tags: operation
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default(),
        operation_id: operation
            .get("operationId")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned(),
        path: path.to_owned(),
        method,
        parameters,
        request_body,
        responses,
    }
}

fn read_parameters<'doc>(resolver: &mut Resolver<'doc>, params: &'doc Value) -> Vec<Parameter> {
    let Some(params) = params.as_array() else {
        return Vec::new();
    };
    let mut parameters = Vec::with_capacity(params.len());
    for param in params {
        let Some(param) = resolver.deref(param) else {
            continue;
        };
        let Some(name) = param.get("name").and_then(Value::as_str) else {
            continue;
        };
        let Some(location) = param
            .get("in")
            .and_then(Value::as_str)
            .and_then(ParameterLocation::parse)
        else {
            continue;
        };
        // Parameters may carry their schema under `content` instead.
        let schema_value = param.get("schema").or_else(|| {
            param
                .get("content")
                .and_then(Value::as_object)
                .and_then(|content| content.values().next())
                .and_then(|media| media.get("schema"))
        });
        parameters.push(Parameter {
            name: name.to_owned(),
            location,
            required: location == ParameterLocation::Path
                || param.get("required").and_then(Value::as_bool).unwrap_or(false),
            schema: schema_value.and_then(|schema| resolver.schema(schema)),
        });
    }
    parameters
}

fn read_content<'doc>(resolver: &mut Resolver<'doc>, holder: &'doc Value) -> Vec<MediaType> {
    let Some(content) = holder.get("content").and_then(Value::as_object) else {
        return Vec::new();
    };
    content
        .iter()
        .map(|(media_type, media)| MediaType {
            media_type: media_type.clone(),
            schema: media
                .get("schema")
                .and_then(|schema| resolver.schema(schema)),
        })
        .collect()
}

fn read_response<'doc>(resolver: &mut Resolver<'doc>, response: &'doc Value) -> ResponseDefinition {
    ResponseDefinition {
        description: response
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned(),
        headers: response
            .get("headers")
            .and_then(Value::as_object)
            .map(|headers| headers.keys().cloned().collect())
            .unwrap_or_default(),
        content: read_content(resolver, response),
    }
}

fn render_scalar(value: &Value) -> String {
    value
        .as_str()
        .map_or_else(|| value.to_string(), str::to_owned)
}

/// YAML mappings may use non-string keys (`200:`); JSON objects may not.
fn yaml_to_json(value: serde_yaml_ng::Value) -> Value {
    match value {
        serde_yaml_ng::Value::Null => Value::Null,
        serde_yaml_ng::Value::Bool(flag) => Value::Bool(flag),
        serde_yaml_ng::Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                Value::from(int)
            } else if let Some(uint) = number.as_u64() {
                Value::from(uint)
            } else {
                number
                    .as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map_or(Value::Null, Value::Number)
            }
        }
        serde_yaml_ng::Value::String(text) => Value::String(text),
        serde_yaml_ng::Value::Sequence(items) => {
            Value::Array(items.into_iter().map(yaml_to_json).collect())
        }
        serde_yaml_ng::Value::Mapping(mapping) => {
            let mut object = serde_json::Map::with_capacity(mapping.len());
            for (key, item) in mapping {
                object.insert(yaml_key(key), yaml_to_json(item));
            }
            Value::Object(object)
        }
        serde_yaml_ng::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_key(key: serde_yaml_ng::Value) -> String {
    match key {
        serde_yaml_ng::Value::String(text) => text,
        serde_yaml_ng::Value::Number(number) => number.to_string(),
        serde_yaml_ng::Value::Bool(flag) => flag.to_string(),
        serde_yaml_ng::Value::Null => "null".to_owned(),
        serde_yaml_ng::Value::Tagged(tagged) => yaml_key(tagged.value),
        serde_yaml_ng::Value::Sequence(_) | serde_yaml_ng::Value::Mapping(_) => {
            yaml_to_json(key).to_string()
        }
    }
}
