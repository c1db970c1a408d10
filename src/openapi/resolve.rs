use std::collections::HashMap;

use serde_json::Value;

use super::model::{Schema, SchemaId, SchemaRegistry, SchemaType};

/// Upper bound on `$ref` hops before a chain is treated as dangling.
const MAX_REF_HOPS: usize = 32;

/// Resolves local `$ref` pointers against one document and interns schemas.
///
/// Every referenced schema is built once: its id is reserved before its
/// body is walked, so a schema that reaches itself gets back its own id.
pub(super) struct Resolver<'doc> {
    root: &'doc Value,
    registry: SchemaRegistry,
    by_pointer: HashMap<String, Option<SchemaId>>,
}

impl<'doc> Resolver<'doc> {
    pub(super) fn new(root: &'doc Value) -> Self {
        Self {
            root,
            registry: SchemaRegistry::new(),
            by_pointer: HashMap::new(),
        }
    }

    pub(super) fn into_registry(self) -> SchemaRegistry {
        self.registry
    }

    fn lookup(&self, reference: &str) -> Option<&'doc Value> {
        let pointer = reference.strip_prefix('#')?;
        if pointer.is_empty() {
            return Some(self.root);
        }
        self.root.pointer(pointer)
    }

    /// Follows `$ref` chains on parameters, bodies, responses and headers.
    pub(super) fn deref(&self, value: &'doc Value) -> Option<&'doc Value> {
        let mut current = value;
        for _ in 0..MAX_REF_HOPS {
            match reference_of(current) {
                Some(reference) => current = self.lookup(reference)?,
                None => return Some(current),
            }
        }
        None
    }

    /// Interns `value` as a schema. `None` means no resolvable schema.
    pub(super) fn schema(&mut self, value: &'doc Value) -> Option<SchemaId> {
        let Some(reference) = reference_of(value) else {
            if !value.is_object() {
                return None;
            }
            let schema = self.build(value);
            return Some(self.registry.insert(schema));
        };

        if let Some(known) = self.by_pointer.get(reference) {
            return *known;
        }
        let Some(target) = self.deref(value) else {
            self.by_pointer.insert(reference.to_owned(), None);
            return None;
        };
        if !target.is_object() {
            self.by_pointer.insert(reference.to_owned(), None);
            return None;
        }

        let id = self.registry.reserve();
        self.by_pointer.insert(reference.to_owned(), Some(id));
        let schema = self.build(target);
        self.registry.fill(id, schema);
        Some(id)
    }

    fn build(&mut self, value: &'doc Value) -> Schema {
        let mut schema = Schema {
            types: read_types(value),
            format: read_string(value, "format"),
            enum_values: value
                .get("enum")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            pattern: read_string(value, "pattern"),
            min_length: value.get("minLength").and_then(Value::as_u64),
            max_length: value.get("maxLength").and_then(Value::as_u64),
            minimum: value.get("minimum").and_then(Value::as_f64),
            maximum: value.get("maximum").and_then(Value::as_f64),
            min_items: value.get("minItems").and_then(Value::as_u64),
            max_items: value.get("maxItems").and_then(Value::as_u64),
            items: None,
            properties: Vec::new(),
            required: read_required(value),
            example: read_example(value),
            default: value.get("default").cloned(),
        };

        if let Some(items) = value.get("items") {
            schema.items = self.schema(items);
        }
        if let Some(properties) = value.get("properties").and_then(Value::as_object) {
            for (name, property) in properties {
                let id = self.schema(property);
                schema.properties.push((name.clone(), id));
            }
        }

        if let Some(members) = value.get("allOf").and_then(Value::as_array) {
            for member in members {
                if let Some(part) = self.member(member) {
                    merge_into(&mut schema, &part);
                }
            }
        }
        if schema.types.is_empty() && schema.properties.is_empty() {
            let alternative = value
                .get("oneOf")
                .or_else(|| value.get("anyOf"))
                .and_then(Value::as_array)
                .and_then(|members| members.first());
            if let Some(part) = alternative.and_then(|first| self.member(first)) {
                merge_into(&mut schema, &part);
            }
        }

        if schema.types.is_empty() {
            if !schema.properties.is_empty() || value.get("properties").is_some() {
                schema.types.push(SchemaType::Object);
            } else if value.get("items").is_some() {
                schema.types.push(SchemaType::Array);
            }
        }
        if value.get("nullable").and_then(Value::as_bool) == Some(true)
            && !schema.types.contains(&SchemaType::Null)
        {
            schema.types.push(SchemaType::Null);
        }
        schema
    }

    fn member(&mut self, member: &'doc Value) -> Option<Schema> {
        let id = self.schema(member)?;
        self.registry.get(id).cloned()
    }
}

fn reference_of(value: &Value) -> Option<&str> {
    value.get("$ref").and_then(Value::as_str)
}

fn read_string(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_owned)
}

fn read_types(value: &Value) -> Vec<SchemaType> {
    let Some(declared) = value.get("type") else {
        return Vec::new();
    };
    if let Some(name) = declared.as_str() {
        return SchemaType::parse(name).into_iter().collect();
    }
    declared
        .as_array()
        .map(|names| {
            names
                .iter()
                .filter_map(Value::as_str)
                .filter_map(SchemaType::parse)
                .collect()
        })
        .unwrap_or_default()
}

fn read_required(value: &Value) -> Vec<String> {
    value
        .get("required")
        .and_then(Value::as_array)
        .map(|names| {
            names
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

fn read_example(value: &Value) -> Option<Value> {
    if let Some(example) = value.get("example") {
        return Some(example.clone());
    }
    value
        .get("examples")
        .and_then(Value::as_array)
        .and_then(|examples| examples.first())
        .cloned()
}

fn merge_into(schema: &mut Schema, part: &Schema) {
    if schema.types.is_empty() {
        schema.types.clone_from(&part.types);
    }
    for (name, id) in &part.properties {
        if !schema.properties.iter().any(|(existing, _)| existing == name) {
            schema.properties.push((name.clone(), *id));
        }
    }
    for name in &part.required {
        if !schema.is_required(name) {
            schema.required.push(name.clone());
        }
    }
    if schema.format.is_none() {
        schema.format.clone_from(&part.format);
    }
    if schema.enum_values.is_empty() {
        schema.enum_values.clone_from(&part.enum_values);
    }
    if schema.pattern.is_none() {
        schema.pattern.clone_from(&part.pattern);
    }
    schema.min_length = schema.min_length.or(part.min_length);
    schema.max_length = schema.max_length.or(part.max_length);
    schema.minimum = schema.minimum.or(part.minimum);
    schema.maximum = schema.maximum.or(part.maximum);
    schema.min_items = schema.min_items.or(part.min_items);
    schema.max_items = schema.max_items.or(part.max_items);
    schema.items = schema.items.or(part.items);
    if schema.example.is_none() {
        schema.example.clone_from(&part.example);
    }
    if schema.default.is_none() {
        schema.default.clone_from(&part.default);
    }
}
