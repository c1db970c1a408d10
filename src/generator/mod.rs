//! Schema-driven synthetic value generation.
mod formats;
mod value;


use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::GenerateError;
use crate::openapi::{Schema, SchemaId, SchemaRegistry, SchemaType};

pub use value::Value;

/// Nesting limit applied on top of the per-call cycle guard.
pub const MAX_DEPTH: usize = 16;

const DEFAULT_MAX_LENGTH: u64 = 10;
const EMPTY_STRING_LENGTH: usize = 5;
const DEFAULT_MAX_ITEMS: u64 = 3;
const DEFAULT_MINIMUM: f64 = 0.0;
const DEFAULT_MAXIMUM: f64 = 100.0;
const PATTERN_PLACEHOLDER: &str = "test-string";
const ARRAY_ITEM_PLACEHOLDER: &str = "item";
const PARAMETER_PLACEHOLDER: &str = "test";
const FILLER: &str = "a";

/// Produces synthetic values from schemas.
///
/// The generator owns its random source. Seeding it makes every value it
/// produces reproducible, which the tests and `--seed` rely on.
#[derive(Debug, Clone)]
pub struct Generator {
    rng: StdRng,
}

impl Generator {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    #[must_use]
    pub fn with_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::new)
    }

    /// Generates a value for the schema stored under `id`.
    ///
    /// Precedence: example, default, type rule, format rule, empty string.
    /// A schema reached again while it is still being generated yields
    /// `Value::Null`, as does nesting deeper than [`MAX_DEPTH`].
    ///
    /// # Errors
    ///
    /// Returns an error when `id` (or a schema it reaches) is not in
    /// `registry`.
    pub fn generate(
        &mut self,
        registry: &SchemaRegistry,
        id: SchemaId,
    ) -> Result<Value, GenerateError> {
        let mut visiting = Vec::new();
        self.generate_at(registry, id, &mut visiting)
    }

    /// Generates a parameter value; parameters without a schema get `"test"`.
    ///
    /// # Errors
    ///
    /// Returns an error when the parameter schema is not in `registry`.
    pub fn generate_parameter(
        &mut self,
        registry: &SchemaRegistry,
        schema: Option<SchemaId>,
    ) -> Result<Value, GenerateError> {
        match schema {
            Some(id) => self.generate(registry, id),
            None => Ok(Value::String(PARAMETER_PLACEHOLDER.to_owned())),
        }
    }

    fn generate_at(
        &mut self,
        registry: &SchemaRegistry,
        id: SchemaId,
        visiting: &mut Vec<SchemaId>,
    ) -> Result<Value, GenerateError> {
        if visiting.contains(&id) || visiting.len() >= MAX_DEPTH {
            return Ok(Value::Null);
        }
        let schema = registry
            .get(id)
            .ok_or(GenerateError::UnknownSchema { id: id.index() })?;
        visiting.push(id);
        let value = self.generate_schema(registry, schema, visiting);
        visiting.pop();
        value
    }

    fn generate_schema(
        &mut self,
        registry: &SchemaRegistry,
        schema: &Schema,
        visiting: &mut Vec<SchemaId>,
    ) -> Result<Value, GenerateError> {
        if let Some(example) = &schema.example {
            return Ok(Value::from_json(example));
        }
        if let Some(default) = &schema.default {
            return Ok(Value::from_json(default));
        }

        match schema.primary_type() {
            Some(SchemaType::String) => Ok(self.string(schema)),
            Some(SchemaType::Integer) => Ok(self.number(schema, true)),
            Some(SchemaType::Number) => Ok(self.number(schema, false)),
            Some(SchemaType::Boolean) => Ok(Value::Bool(true)),
            Some(SchemaType::Array) => self.array(registry, schema, visiting),
            Some(SchemaType::Object) => self.object(registry, schema, visiting),
            Some(SchemaType::Null) => Ok(Value::Null),
            None => Ok(schema.format.as_deref().map_or_else(
                || Value::String(String::new()),
                |format| formats::generate(&mut self.rng, format),
            )),
        }
    }

    fn string(&mut self, schema: &Schema) -> Value {
        if let Some(format) = &schema.format {
            let formatted = formats::generate(&mut self.rng, format);
            if matches!(formatted, Value::String(_)) {
                return formatted;
            }
        }
        if let Some(first) = schema.enum_values.first() {
            return Value::String(first.as_str().map_or_else(|| first.to_string(), str::to_owned));
        }
        if schema.pattern.is_some() {
            return Value::String(PATTERN_PLACEHOLDER.to_owned());
        }

        let min = schema.min_length.unwrap_or(0);
        let max = schema.max_length.unwrap_or(DEFAULT_MAX_LENGTH);
        let length = self.pick_count(min, max);
        let length = match usize::try_from(length).unwrap_or(usize::MAX) {
            0 => EMPTY_STRING_LENGTH,
            picked => picked,
        };
        Value::String(FILLER.repeat(length))
    }

    fn number(&mut self, schema: &Schema, integer: bool) -> Value {
        let min = schema.minimum.unwrap_or(DEFAULT_MINIMUM);
        let max = schema.maximum.unwrap_or(DEFAULT_MAXIMUM);
        if integer {
            // Only whole numbers inside the bounds qualify.
            let lowest = min.ceil();
            let highest = max.floor();
            if lowest <= highest {
                return Value::Integer(self.rng.gen_range(lowest as i64..=highest as i64));
            }
        }
        let fraction: f64 = self.rng.r#gen();
        let value = min + fraction * (max - min);
        if integer {
            Value::Integer(value.trunc() as i64)
        } else {
            Value::Number(value)
        }
    }

    fn array(
        &mut self,
        registry: &SchemaRegistry,
        schema: &Schema,
        visiting: &mut Vec<SchemaId>,
    ) -> Result<Value, GenerateError> {
        let min = schema.min_items.unwrap_or(0);
        let max = schema.max_items.unwrap_or(DEFAULT_MAX_ITEMS);
        let count = self.pick_count(min, max).max(1);

        let mut items = Vec::new();
        for _ in 0..count {
            let item = match schema.items {
                Some(id) => self.generate_at(registry, id, visiting)?,
                None => Value::String(ARRAY_ITEM_PLACEHOLDER.to_owned()),
            };
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn object(
        &mut self,
        registry: &SchemaRegistry,
        schema: &Schema,
        visiting: &mut Vec<SchemaId>,
    ) -> Result<Value, GenerateError> {
        let mut fields = Vec::with_capacity(schema.properties.len());
        for (name, property) in &schema.properties {
            let include = schema.is_required(name) || self.rng.r#gen::<f64>() > 0.5;
            if !include {
                continue;
            }
            let Some(id) = property else {
                continue;
            };
            let value = self.generate_at(registry, *id, visiting)?;
            fields.push((name.clone(), value));
        }
        Ok(Value::Object(fields))
    }

    /// Uniform pick in `[min, max]`, or `min` when the range is empty.
    fn pick_count(&mut self, min: u64, max: u64) -> u64 {
        if max > min {
            self.rng.gen_range(min..=max)
        } else {
            min
        }
    }
}
