//! API document model and the metadata provider consumed by the core.
//!
//! The loader turns an OpenAPI 3 document into immutable [`OperationDetails`]
//! values. Schemas are interned into a [`SchemaRegistry`] and referenced by
//! [`SchemaId`], so self-referencing schemas stay representable without
//! reference counting cycles.
mod document;
mod model;
mod provider;
mod resolve;


pub use document::ApiDocument;
pub use model::{
    HttpMethod, MediaType, Operation, OperationDetails, Parameter, ParameterLocation,
    RequestBody, ResponseDefinition, Responses, Schema, SchemaId, SchemaRegistry, SchemaType,
};
pub use provider::OperationProvider;
