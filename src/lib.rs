//! Core library for the `specstress` CLI.
//!
//! Loads an OpenAPI 3.x document, synthesizes requests from its schemas,
//! and either checks each response against the document (`test`) or
//! measures latency and throughput per operation (`benchmark`). The
//! `specstress` binary is the primary interface; library APIs may evolve
//! with it.
pub mod args;
pub mod benchmark;
pub mod config;
pub mod entry;
pub mod error;
pub mod generator;
pub mod http;
pub mod models;
pub mod openapi;
pub mod shutdown;
pub mod tester;
pub mod validate;

mod app;
mod logger;
mod shutdown_handlers;
